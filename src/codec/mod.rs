//! Wire decoding for ledger payloads.
//!
//! The source and relay ledgers share one byte-level convention:
//! little-endian fixed-width integers, a variable-length integer with
//! 0xFD/0xFE/0xFF escape tags, and var-bytes (varint length prefix followed
//! by the payload). Every decoder here is total: malformed or truncated
//! input yields a typed [`DecodeError`], never a panic.

pub mod notify;
pub mod proof;
pub mod transfer;

pub use notify::{parse_proof_notice, ProofNotice, SETTLEMENT_METHOD};
pub use proof::{AuditPath, PathNode};
pub use transfer::{CrossChainTransfer, SettlementPayload};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("insufficient data: needed {needed} byte(s) at offset {offset}")]
    Insufficient { offset: usize, needed: usize },
    #[error("length prefix {len} exceeds remaining buffer ({remaining} bytes)")]
    Oversized { len: u64, remaining: usize },
    #[error("{field} is not valid utf-8")]
    Utf8 { field: &'static str },
    #[error("notice state {index} has unexpected type, expected {expected}")]
    UnexpectedState { index: usize, expected: &'static str },
    #[error("notice carries {len} state(s), expected at least {expected}")]
    ShortStates { len: usize, expected: usize },
}

/// Cursor over a borrowed buffer. Reads never copy until the caller asks
/// for an owned value.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Insufficient {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let raw = self.read_exact(2)?;
        Ok(u16::from_le_bytes(raw.try_into().unwrap()))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let raw = self.read_exact(4)?;
        Ok(u32::from_le_bytes(raw.try_into().unwrap()))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        let raw = self.read_exact(8)?;
        Ok(u64::from_le_bytes(raw.try_into().unwrap()))
    }

    /// Variable-length unsigned integer: a single byte below 0xFD is the
    /// value itself; 0xFD, 0xFE, 0xFF prefix a u16, u32, u64 respectively.
    pub fn read_var_uint(&mut self) -> Result<u64, DecodeError> {
        match self.read_byte()? {
            0xFD => Ok(u64::from(self.read_u16_le()?)),
            0xFE => Ok(u64::from(self.read_u32_le()?)),
            0xFF => self.read_u64_le(),
            small => Ok(u64::from(small)),
        }
    }

    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_var_uint()?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::Oversized {
                len,
                remaining: self.remaining(),
            });
        }
        self.read_exact(len as usize)
    }

    pub fn read_hash32(&mut self) -> Result<[u8; 32], DecodeError> {
        let raw = self.read_exact(32)?;
        Ok(raw.try_into().unwrap())
    }
}

/// Encoding helpers, used by tests and by the relay submission path to
/// mirror what the ledgers emit.
pub fn write_var_uint(out: &mut Vec<u8>, value: u64) {
    if value < 0xFD {
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push(0xFD);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push(0xFE);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xFF);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_var_uint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_reads() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = WireReader::new(&buf);
        assert_eq!(r.read_u16_le().unwrap(), 0x0201);
        assert_eq!(r.read_u32_le().unwrap(), 0x06050403);
        assert_eq!(r.remaining(), 2);
        assert!(matches!(
            r.read_u32_le(),
            Err(DecodeError::Insufficient { offset: 6, needed: 2 })
        ));
    }

    #[test]
    fn test_var_uint_escapes() {
        let mut buf = Vec::new();
        write_var_uint(&mut buf, 0xFC);
        write_var_uint(&mut buf, 0xFD);
        write_var_uint(&mut buf, 70_000);
        write_var_uint(&mut buf, u64::from(u32::MAX) + 1);

        let mut r = WireReader::new(&buf);
        assert_eq!(r.read_var_uint().unwrap(), 0xFC);
        assert_eq!(r.read_var_uint().unwrap(), 0xFD);
        assert_eq!(r.read_var_uint().unwrap(), 70_000);
        assert_eq!(r.read_var_uint().unwrap(), u64::from(u32::MAX) + 1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_var_bytes_roundtrip() {
        let mut buf = Vec::new();
        write_var_bytes(&mut buf, b"hello");
        write_var_bytes(&mut buf, &[]);

        let mut r = WireReader::new(&buf);
        assert_eq!(r.read_var_bytes().unwrap(), b"hello");
        assert_eq!(r.read_var_bytes().unwrap(), b"");
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        // Claims 200 bytes, carries 2.
        let buf = [200u8, 0xAA, 0xBB];
        let mut r = WireReader::new(&buf);
        assert_eq!(
            r.read_var_bytes(),
            Err(DecodeError::Oversized {
                len: 200,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_truncated_var_uint_escape() {
        let buf = [0xFFu8, 0x01];
        let mut r = WireReader::new(&buf);
        assert!(matches!(
            r.read_var_uint(),
            Err(DecodeError::Insufficient { .. })
        ));
    }

    #[test]
    fn test_empty_buffer() {
        let mut r = WireReader::new(&[]);
        assert!(matches!(
            r.read_byte(),
            Err(DecodeError::Insufficient { offset: 0, needed: 1 })
        ));
    }
}
