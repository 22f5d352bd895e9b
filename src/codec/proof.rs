//! Merkle audit-path decoding.
//!
//! An inclusion proof arrives as a self-describing blob: a var-bytes value
//! followed by one (direction flag, 32-byte sibling hash) pair per tree
//! level, filling the remainder of the buffer. Tree construction and root
//! verification live on the ledger side; only the decoder is needed here.

use super::{DecodeError, WireReader};

/// One level of the path: which side the sibling sits on, and its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNode {
    pub direction: u8,
    pub hash: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPath {
    /// The proven leaf value, raw. This is the exact byte string the voter
    /// signs.
    pub value: Vec<u8>,
    /// Sibling hashes, leaf-most first.
    pub nodes: Vec<PathNode>,
}

impl AuditPath {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(buf);
        let value = r.read_var_bytes()?.to_vec();

        let mut nodes = Vec::with_capacity(r.remaining() / 33);
        while r.remaining() > 0 {
            let direction = r.read_byte()?;
            let hash = r.read_hash32()?;
            nodes.push(PathNode { direction, hash });
        }
        Ok(Self { value, nodes })
    }
}
