//! Canonical cross-chain records.
//!
//! `CrossChainTransfer` is the record a source-chain event resolves to and
//! the unit the voter forwards to the relay chain. `SettlementPayload` is
//! the value proven by a relay-chain inclusion proof; the voter decodes it
//! to validate the proof target before signing the raw bytes.

use super::{write_var_bytes, DecodeError, WireReader};

/// A single outbound transfer, in fixed wire order. Trailing bytes after
/// `args` are ignored so newer ledger versions can append fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChainTransfer {
    /// Originating transaction id on the source ledger.
    pub tx_hash: Vec<u8>,
    /// Dedup key: unique per transfer across the bridge.
    pub cross_chain_id: Vec<u8>,
    pub from_contract: Vec<u8>,
    /// Numeric side-chain id of the destination ledger.
    pub to_chain_id: u64,
    pub to_contract: Vec<u8>,
    /// Method identifier, checked against the configured allow-list.
    pub method: String,
    /// Opaque call payload, passed through unmodified.
    pub args: Vec<u8>,
}

impl CrossChainTransfer {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(buf);
        Self::read_from(&mut r)
    }

    fn read_from(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let tx_hash = r.read_var_bytes()?.to_vec();
        let cross_chain_id = r.read_var_bytes()?.to_vec();
        let from_contract = r.read_var_bytes()?.to_vec();
        let to_chain_id = r.read_u64_le()?;
        let to_contract = r.read_var_bytes()?.to_vec();
        let method = std::str::from_utf8(r.read_var_bytes()?)
            .map_err(|_| DecodeError::Utf8 { field: "method" })?
            .to_string();
        let args = r.read_var_bytes()?.to_vec();
        Ok(Self {
            tx_hash,
            cross_chain_id,
            from_contract,
            to_chain_id,
            to_contract,
            method,
            args,
        })
    }

    /// Wire encoding, the inverse of [`decode`](Self::decode).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_var_bytes(&mut out, &self.tx_hash);
        write_var_bytes(&mut out, &self.cross_chain_id);
        write_var_bytes(&mut out, &self.from_contract);
        out.extend_from_slice(&self.to_chain_id.to_le_bytes());
        write_var_bytes(&mut out, &self.to_contract);
        write_var_bytes(&mut out, self.method.as_bytes());
        write_var_bytes(&mut out, &self.args);
        out
    }
}

/// Value committed under a settlement request's storage key: the relay
/// transaction, the chain the transfer left from, and the transfer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPayload {
    pub relay_tx_hash: Vec<u8>,
    pub source_chain_id: u64,
    pub transfer: CrossChainTransfer,
}

impl SettlementPayload {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(buf);
        let relay_tx_hash = r.read_var_bytes()?.to_vec();
        let source_chain_id = r.read_u64_le()?;
        let transfer = CrossChainTransfer::read_from(&mut r)?;
        Ok(Self {
            relay_tx_hash,
            source_chain_id,
            transfer,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_var_bytes(&mut out, &self.relay_tx_hash);
        out.extend_from_slice(&self.source_chain_id.to_le_bytes());
        out.extend_from_slice(&self.transfer.encode());
        out
    }
}
