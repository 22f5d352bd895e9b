//! Chain client contracts.
//!
//! The monitors are generic over these traits so production HTTP clients
//! and test doubles are interchangeable. Both chains are reached through a
//! pool of equivalent clients; selection is a pure function over the pool
//! size and an external random source.

pub mod relay;
pub mod source;

pub use relay::HttpRelayClient;
pub use source::HttpSourceClient;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node error: {0}")]
    Node(String),
    #[error("malformed response: {0}")]
    Response(String),
}

/// Terminal view of a submitted relay transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One event emitted on the source ledger.
#[derive(Debug, Clone)]
pub struct SourceEvent {
    pub event_type: String,
    /// Id of the transaction that emitted the event.
    pub tx_id: Vec<u8>,
    /// Raw transfer record bytes, decoded by the event codec.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct RelayHeader {
    pub height: u32,
}

/// A notification attached to a relay-chain transaction.
#[derive(Debug, Clone)]
pub struct Notification {
    pub contract_address: String,
    pub states: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RelayEvent {
    pub tx_hash: String,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone)]
pub struct StorageProof {
    /// Audit-path blob, already hex-decoded by the client.
    pub audit_path: Vec<u8>,
}

/// Source-ledger access: height discovery and typed event queries.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn latest_height(&self) -> Result<u64, ChainError>;

    /// Events of `event_type` in the closed height range `[from, to]`.
    async fn events_in_range(
        &self,
        event_type: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<SourceEvent>, ChainError>;
}

/// Relay-ledger access. The implementation holds the submitting account;
/// submission methods return the transaction hash to wait on.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn current_height(&self) -> Result<u32, ChainError>;

    async fn header_by_height(&self, height: u32) -> Result<RelayHeader, ChainError>;

    async fn events_by_block(&self, height: u32) -> Result<Vec<RelayEvent>, ChainError>;

    async fn storage_proof(&self, height: u32, key: &str) -> Result<StorageProof, ChainError>;

    async fn submit_transfer(
        &self,
        side_chain_id: u64,
        payload: &[u8],
        height: u64,
        origin_tx_id: &[u8],
    ) -> Result<String, ChainError>;

    async fn submit_signature(
        &self,
        side_chain_id: u64,
        subject: &[u8],
        signature: &[u8],
    ) -> Result<String, ChainError>;

    async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus, ChainError>;

    /// Whether `(side_chain_id, cross_chain_id)` already carries a done
    /// marker on the relay chain.
    async fn done_marker_exists(
        &self,
        side_chain_id: u64,
        cross_chain_id: &[u8],
    ) -> Result<bool, ChainError>;
}

/// Uniform random pick over a client pool of `len` entries.
pub fn pick_index(len: usize, rng: &mut impl Rng) -> usize {
    if len <= 1 {
        0
    } else {
        rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_index_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for len in [1usize, 2, 3, 17] {
            for _ in 0..100 {
                assert!(pick_index(len, &mut rng) < len);
            }
        }
    }

    #[test]
    fn test_pick_index_covers_pool() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[pick_index(4, &mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s), "all clients should be selectable");
    }

    #[test]
    fn test_single_client_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_index(1, &mut rng), 0);
    }
}
