//! Voter core for a dual-chain cross-chain bridge relay.
//!
//! Two checkpointed monitors run concurrently: one watches the source
//! ledger for outbound transfers and forwards them to the relay ledger;
//! the other watches the relay ledger for settlement requests, proves and
//! signs them, and submits the signatures back. Progress is durable per
//! chain and advances only behind fully confirmed work.

pub mod api;
pub mod chain;
pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod metrics;
pub mod monitor;
pub mod signer;
pub mod voter;
