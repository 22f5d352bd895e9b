//! Watermark-driven chain monitors.
//!
//! Each monitor is a sequential polling loop over one chain: read the
//! persisted watermark, walk confirmed heights one at a time, and persist
//! the watermark only after a height's work is fully done. The two
//! monitors share nothing but the checkpoint store, on disjoint keys.

pub mod relay;
pub mod source;

pub use relay::RelayMonitor;
pub use source::SourceMonitor;

use std::time::Duration;

use eyre::{eyre, Result};
use tokio::time::Instant;

use crate::chain::{RelayClient, TxStatus};

/// Interval between confirmation polls while waiting on a submission.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Block until `tx_hash` confirms on the relay chain, the chain reports it
/// failed, or `timeout` elapses. Status-query errors count as "still
/// pending": the transaction may confirm while the node is unreachable.
pub(crate) async fn wait_for_confirmation<R>(
    client: &R,
    tx_hash: &str,
    timeout: Duration,
) -> Result<()>
where
    R: RelayClient + ?Sized,
{
    let start = Instant::now();
    loop {
        match client.transaction_status(tx_hash).await {
            Ok(TxStatus::Confirmed) => return Ok(()),
            Ok(TxStatus::Failed) => {
                return Err(eyre!("transaction {tx_hash} failed on the relay chain"))
            }
            Ok(TxStatus::Pending) | Err(_) => {}
        }
        if start.elapsed() >= timeout {
            return Err(eyre!(
                "timed out after {timeout:?} waiting for confirmation of {tx_hash}"
            ));
        }
        tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
    }
}
