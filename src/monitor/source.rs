//! Source-chain monitor: watches for outbound transfer events and
//! forwards them to the relay chain.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use rand::thread_rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{pick_index, RelayClient, SourceClient};
use crate::checkpoint::CheckpointStore;
use crate::codec::CrossChainTransfer;
use crate::config::{SourceConfig, VoterConfig};
use crate::metrics;
use crate::monitor::wait_for_confirmation;

pub struct SourceMonitor<S, R: ?Sized> {
    clients: Vec<S>,
    relay_clients: Vec<Arc<R>>,
    store: CheckpointStore,
    event_type: String,
    side_chain_id: u64,
    allowed_methods: HashSet<String>,
    confirmations: u64,
    poll_interval: Duration,
    backoff: Duration,
    confirm_timeout: Duration,
    force_height: Option<u64>,
    next_height: u64,
    client_idx: usize,
    relay_idx: usize,
}

impl<S, R> SourceMonitor<S, R>
where
    S: SourceClient,
    R: RelayClient + ?Sized,
{
    pub fn new(
        config: &SourceConfig,
        voter: &VoterConfig,
        clients: Vec<S>,
        relay_clients: Vec<Arc<R>>,
        store: CheckpointStore,
    ) -> Result<Self> {
        if clients.is_empty() {
            return Err(eyre!("source client pool cannot be empty"));
        }
        if relay_clients.is_empty() {
            return Err(eyre!("relay client pool cannot be empty"));
        }
        Ok(Self {
            clients,
            relay_clients,
            store,
            event_type: config.event_type.clone(),
            side_chain_id: config.side_chain_id,
            allowed_methods: voter.allowed_methods.iter().cloned().collect(),
            confirmations: config.confirmations,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            backoff: Duration::from_millis(voter.retry_backoff_ms),
            confirm_timeout: Duration::from_secs(voter.confirm_timeout_secs),
            force_height: config.force_height,
            next_height: 0,
            client_idx: 0,
            relay_idx: 0,
        })
    }

    /// Next height the monitor will process.
    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    /// Resolve the starting height: forced override, else the persisted
    /// checkpoint, else the chain's current tip (cold start skips
    /// history). Failure here is fatal: without a starting height the
    /// monitor cannot safely begin.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.next_height = self.initial_height().await?;
        info!(
            start_height = self.next_height,
            confirmations = self.confirmations,
            "source monitor starting"
        );
        Ok(())
    }

    async fn initial_height(&self) -> Result<u64> {
        if let Some(height) = self.force_height {
            return Ok(height);
        }
        let stored = self.store.last_source_height()?;
        if stored > 0 {
            return Ok(stored);
        }
        self.clients[self.client_idx]
            .latest_height()
            .await
            .wrap_err("cold-start source height discovery failed")
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        self.bootstrap().await?;
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("source monitor stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.poll_once(&cancel).await {
                warn!(
                    error = %e,
                    next_height = self.next_height,
                    "source poll failed, backing off"
                );
                metrics::record_rpc_error("source");
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.backoff) => {}
                }
                self.rotate();
            }
        }
    }

    /// One polling tick: drain every height with enough confirmations,
    /// oldest first, then persist the watermark. Any error leaves
    /// `next_height` at the failed height; the next tick retries it.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.rotate();

        let latest = self.clients[self.client_idx].latest_height().await?;
        if latest < self.next_height + self.confirmations {
            debug!(
                latest,
                next_height = self.next_height,
                "not enough source confirmations yet"
            );
            return Ok(());
        }

        let target = latest - self.confirmations;
        let drained_from = self.next_height;
        while self.next_height < target {
            if cancel.is_cancelled() {
                return Ok(());
            }
            debug!(height = self.next_height, "handling source height");
            self.process_height(self.next_height).await?;
            self.next_height += 1;
            metrics::record_height_processed("source", self.next_height);
        }

        if self.next_height > drained_from {
            // In-memory progress survives a failed write; the next drained
            // tick retries it.
            if let Err(e) = self.store.update_source_height(self.next_height) {
                warn!(error = %e, next_height = self.next_height, "persisting source checkpoint failed");
            }
        }
        Ok(())
    }

    /// Process every qualifying event at `height`. Decode failures and
    /// allow-list rejections abandon the event; submission failures fail
    /// the whole height.
    async fn process_height(&self, height: u64) -> Result<()> {
        let events = self.clients[self.client_idx]
            .events_in_range(&self.event_type, height, height)
            .await?;

        let relay = &self.relay_clients[self.relay_idx];
        let mut forwarded = 0usize;
        for event in &events {
            if event.event_type != self.event_type {
                continue;
            }
            let transfer = match CrossChainTransfer::decode(&event.payload) {
                Ok(t) => t,
                Err(e) => {
                    warn!(height, error = %e, "undecodable transfer payload, skipping event");
                    continue;
                }
            };
            if !self.allowed_methods.contains(&transfer.method) {
                warn!(height, method = %transfer.method, "transfer method not allow-listed, skipping");
                continue;
            }
            // Replay protection: a transfer already marked done on the
            // relay chain must never be resubmitted, including on retries
            // of a height that partially succeeded.
            if relay
                .done_marker_exists(self.side_chain_id, &transfer.cross_chain_id)
                .await?
            {
                info!(
                    height,
                    cross_chain_id = %hex::encode(&transfer.cross_chain_id),
                    "transfer already settled on relay chain, skipping"
                );
                continue;
            }

            let tx_hash = match relay
                .submit_transfer(self.side_chain_id, &event.payload, height, &event.tx_id)
                .await
            {
                Ok(tx_hash) => tx_hash,
                Err(e) => {
                    metrics::record_transfer_submitted(false);
                    return Err(e.into());
                }
            };
            info!(
                height,
                %tx_hash,
                cross_chain_id = %hex::encode(&transfer.cross_chain_id),
                "submitted transfer to relay chain"
            );
            wait_for_confirmation(relay.as_ref(), &tx_hash, self.confirm_timeout).await?;
            metrics::record_transfer_submitted(true);
            forwarded += 1;
        }

        debug!(height, events = events.len(), forwarded, "source height drained");
        Ok(())
    }

    fn rotate(&mut self) {
        let mut rng = thread_rng();
        self.client_idx = pick_index(self.clients.len(), &mut rng);
        self.relay_idx = pick_index(self.relay_clients.len(), &mut rng);
    }
}
