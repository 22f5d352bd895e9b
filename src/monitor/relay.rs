//! Relay-chain monitor: watches for settlement requests, proves them, and
//! submits signatures.

use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use rand::thread_rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{pick_index, RelayClient};
use crate::checkpoint::CheckpointStore;
use crate::codec::{parse_proof_notice, AuditPath, SettlementPayload};
use crate::config::{RelayConfig, SourceConfig, VoterConfig};
use crate::metrics;
use crate::monitor::wait_for_confirmation;
use crate::signer::Signer;

pub struct RelayMonitor<R: ?Sized> {
    clients: Vec<Arc<R>>,
    store: CheckpointStore,
    signer: Signer,
    entrance_contract: String,
    side_chain_id: u64,
    confirmations: u32,
    poll_interval: Duration,
    backoff: Duration,
    confirm_timeout: Duration,
    force_height: Option<u32>,
    next_height: u32,
    client_idx: usize,
}

impl<R> RelayMonitor<R>
where
    R: RelayClient + ?Sized,
{
    pub fn new(
        config: &RelayConfig,
        source: &SourceConfig,
        voter: &VoterConfig,
        clients: Vec<Arc<R>>,
        signer: Signer,
        store: CheckpointStore,
    ) -> Result<Self> {
        if clients.is_empty() {
            return Err(eyre!("relay client pool cannot be empty"));
        }
        Ok(Self {
            clients,
            store,
            signer,
            entrance_contract: config.entrance_contract.clone(),
            side_chain_id: source.side_chain_id,
            confirmations: config.confirmations,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            backoff: Duration::from_millis(voter.retry_backoff_ms),
            confirm_timeout: Duration::from_secs(voter.confirm_timeout_secs),
            force_height: config.force_height,
            next_height: 0,
            client_idx: 0,
        })
    }

    /// Next height the monitor will process.
    pub fn next_height(&self) -> u32 {
        self.next_height
    }

    /// Resolve the starting height; same precedence as the source monitor
    /// and equally fatal on failure.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.next_height = self.initial_height().await?;
        info!(
            start_height = self.next_height,
            confirmations = self.confirmations,
            "relay monitor starting"
        );
        Ok(())
    }

    async fn initial_height(&self) -> Result<u32> {
        if let Some(height) = self.force_height {
            return Ok(height);
        }
        let stored = self.store.last_relay_height()?;
        if stored > 0 {
            return Ok(stored);
        }
        self.clients[self.client_idx]
            .current_height()
            .await
            .wrap_err("cold-start relay height discovery failed")
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        self.bootstrap().await?;
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("relay monitor stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.poll_once(&cancel).await {
                warn!(
                    error = %e,
                    next_height = self.next_height,
                    "relay poll failed, backing off"
                );
                metrics::record_rpc_error("relay");
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.backoff) => {}
                }
                self.rotate();
            }
        }
    }

    /// One polling tick over the relay chain, mirroring the source
    /// monitor's drain-then-persist structure.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.rotate();

        // The node reports the height being minted; the last sealed block
        // is one behind it.
        let latest = self.clients[self.client_idx]
            .current_height()
            .await?
            .saturating_sub(1);
        if latest < self.next_height + self.confirmations {
            debug!(
                latest,
                next_height = self.next_height,
                "not enough relay confirmations yet"
            );
            return Ok(());
        }

        let target = latest - self.confirmations;
        let drained_from = self.next_height;
        while self.next_height < target {
            if cancel.is_cancelled() {
                return Ok(());
            }
            debug!(height = self.next_height, "handling relay height");
            self.process_height(self.next_height).await?;
            self.next_height += 1;
            metrics::record_height_processed("relay", u64::from(self.next_height));
        }

        if self.next_height > drained_from {
            if let Err(e) = self.store.update_relay_height(self.next_height) {
                warn!(error = %e, next_height = self.next_height, "persisting relay checkpoint failed");
            }
        }
        Ok(())
    }

    /// Handle every settlement request notified at `height`: prove, sign,
    /// submit, wait. Malformed notices and proofs are abandoned with a
    /// warning; submission failures fail the whole height.
    async fn process_height(&self, height: u32) -> Result<()> {
        let client = &self.clients[self.client_idx];
        let header = client.header_by_height(height + 1).await?;
        let events = client.events_by_block(height).await?;

        let mut signed = 0usize;
        for event in &events {
            for notification in &event.notifications {
                if notification.contract_address != self.entrance_contract {
                    continue;
                }
                let notice = match parse_proof_notice(&notification.states) {
                    Ok(Some(notice)) => notice,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(height, tx_hash = %event.tx_hash, error = %e, "malformed settlement notice, skipping");
                        continue;
                    }
                };
                if notice.side_chain_id != self.side_chain_id {
                    continue;
                }

                // The header at height+1 seals the state the request was
                // recorded in; prove against the block just below it.
                let proof = client
                    .storage_proof(header.height.saturating_sub(1), &notice.key)
                    .await?;
                let path = match AuditPath::decode(&proof.audit_path) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(height, key = %notice.key, error = %e, "undecodable audit path, skipping");
                        continue;
                    }
                };
                if let Err(e) = SettlementPayload::decode(&path.value) {
                    warn!(height, key = %notice.key, error = %e, "proven value is not a settlement payload, skipping");
                    continue;
                }

                let signature = self.signer.sign(&path.value)?;
                let tx_hash = match client
                    .submit_signature(self.side_chain_id, &path.value, &signature)
                    .await
                {
                    Ok(tx_hash) => tx_hash,
                    Err(e) => {
                        metrics::record_signature_submitted(false);
                        return Err(e.into());
                    }
                };
                info!(height, %tx_hash, key = %notice.key, "submitted settlement signature");
                wait_for_confirmation(client.as_ref(), &tx_hash, self.confirm_timeout).await?;
                metrics::record_signature_submitted(true);
                signed += 1;
            }
        }

        debug!(height, events = events.len(), signed, "relay height drained");
        Ok(())
    }

    fn rotate(&mut self) {
        self.client_idx = pick_index(self.clients.len(), &mut thread_rng());
    }
}
