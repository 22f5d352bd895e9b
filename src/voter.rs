//! Voter orchestration: owns both monitors, runs them concurrently, and
//! tears both down when either fails or the cancellation token fires.

use std::sync::Arc;

use eyre::{eyre, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chain::{RelayClient, SourceClient};
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::monitor::{RelayMonitor, SourceMonitor};
use crate::signer::Signer;

pub struct Voter<S, R: ?Sized> {
    source_monitor: SourceMonitor<S, R>,
    relay_monitor: RelayMonitor<R>,
}

impl<S, R> Voter<S, R>
where
    S: SourceClient + 'static,
    R: RelayClient + ?Sized + 'static,
{
    /// Wire both monitors. The relay pool is shared between them; the
    /// checkpoint store handle is cloned onto each (disjoint keys).
    pub fn new(
        config: &Config,
        store: CheckpointStore,
        source_clients: Vec<S>,
        relay_clients: Vec<Arc<R>>,
        signer: Signer,
    ) -> Result<Self> {
        let source_monitor = SourceMonitor::new(
            &config.source,
            &config.voter,
            source_clients,
            relay_clients.clone(),
            store.clone(),
        )?;
        let relay_monitor = RelayMonitor::new(
            &config.relay,
            &config.source,
            &config.voter,
            relay_clients,
            signer,
            store,
        )?;
        Ok(Self {
            source_monitor,
            relay_monitor,
        })
    }

    /// Run both monitors to completion. Returns when `cancel` fires (both
    /// monitors drained and joined) or when a monitor fails, in which
    /// case the other is cancelled and joined before the error surfaces.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();
        let source_cancel = cancel.clone();
        let relay_cancel = cancel.clone();

        let source_monitor = self.source_monitor;
        tasks.spawn(async move { source_monitor.run(source_cancel).await });
        let relay_monitor = self.relay_monitor;
        tasks.spawn(async move { relay_monitor.run(relay_cancel).await });

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "monitor stopped with error");
                    cancel.cancel();
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "monitor task panicked");
                    cancel.cancel();
                    first_error.get_or_insert(eyre!("monitor task panicked: {e}"));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("voter stopped");
                Ok(())
            }
        }
    }
}
