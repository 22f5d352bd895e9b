use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use tokio_util::sync::CancellationToken;

use relay_voter::chain::{HttpRelayClient, HttpSourceClient};
use relay_voter::checkpoint::CheckpointStore;
use relay_voter::config::Config;
use relay_voter::signer::{DomainTag, KeyMaterial, Signer};
use relay_voter::voter::Voter;
use relay_voter::{api, metrics};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();

    tracing::info!("Starting relay voter");

    let config = Config::load()?;
    tracing::info!(
        side_chain_id = config.source.side_chain_id,
        source_clients = config.source.rpc_urls.len(),
        relay_clients = config.relay.rpc_urls.len(),
        "Configuration loaded"
    );

    let store = CheckpointStore::open(Path::new(&config.checkpoint.dir))?;
    tracing::info!(dir = %config.checkpoint.dir, "Checkpoint store opened");

    let source_clients = config
        .source
        .rpc_urls
        .iter()
        .map(|url| HttpSourceClient::new(url))
        .collect::<Result<Vec<_>, _>>()?;
    let relay_clients = config
        .relay
        .rpc_urls
        .iter()
        .map(|url| HttpRelayClient::new(url, &config.relay.account).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    let key_bytes = hex::decode(config.signer.private_key.trim_start_matches("0x"))?;
    let material = KeyMaterial::load(&config.signer.algorithm, &key_bytes)?;
    let signer = Signer::new(&material, DomainTag::new(&config.signer.domain_tag)?)?;
    tracing::info!(algorithm = material.algorithm(), "Signer loaded");

    // Cancellation fans out to both monitor loops
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_cancel.cancel();
    });

    // Start metrics/status server
    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.voter.api_port));
    let api_store = store.clone();
    tokio::spawn(async move {
        if let Err(e) = api::start_api_server(api_addr, api_store).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    let voter = Voter::new(&config, store.clone(), source_clients, relay_clients, signer)?;
    let result = voter.run(cancel).await;

    metrics::UP.set(0.0);
    store.flush()?;
    tracing::info!("Relay voter stopped");
    result
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relay_voter=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
