//! Voter configuration.
//!
//! Loaded from a `.env` file if present, then the process environment,
//! validated before anything opens a socket or a store.

use std::env;
use std::fmt;
use std::path::Path;

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

/// Main configuration for the voter
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub checkpoint: CheckpointConfig,
    pub source: SourceConfig,
    pub relay: RelayConfig,
    pub signer: SignerConfig,
    pub voter: VoterConfig,
}

/// Checkpoint store location
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    pub dir: String,
}

/// Source-chain configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Access-node URLs; one is picked at random per tick.
    pub rpc_urls: Vec<String>,
    /// Fully qualified event type to watch for.
    pub event_type: String,
    /// This relayer's registered side-chain id.
    pub side_chain_id: u64,
    /// Blocks to stay behind the tip before treating a height as final.
    #[serde(default = "default_source_confirmations")]
    pub confirmations: u64,
    #[serde(default = "default_source_poll_interval")]
    pub poll_interval_ms: u64,
    /// Forced starting height, overriding the stored checkpoint.
    #[serde(default)]
    pub force_height: Option<u64>,
}

/// Relay-chain configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub rpc_urls: Vec<String>,
    /// Entrance contract whose notifications carry settlement requests.
    pub entrance_contract: String,
    /// Address of the account submissions are attributed to.
    pub account: String,
    #[serde(default = "default_relay_confirmations")]
    pub confirmations: u32,
    #[serde(default = "default_relay_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub force_height: Option<u32>,
}

/// Signing key configuration
#[derive(Clone, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "default_key_algorithm")]
    pub algorithm: String,
    /// Hex-encoded private key scalar.
    pub private_key: String,
    #[serde(default = "default_domain_tag")]
    pub domain_tag: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("algorithm", &self.algorithm)
            .field("private_key", &"<redacted>")
            .field("domain_tag", &self.domain_tag)
            .finish()
    }
}

/// Shared monitor behavior
#[derive(Debug, Clone, Deserialize)]
pub struct VoterConfig {
    /// Transfer methods the voter is willing to forward.
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Bound on waiting for a submitted transaction to confirm.
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

/// Default functions
fn default_source_confirmations() -> u64 {
    3
}

fn default_source_poll_interval() -> u64 {
    2000
}

fn default_relay_confirmations() -> u32 {
    1
}

fn default_relay_poll_interval() -> u64 {
    1000
}

fn default_key_algorithm() -> String {
    "secp256k1".to_string()
}

fn default_domain_tag() -> String {
    "RELAY-V1-voter".to_string()
}

fn default_retry_backoff() -> u64 {
    1000
}

fn default_confirm_timeout() -> u64 {
    300
}

fn default_api_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let checkpoint = CheckpointConfig {
            dir: env::var("CHECKPOINT_DIR")
                .map_err(|_| eyre!("CHECKPOINT_DIR environment variable is required"))?,
        };

        let source = SourceConfig {
            rpc_urls: parse_url_list(
                &env::var("SOURCE_RPC_URLS")
                    .map_err(|_| eyre!("SOURCE_RPC_URLS environment variable is required"))?,
            ),
            event_type: env::var("SOURCE_EVENT_TYPE")
                .map_err(|_| eyre!("SOURCE_EVENT_TYPE environment variable is required"))?,
            side_chain_id: env::var("SIDE_CHAIN_ID")
                .map_err(|_| eyre!("SIDE_CHAIN_ID environment variable is required"))?
                .parse()
                .wrap_err("SIDE_CHAIN_ID must be a valid u64")?,
            confirmations: env::var("SOURCE_CONFIRMATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_source_confirmations),
            poll_interval_ms: env::var("SOURCE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_source_poll_interval),
            force_height: env::var("SOURCE_FORCE_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok()),
        };

        let relay = RelayConfig {
            rpc_urls: parse_url_list(
                &env::var("RELAY_RPC_URLS")
                    .map_err(|_| eyre!("RELAY_RPC_URLS environment variable is required"))?,
            ),
            entrance_contract: env::var("RELAY_ENTRANCE_CONTRACT")
                .map_err(|_| eyre!("RELAY_ENTRANCE_CONTRACT environment variable is required"))?,
            account: env::var("RELAY_ACCOUNT")
                .map_err(|_| eyre!("RELAY_ACCOUNT environment variable is required"))?,
            confirmations: env::var("RELAY_CONFIRMATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_relay_confirmations),
            poll_interval_ms: env::var("RELAY_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_relay_poll_interval),
            force_height: env::var("RELAY_FORCE_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok()),
        };

        let signer = SignerConfig {
            algorithm: env::var("SIGNER_ALGORITHM").unwrap_or_else(|_| default_key_algorithm()),
            private_key: env::var("SIGNER_PRIVATE_KEY")
                .map_err(|_| eyre!("SIGNER_PRIVATE_KEY environment variable is required"))?,
            domain_tag: env::var("SIGNER_DOMAIN_TAG").unwrap_or_else(|_| default_domain_tag()),
        };

        let voter = VoterConfig {
            allowed_methods: env::var("ALLOWED_METHODS")
                .unwrap_or_else(|_| "lock".to_string())
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            retry_backoff_ms: env::var("RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_backoff),
            confirm_timeout_secs: env::var("CONFIRM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_confirm_timeout),
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_api_port),
        };

        let config = Config {
            checkpoint,
            source,
            relay,
            signer,
            voter,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.checkpoint.dir.is_empty() {
            return Err(eyre!("checkpoint.dir cannot be empty"));
        }

        if self.source.rpc_urls.is_empty() {
            return Err(eyre!("source.rpc_urls cannot be empty"));
        }

        if self.source.event_type.is_empty() {
            return Err(eyre!("source.event_type cannot be empty"));
        }

        if self.relay.rpc_urls.is_empty() {
            return Err(eyre!("relay.rpc_urls cannot be empty"));
        }

        if self.relay.entrance_contract.is_empty() {
            return Err(eyre!("relay.entrance_contract cannot be empty"));
        }

        if self.relay.account.is_empty() {
            return Err(eyre!("relay.account cannot be empty"));
        }

        let key = self.signer.private_key.trim_start_matches("0x");
        if key.is_empty() || key.len() > 64 || hex::decode(key).is_err() {
            return Err(eyre!(
                "signer.private_key must be a hex scalar of at most 64 hex chars"
            ));
        }

        if self.signer.domain_tag.len() > crate::signer::DOMAIN_TAG_LEN {
            return Err(eyre!(
                "signer.domain_tag cannot exceed {} bytes",
                crate::signer::DOMAIN_TAG_LEN
            ));
        }

        if self.voter.allowed_methods.is_empty() {
            return Err(eyre!("voter.allowed_methods cannot be empty"));
        }

        Ok(())
    }
}

/// Split a comma-separated URL list, dropping empty entries.
fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}
