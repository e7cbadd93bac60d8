//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use cinder_queue::DisqueClient;
use cinder_remote::Vault;

/// Seconds between consumer poll iterations when nothing overrides it.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 8;

/// Settings shared by every subcommand, assembled from the CLI.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Queue broker endpoints, tried in order at connect time.
    pub endpoints: Vec<String>,
    /// Pause between consumer poll iterations.
    pub poll_interval: Duration,
    /// Location of the credential vault file.
    pub vault_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DisqueClient::DEFAULT_ENDPOINT.to_string()],
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            vault_path: PathBuf::from(Vault::DEFAULT_PATH),
        }
    }
}
