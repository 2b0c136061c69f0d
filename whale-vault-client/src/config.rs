// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use whale_vault_base::{
    retry::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECEIPT_BACKOFF_MS},
    BackoffPolicy, PollPolicy,
};

use crate::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_RPC_URL: &str = "https://evm.confluxrpc.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SESSION_FILE: &str = "whale-vault-session.json";

/// Which backend answers requests.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// The relay at `backend_url`.
    #[default]
    Real,
    /// Canned demo answers; nothing is sent to the relay.
    Mock,
}

/// The settings of a client, from command-line flags, `WHALE_VAULT_*` variables or a
/// JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct ClientConfig {
    /// The base URL of the relay backend.
    #[arg(long, env = "WHALE_VAULT_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// The JSON-RPC endpoint of the EVM chain.
    #[arg(long, env = "WHALE_VAULT_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Whether to use the real relay or the demo backend.
    #[arg(long, env = "WHALE_VAULT_MODE", value_enum, default_value_t = BackendMode::Real)]
    pub mode: BackendMode,

    /// Timeout of each HTTP request (milliseconds).
    #[arg(long = "timeout-ms", env = "WHALE_VAULT_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// The key sent as a bearer token with administrative requests.
    #[arg(long, env = "WHALE_VAULT_ADMIN_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_api_key: Option<String>,

    /// The maximum number of status queries while waiting for a mint.
    #[arg(long, env = "WHALE_VAULT_POLL_ATTEMPTS", default_value_t = DEFAULT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,

    /// The pause between two status queries (milliseconds).
    #[arg(long = "poll-interval-ms", env = "WHALE_VAULT_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// The pauses between receipt lookups (milliseconds, comma-separated). One more
    /// lookup is made after the last pause.
    #[arg(
        long = "receipt-backoff-ms",
        env = "WHALE_VAULT_RECEIPT_BACKOFF_MS",
        value_delimiter = ',',
        default_value = "250,500,900,1500,2200,3200"
    )]
    pub receipt_backoff_ms: Vec<u64>,

    /// The token whose balance is refreshed when a top-up returns an unusable hash.
    #[arg(long, env = "WHALE_VAULT_DEFAULT_TOKEN")]
    pub default_token: Option<String>,

    /// The file keeping the session between runs.
    #[arg(long = "session", env = "WHALE_VAULT_SESSION")]
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            mode: BackendMode::Real,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            admin_api_key: None,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            receipt_backoff_ms: DEFAULT_RECEIPT_BACKOFF_MS.to_vec(),
            default_token: None,
            session_path: None,
        }
    }
}

impl ClientConfig {
    /// Reads a configuration saved as JSON. Missing fields take their default value.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let contents = fs_err::read_to_string(path).map_err(|error| Error::Config(error.to_string()))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|error| Error::Config(format!("{}: {error}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|error| Error::Config(error.to_string()))?;
        fs_err::write(path, contents).map_err(|error| Error::Config(error.to_string()))
    }

    /// Checks the values that would make the client unusable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_attempts == 0 {
            return Err(Error::Config("the poll budget must be at least 1".into()));
        }
        if self.backend_url.trim().is_empty() {
            return Err(Error::Config("the backend URL is empty".into()));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(Error::Config("the JSON-RPC URL is empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.poll_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::from_millis(&self.receipt_backoff_ms)
    }

    /// The session file, in the current directory unless configured.
    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
    }
}
