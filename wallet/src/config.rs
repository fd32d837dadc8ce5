//! Configuration for the wallet.

use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{keystore::KdfParams, units::Wei};

/// Wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the node
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Directory holding accounts and transaction history
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Chain id used for signing; queried from the node when unset
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Per-request RPC timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,

    /// Period of the background history refresh in seconds
    #[serde(default = "default_history_refresh")]
    pub history_refresh_secs: u64,

    /// Number of recent blocks scanned for account history
    #[serde(default = "default_history_scan_blocks")]
    pub history_scan_blocks: u64,

    /// Receipt polling interval in milliseconds
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,

    /// Give up waiting for a receipt after this many seconds (0 = never)
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,

    /// Quiet period before a fee estimate is issued, in milliseconds
    #[serde(default = "default_estimate_debounce")]
    pub estimate_debounce_ms: u64,

    /// Ether sent to a newly funded test account
    #[serde(default = "default_test_funding_amount")]
    pub test_funding_amount: String,

    /// Argon2id cost for newly sealed keys
    #[serde(default)]
    pub kdf: KdfParams,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("geth-wallet"))
        .unwrap_or_else(|| PathBuf::from(".geth-wallet"))
}

fn default_rpc_timeout() -> u64 {
    30
}

fn default_history_refresh() -> u64 {
    5
}

fn default_history_scan_blocks() -> u64 {
    128
}

fn default_receipt_poll_interval() -> u64 {
    1000
}

fn default_receipt_timeout() -> u64 {
    600
}

fn default_estimate_debounce() -> u64 {
    600
}

fn default_test_funding_amount() -> String {
    "30".to_string()
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            data_dir: default_data_dir(),
            chain_id: None,
            rpc_timeout_secs: default_rpc_timeout(),
            history_refresh_secs: default_history_refresh(),
            history_scan_blocks: default_history_scan_blocks(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            receipt_timeout_secs: default_receipt_timeout(),
            estimate_debounce_ms: default_estimate_debounce(),
            test_funding_amount: default_test_funding_amount(),
            kdf: KdfParams::default(),
        }
    }
}

impl WalletConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WalletConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            anyhow::bail!("rpc_url must be an http(s) URL, got {}", self.rpc_url);
        }

        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("rpc_timeout_secs must be greater than zero");
        }

        if self.history_refresh_secs == 0 {
            anyhow::bail!("history_refresh_secs must be greater than zero");
        }

        if self.receipt_poll_interval_ms == 0 {
            anyhow::bail!("receipt_poll_interval_ms must be greater than zero");
        }

        if self.chain_id == Some(0) {
            anyhow::bail!("chain_id must be non-zero");
        }

        let funding = Wei::from_ether_str(&self.test_funding_amount)
            .map_err(|e| anyhow::anyhow!("test_funding_amount: {}", e))?;
        if funding.is_zero() {
            anyhow::bail!("test_funding_amount must be positive");
        }

        argon2::Params::new(
            self.kdf.memory_kib,
            self.kdf.iterations,
            self.kdf.parallelism,
            Some(32),
        )
        .map_err(|e| anyhow::anyhow!("Invalid kdf parameters: {}", e))?;

        if self.history_scan_blocks > 10_000 {
            tracing::warn!(
                "Scanning {} blocks per history refresh may be slow",
                self.history_scan_blocks
            );
        }

        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn history_refresh_period(&self) -> Duration {
        Duration::from_secs(self.history_refresh_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// None when receipt waiting is unbounded.
    pub fn receipt_timeout(&self) -> Option<Duration> {
        (self.receipt_timeout_secs > 0).then(|| Duration::from_secs(self.receipt_timeout_secs))
    }

    pub fn estimate_debounce(&self) -> Duration {
        Duration::from_millis(self.estimate_debounce_ms)
    }
}
