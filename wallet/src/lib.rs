//! Geth Wallet
//!
//! A local wallet for an account-based ledger reached over JSON-RPC. Keys are
//! held in a password-encrypted keystore, transfers are signed locally and
//! submitted as raw transactions, and a transaction history is reconciled
//! from the node and from what this wallet has sent.
//!
//! ## Security Model
//!
//! - Private keys and passwords are never written to disk in the clear
//! - A key is decrypted only for the duration of one signature
//! - The node only ever sees signed transactions

pub mod config;
pub mod error;
pub mod fee_estimation;
pub mod funding;
pub mod keystore;
pub mod ledger;
pub mod pipeline;
pub mod rpc;
pub mod storage;
pub mod transaction;
pub mod units;

pub use config::WalletConfig;
pub use gw_crypto_secp256k1::Address;
pub use error::{Result, WalletError};
pub use fee_estimation::{EstimateDebouncer, FeeQuote, GasEstimate, GasEstimator};
pub use keystore::{Account, AccountOrigin, KdfParams, KeystoreManager, UnlockedSigner};
pub use ledger::{
    DeletedTransactionRecord, SubmittedTransfer, TransactionLedger, TransactionRecord, TxStatus,
};
pub use pipeline::{PendingTransfer, PipelineSettings, TransactionPipeline, TransferOutcome, TransferState};
pub use rpc::{NodeRpc, RpcClient, TxHash};
pub use storage::{FileStore, MemoryStore, Storage};
pub use units::Wei;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The assembled wallet: keystore, estimator, pipeline and ledger sharing one
/// store and one node connection.
pub struct Wallet {
    config: WalletConfig,
    rpc: Arc<dyn NodeRpc>,
    keystore: Arc<KeystoreManager>,
    ledger: Arc<TransactionLedger>,
    estimator: GasEstimator,
    pipeline: TransactionPipeline,
}

impl Wallet {
    /// Open the wallet stored under `config.data_dir`, talking to
    /// `config.rpc_url`.
    pub fn open(config: WalletConfig) -> Result<Self> {
        let store: Arc<dyn Storage> = Arc::new(FileStore::open(&config.data_dir)?);
        let rpc: Arc<dyn NodeRpc> = Arc::new(RpcClient::new(&config.rpc_url, config.rpc_timeout())?);
        Self::with_parts(config, store, rpc)
    }

    /// Assemble a wallet over explicit storage and node implementations.
    pub fn with_parts(config: WalletConfig, store: Arc<dyn Storage>, rpc: Arc<dyn NodeRpc>) -> Result<Self> {
        let keystore = Arc::new(KeystoreManager::new(store.clone(), config.kdf));
        let ledger = Arc::new(TransactionLedger::new(
            store,
            rpc.clone(),
            config.history_scan_blocks,
        ));
        ledger.set_accounts(keystore.list()?);

        let settings = PipelineSettings {
            chain_id: config.chain_id,
            receipt_poll_interval: config.receipt_poll_interval(),
            receipt_timeout: config.receipt_timeout(),
        };
        let pipeline = TransactionPipeline::new(keystore.clone(), rpc.clone(), ledger.clone(), settings);

        Ok(Self {
            estimator: GasEstimator::new(rpc.clone()),
            config,
            rpc,
            keystore,
            ledger,
            pipeline,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn keystore(&self) -> &KeystoreManager {
        &self.keystore
    }

    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }

    pub fn pipeline(&self) -> &TransactionPipeline {
        &self.pipeline
    }

    pub fn rpc(&self) -> &Arc<dyn NodeRpc> {
        &self.rpc
    }

    /// Create an account and start tracking its history.
    pub fn create_account(&self, password: &str) -> Result<Account> {
        let account = self.keystore.create(password)?;
        self.sync_tracked_accounts()?;
        Ok(account)
    }

    /// Import a raw private key and start tracking its history.
    pub fn import_account(&self, raw_key: &str, password: &str) -> Result<Account> {
        let account = self.keystore.import_private_key(raw_key, password)?;
        self.sync_tracked_accounts()?;
        Ok(account)
    }

    /// Remove an account. Its transaction history is kept.
    pub fn delete_account(&self, address: Address) -> Result<bool> {
        let removed = self.keystore.delete(address)?;
        self.sync_tracked_accounts()?;
        Ok(removed)
    }

    fn sync_tracked_accounts(&self) -> Result<()> {
        self.ledger.set_accounts(self.keystore.list()?);
        Ok(())
    }

    /// Current balance of `address`.
    pub async fn balance(&self, address: &str) -> Result<Wei> {
        let address: Address = address
            .trim()
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("Invalid address: {}", e)))?;
        self.rpc.get_balance(address).await
    }

    /// Whether the node answers a chain id query.
    pub async fn check_connection(&self) -> bool {
        match self.rpc.chain_id().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Node at {} unreachable: {}", self.config.rpc_url, e);
                false
            }
        }
    }

    /// Fee estimate for raw form input.
    pub async fn estimate(&self, from: &str, to: &str, amount: &str) -> Result<FeeQuote> {
        self.estimator.estimate(from, to, amount).await
    }

    /// A debouncer using the configured quiet period.
    pub fn estimate_debouncer(&self) -> EstimateDebouncer {
        EstimateDebouncer::new(self.estimator.clone(), self.config.estimate_debounce())
    }

    /// Send a transfer; see [`TransactionPipeline::send`].
    pub async fn send(&self, from: &str, to: &str, amount: &str, password: &str) -> Result<PendingTransfer> {
        self.pipeline.send(from, to, amount, password).await
    }

    /// Reconcile the history with the node.
    pub async fn refresh_history(&self) -> Result<Vec<TransactionRecord>> {
        self.sync_tracked_accounts()?;
        self.ledger.refresh().await
    }

    /// Periodically refresh the history until `shutdown` fires.
    pub fn spawn_history_refresh(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        ledger::spawn_refresh_task(
            self.ledger.clone(),
            self.config.history_refresh_period(),
            shutdown,
        )
    }

    /// Create an account and fund it from the node's first managed account,
    /// with the configured test amount unless `amount` is given.
    pub async fn fund_test_account(
        &self,
        password: &str,
        amount: Option<Wei>,
    ) -> Result<(Account, funding::FundingReceipt)> {
        let amount = match amount {
            Some(amount) => amount,
            None => Wei::from_ether_str(&self.config.test_funding_amount)?,
        };
        let funded =
            funding::fund_test_account(&self.keystore, self.rpc.as_ref(), password, amount).await?;
        self.sync_tracked_accounts()?;
        Ok(funded)
    }

    /// Fund an existing address with `amount` ether.
    pub async fn fund_address(&self, address: Address, amount: Wei) -> Result<funding::FundingReceipt> {
        funding::fund_address(self.rpc.as_ref(), address, amount).await
    }

    /// Stop background receipt watchers.
    pub fn shutdown(&self) {
        self.pipeline.shutdown();
    }
}
