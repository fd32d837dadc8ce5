//! Transfer Pipeline
//!
//! One transfer moves through
//! `Validated -> Estimated -> BalanceChecked -> Signed -> Submitted -> Pending`
//! and ends `Confirmed` or `Failed`, or leaves early as `Rejected`.
//!
//! [`TransactionPipeline::send`] returns as soon as the node accepts the
//! transaction. The receipt is awaited by a background watcher which records
//! the outcome in the ledger. Accepted transfers are tracked as submitted
//! first, so a watcher that is cancelled or times out leaves the transfer for
//! a later history refresh to resolve by hash.
//!
//! Transfers from the same sender are serialized from the balance check
//! through submission so nonces are assigned in order.

use chrono::Utc;
use gw_crypto_secp256k1::Address;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};
use tokio::{
    sync::{watch, Mutex, OnceCell},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    error::{Result, WalletError},
    fee_estimation::{GasEstimate, GasEstimator},
    keystore::KeystoreManager,
    ledger::{SubmittedTransfer, TransactionLedger, TransactionRecord, TxStatus},
    rpc::{NodeRpc, TxHash},
    transaction::{SignedTransfer, TransferTransaction},
    units::Wei,
};

/// Progress of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Validated,
    Estimated,
    BalanceChecked,
    Signed,
    Submitted,
    Pending,
    Confirmed,
    Failed,
    Rejected,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Confirmed | TransferState::Failed | TransferState::Rejected
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A checked transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
}

impl TransferRequest {
    /// Parse raw input. Fails with [`WalletError::InvalidInput`] on an empty
    /// or malformed address or a non-positive amount.
    pub fn parse(from: &str, to: &str, amount: &str) -> Result<Self> {
        let from = parse_address("sender", from)?;
        let to = parse_address("recipient", to)?;
        let value = Wei::from_ether_str(amount)?;
        if value.is_zero() {
            return Err(WalletError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }
        Ok(Self { from, to, value })
    }
}

fn parse_address(role: &str, s: &str) -> Result<Address> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidInput(format!("Missing {} address", role)));
    }
    trimmed
        .parse()
        .map_err(|e| WalletError::InvalidInput(format!("Invalid {} address: {}", role, e)))
}

/// Timing knobs for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Chain id for replay protection; queried once from the node when None
    pub chain_id: Option<u64>,
    pub receipt_poll_interval: Duration,
    /// None waits for a receipt until cancelled
    pub receipt_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chain_id: None,
            receipt_poll_interval: Duration::from_secs(1),
            receipt_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// How a receipt wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Mined and executed
    Confirmed(TransactionRecord),
    /// Mined but execution failed; recorded, not an error
    Failed(TransactionRecord),
    /// Stopped waiting before a receipt arrived
    Abandoned,
}

/// A submitted transfer whose receipt is being awaited.
///
/// Dropping this does not stop the watcher.
pub struct PendingTransfer {
    pub hash: TxHash,
    state: watch::Receiver<TransferState>,
    cancel: CancellationToken,
    watcher: JoinHandle<Result<TransferOutcome>>,
}

impl PendingTransfer {
    pub fn state(&self) -> TransferState {
        *self.state.borrow()
    }

    /// Receive state changes.
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.clone()
    }

    /// Stop waiting for the receipt.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the watcher to finish.
    pub async fn wait(self) -> Result<TransferOutcome> {
        self.watcher.await.map_err(|e| {
            warn!("Receipt watcher for {} ended abnormally: {}", self.hash, e);
            WalletError::Cancelled
        })?
    }
}

/// Orchestrates transfers: validate, estimate, check funds, sign, submit and
/// watch for the receipt.
pub struct TransactionPipeline {
    keystore: Arc<KeystoreManager>,
    estimator: GasEstimator,
    rpc: Arc<dyn NodeRpc>,
    ledger: Arc<TransactionLedger>,
    settings: PipelineSettings,
    chain_id: OnceCell<u64>,
    sender_locks: StdMutex<HashMap<Address, Arc<Mutex<()>>>>,
    shutdown: CancellationToken,
}

impl TransactionPipeline {
    pub fn new(
        keystore: Arc<KeystoreManager>,
        rpc: Arc<dyn NodeRpc>,
        ledger: Arc<TransactionLedger>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            keystore,
            estimator: GasEstimator::new(rpc.clone()),
            rpc,
            ledger,
            settings,
            chain_id: OnceCell::new(),
            sender_locks: StdMutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Send `amount` ether from `from` to `to`, signing with the key unlocked
    /// by `password`. Returns once the node has accepted the transaction.
    pub async fn send(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        password: &str,
    ) -> Result<PendingTransfer> {
        let (state_tx, state_rx) = watch::channel(TransferState::Validated);

        let submitted = match self.submit(from, to, amount, password, &state_tx).await {
            Ok(submitted) => submitted,
            Err(e) => {
                let terminal = if e.is_rejection() {
                    TransferState::Rejected
                } else {
                    TransferState::Failed
                };
                warn!("Transfer from {} {}: {}", from.trim(), terminal, e);
                state_tx.send_replace(terminal);
                return Err(e);
            }
        };

        let hash = submitted.hash;
        let cancel = self.shutdown.child_token();
        let watcher = tokio::spawn(watch_receipt(
            self.rpc.clone(),
            self.ledger.clone(),
            submitted,
            self.settings,
            state_tx,
            cancel.clone(),
        ));

        Ok(PendingTransfer {
            hash,
            state: state_rx,
            cancel,
            watcher,
        })
    }

    /// Everything up to and including submission.
    async fn submit(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        password: &str,
        state: &watch::Sender<TransferState>,
    ) -> Result<SubmittedTransfer> {
        let request = TransferRequest::parse(from, to, amount)?;
        // Unknown senders fail before touching the node
        self.keystore.get(request.from)?;

        let sender_lock = self.sender_lock(request.from);
        let _sender_guard = sender_lock.lock().await;

        let estimate = self.estimator.estimate_transfer().await?;
        advance(state, TransferState::Estimated, &request);

        self.check_balance(&request, &estimate).await?;
        advance(state, TransferState::BalanceChecked, &request);

        let nonce = self.rpc.get_transaction_count(request.from).await?;
        let chain_id = self.chain_id().await?;
        let transfer = TransferTransaction::new(nonce, estimate.gas_price, request.to, request.value);

        let signed = self
            .sign(request.from, password, transfer, chain_id)
            .await?;
        advance(state, TransferState::Signed, &request);

        let hash = self.rpc.send_raw_transaction(&signed.raw).await?;
        if hash != signed.hash {
            warn!("Node returned hash {} for transaction {}", hash, signed.hash);
        }
        info!(
            "Submitted {} from {} to {} as {} (nonce {})",
            request.value, request.from, request.to, hash, nonce
        );
        advance(state, TransferState::Submitted, &request);

        let submitted = SubmittedTransfer {
            hash,
            from: request.from,
            to: request.to,
            value: request.value.to_ether_string(),
            gas_price: estimate.gas_price.to_gwei_string(),
            submitted_at: Utc::now(),
        };
        // The node holds the transaction now; failing to track it is not a send failure
        if let Err(e) = self.ledger.track_submitted(submitted.clone()).await {
            warn!("Could not track submitted transaction {}: {}", hash, e);
        }
        Ok(submitted)
    }

    async fn check_balance(&self, request: &TransferRequest, estimate: &GasEstimate) -> Result<()> {
        let balance = self.rpc.get_balance(request.from).await?;
        let required = request
            .value
            .checked_add(estimate.fee)
            .ok_or_else(|| WalletError::InvalidInput("Amount is too large".to_string()))?;

        if balance < required {
            return Err(WalletError::InsufficientFunds {
                balance: balance.to_ether_string(),
                required: required.to_ether_string(),
            });
        }
        Ok(())
    }

    /// Unlock and sign off the async runtime; the key lives only inside the
    /// blocking task.
    async fn sign(
        &self,
        from: Address,
        password: &str,
        transfer: TransferTransaction,
        chain_id: u64,
    ) -> Result<SignedTransfer> {
        let keystore = self.keystore.clone();
        let password = Zeroizing::new(password.to_owned());

        tokio::task::spawn_blocking(move || -> Result<SignedTransfer> {
            let signer = keystore.unlock(from, &password)?;
            let signature = signer.sign_once(&transfer.signing_hash(chain_id))?;
            Ok(transfer.into_signed(chain_id, &signature))
        })
        .await
        .map_err(|e| WalletError::Crypto(format!("Signing task failed: {}", e)))?
    }

    async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                match self.settings.chain_id {
                    Some(id) => Ok(id),
                    None => self.rpc.chain_id().await,
                }
            })
            .await
            .copied()
    }

    fn sender_lock(&self, from: Address) -> Arc<Mutex<()>> {
        let mut locks = self
            .sender_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(from).or_default().clone()
    }

    /// Stop every receipt watcher.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TransactionPipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn advance(state: &watch::Sender<TransferState>, next: TransferState, request: &TransferRequest) {
    debug!("Transfer from {}: {}", request.from, next);
    state.send_replace(next);
}

async fn watch_receipt(
    rpc: Arc<dyn NodeRpc>,
    ledger: Arc<TransactionLedger>,
    submitted: SubmittedTransfer,
    settings: PipelineSettings,
    state: watch::Sender<TransferState>,
    cancel: CancellationToken,
) -> Result<TransferOutcome> {
    let hash = submitted.hash;
    state.send_replace(TransferState::Pending);

    let deadline = settings.receipt_timeout.map(|t| Instant::now() + t);
    let receipt = loop {
        match rpc.get_transaction_receipt(&hash).await {
            Ok(Some(receipt)) => break receipt,
            Ok(None) => {}
            Err(e) => warn!("Receipt lookup for {} failed: {}", hash, e),
        }

        if deadline.map_or(false, |d| Instant::now() >= d) {
            warn!("No receipt for {} before timeout, giving up", hash);
            return Ok(TransferOutcome::Abandoned);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Stopped waiting for {}", hash);
                return Ok(TransferOutcome::Abandoned);
            }
            _ = tokio::time::sleep(settings.receipt_poll_interval) => {}
        }
    };

    let record = submitted.to_record(&receipt, Utc::now());
    ledger.record_local(record.clone()).await?;

    if record.status == TxStatus::Success {
        info!("Transaction {} confirmed in block {:?}", hash, receipt.block_number);
        state.send_replace(TransferState::Confirmed);
        Ok(TransferOutcome::Confirmed(record))
    } else {
        warn!("{}", WalletError::TransactionFailed(hash));
        state.send_replace(TransferState::Failed);
        Ok(TransferOutcome::Failed(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TO: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    #[test]
    fn test_parse_request() {
        let request = TransferRequest::parse(FROM, TO, "1.5").unwrap();
        assert_eq!(request.from.to_string(), FROM);
        assert_eq!(request.value, Wei::from_ether_str("1.5").unwrap());
    }

    #[test]
    fn test_parse_request_rejects() {
        for (from, to, amount) in [
            ("", TO, "1"),
            (FROM, "  ", "1"),
            ("0x1234", TO, "1"),
            (FROM, TO, "0"),
            (FROM, TO, "0.0"),
            (FROM, TO, "-2"),
            (FROM, TO, "one"),
        ] {
            assert!(
                matches!(
                    TransferRequest::parse(from, to, amount),
                    Err(WalletError::InvalidInput(_))
                ),
                "accepted {:?} -> {:?} amount {:?}",
                from,
                to,
                amount
            );
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Confirmed.is_terminal());
        assert!(TransferState::Failed.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(!TransferState::Pending.is_terminal());
        assert!(!TransferState::Submitted.is_terminal());
    }
}
