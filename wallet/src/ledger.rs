//! Transaction History
//!
//! The active history is the merge of what the node reports for the tracked
//! accounts and what this wallet recorded locally. Entries are keyed by hash;
//! on merge the node's copy wins and the node's order comes first.
//!
//! Deleting is a soft delete: the record moves to a separate deleted list
//! stamped with the deletion time. A hash is never in both lists.
//!
//! Transfers this wallet submits are also kept in a submitted list until
//! their receipt is recorded, so a refresh can resolve them by hash however
//! far back they were mined.

use chrono::{DateTime, Utc};
use gw_crypto_secp256k1::Address;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
    time::Duration,
};
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, WalletError},
    rpc::{NodeRpc, TransactionReceipt, TxHash},
    storage::{
        load_list, save_list, Storage, DELETED_TRANSACTIONS_KEY, SUBMITTED_TRANSACTIONS_KEY,
        TRANSACTIONS_KEY,
    },
    units::Wei,
};

/// Decimal places of a reported fee total.
pub const FEE_DECIMALS: u32 = 8;

/// On-chain outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

impl TxStatus {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        if receipt.succeeded() {
            TxStatus::Success
        } else {
            TxStatus::Failed
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub from: Address,
    /// None for contract creation
    pub to: Option<Address>,
    /// Ether decimal string
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    /// Gwei decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Ether decimal string, takes precedence over `gas_used * gas_price`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_fee: Option<String>,
    pub status: TxStatus,
    #[serde(default)]
    pub block_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Fee paid by this transaction; unusable inputs count as zero.
    pub fn fee(&self) -> Wei {
        if let Some(fee) = self.gas_fee.as_deref().and_then(|f| Wei::from_ether_str(f).ok()) {
            return fee;
        }

        let gas_used = self
            .gas_used
            .as_deref()
            .and_then(|g| g.trim().parse::<u128>().ok());
        let gas_price = self
            .gas_price
            .as_deref()
            .and_then(|p| Wei::from_gwei_str(p).ok());

        match (gas_used, gas_price) {
            (Some(used), Some(price)) => price.checked_mul(used).unwrap_or(Wei::ZERO),
            _ => Wei::ZERO,
        }
    }
}

/// A record moved out of the active history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTransactionRecord {
    #[serde(flatten)]
    pub record: TransactionRecord,
    pub deleted_at: DateTime<Utc>,
}

/// A transfer the node accepted whose receipt has not been recorded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransfer {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    /// Ether decimal string
    pub value: String,
    /// Gwei decimal string of the signed gas price
    pub gas_price: String,
    pub submitted_at: DateTime<Utc>,
}

impl SubmittedTransfer {
    /// History entry for this transfer once `receipt` is known.
    pub fn to_record(&self, receipt: &TransactionReceipt, timestamp: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            hash: self.hash,
            from: self.from,
            to: Some(self.to),
            value: self.value.clone(),
            gas_used: Some(receipt.gas_used.to_string()),
            gas_price: Some(
                receipt
                    .effective_gas_price
                    .map_or_else(|| self.gas_price.clone(), |p| p.to_gwei_string()),
            ),
            gas_fee: None,
            status: TxStatus::from_receipt(receipt),
            block_number: receipt.block_number,
            timestamp,
        }
    }
}

/// Sum of fees, rounded half-up to [`FEE_DECIMALS`] ether decimals.
pub fn aggregate_fee<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Wei {
    records
        .into_iter()
        .fold(Wei::ZERO, |total, record| total.saturating_add(record.fee()))
        .round_ether(FEE_DECIMALS)
}

/// Concatenate `primary` then `secondary`, keeping the first record per hash
/// and dropping any hash in `excluded`.
pub fn merge_records(
    primary: Vec<TransactionRecord>,
    secondary: Vec<TransactionRecord>,
    excluded: &HashSet<TxHash>,
) -> Vec<TransactionRecord> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|record| !excluded.contains(&record.hash) && seen.insert(record.hash))
        .collect()
}

/// Reconciled transaction history for the tracked accounts.
pub struct TransactionLedger {
    store: Arc<dyn Storage>,
    rpc: Arc<dyn NodeRpc>,
    accounts: RwLock<Vec<Address>>,
    scan_blocks: u64,
    /// Serializes read-modify-write cycles on the persisted lists
    store_lock: Mutex<()>,
    /// Held for the whole of a refresh
    refresh_gate: Mutex<()>,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn Storage>, rpc: Arc<dyn NodeRpc>, scan_blocks: u64) -> Self {
        Self {
            store,
            rpc,
            accounts: RwLock::new(Vec::new()),
            scan_blocks,
            store_lock: Mutex::new(()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Replace the set of accounts whose history is fetched.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        if let Ok(mut tracked) = self.accounts.write() {
            *tracked = accounts;
        }
    }

    pub fn tracked_accounts(&self) -> Vec<Address> {
        self.accounts
            .read()
            .map(|tracked| tracked.clone())
            .unwrap_or_default()
    }

    /// Active history as persisted.
    pub fn active(&self) -> Result<Vec<TransactionRecord>> {
        load_list(self.store.as_ref(), TRANSACTIONS_KEY)
    }

    /// Deleted history as persisted.
    pub fn deleted(&self) -> Result<Vec<DeletedTransactionRecord>> {
        load_list(self.store.as_ref(), DELETED_TRANSACTIONS_KEY)
    }

    /// Submitted transfers still awaiting a recorded receipt.
    pub fn submitted(&self) -> Result<Vec<SubmittedTransfer>> {
        load_list(self.store.as_ref(), SUBMITTED_TRANSACTIONS_KEY)
    }

    /// Remember a transfer the node has accepted until its receipt is
    /// recorded.
    pub async fn track_submitted(&self, transfer: SubmittedTransfer) -> Result<()> {
        let _guard = self.store_lock.lock().await;

        let mut submitted = self.submitted()?;
        if submitted.iter().any(|t| t.hash == transfer.hash) {
            return Ok(());
        }
        debug!("Tracking submitted transaction {}", transfer.hash);
        submitted.push(transfer);
        save_list(self.store.as_ref(), SUBMITTED_TRANSACTIONS_KEY, &submitted)
    }

    /// Drop `hashes` from the submitted list. Caller holds `store_lock`.
    fn untrack_submitted(&self, hashes: &HashSet<TxHash>) -> Result<()> {
        let mut submitted = self.submitted()?;
        let before = submitted.len();
        submitted.retain(|t| !hashes.contains(&t.hash));
        if submitted.len() == before {
            return Ok(());
        }
        save_list(self.store.as_ref(), SUBMITTED_TRANSACTIONS_KEY, &submitted)
    }

    /// Merge the node's view into the active history and return the result.
    ///
    /// Waits for a refresh already in flight. If the node cannot be reached
    /// the persisted lists are left as they are.
    pub async fn refresh(&self) -> Result<Vec<TransactionRecord>> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Like [`Self::refresh`], but returns `None` instead of waiting when a
    /// refresh is already running.
    pub async fn try_refresh(&self) -> Result<Option<Vec<TransactionRecord>>> {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            debug!("History refresh already in flight, skipping");
            return Ok(None);
        };
        self.refresh_locked().await.map(Some)
    }

    async fn refresh_locked(&self) -> Result<Vec<TransactionRecord>> {
        let accounts = self.tracked_accounts();
        let mut remote = self.fetch_remote(&accounts).await?;
        let resolved = self.resolve_submitted().await?;
        let resolved_hashes: HashSet<TxHash> = resolved.iter().map(|r| r.hash).collect();
        remote.extend(resolved);

        let _guard = self.store_lock.lock().await;
        let local = self.active()?;
        let deleted: HashSet<TxHash> = self.deleted()?.iter().map(|d| d.record.hash).collect();

        let merged = merge_records(remote, local, &deleted);
        save_list(self.store.as_ref(), TRANSACTIONS_KEY, &merged)?;
        self.untrack_submitted(&resolved_hashes)?;
        debug!("History refreshed: {} active records", merged.len());
        Ok(merged)
    }

    /// Records for submitted transfers whose receipt is now available.
    async fn resolve_submitted(&self) -> Result<Vec<TransactionRecord>> {
        let mut resolved = Vec::new();

        for transfer in self.submitted()? {
            let Some(receipt) = self.rpc.get_transaction_receipt(&transfer.hash).await? else {
                continue;
            };
            let block = match receipt.block_number {
                Some(number) => self.rpc.get_block(number).await?,
                None => None,
            };
            let timestamp = block
                .and_then(|b| DateTime::from_timestamp(b.timestamp as i64, 0))
                .unwrap_or(transfer.submitted_at);

            resolved.push(transfer.to_record(&receipt, timestamp));
        }

        if !resolved.is_empty() {
            info!("Resolved {} submitted transactions", resolved.len());
        }
        Ok(resolved)
    }

    /// Transactions touching `accounts` in the most recent blocks, newest
    /// first.
    async fn fetch_remote(&self, accounts: &[Address]) -> Result<Vec<TransactionRecord>> {
        if accounts.is_empty() || self.scan_blocks == 0 {
            return Ok(Vec::new());
        }

        let head = self.rpc.block_number().await?;
        let low = head.saturating_sub(self.scan_blocks - 1);
        let mut records = Vec::new();

        for number in (low..=head).rev() {
            let Some(block) = self.rpc.get_block(number).await? else {
                continue;
            };
            let timestamp =
                DateTime::from_timestamp(block.timestamp as i64, 0).unwrap_or_default();

            for tx in block.transactions.iter().rev() {
                let involved = accounts.contains(&tx.from)
                    || tx.to.map_or(false, |to| accounts.contains(&to));
                if !involved {
                    continue;
                }

                let Some(receipt) = self.rpc.get_transaction_receipt(&tx.hash).await? else {
                    continue;
                };
                let gas_price = receipt.effective_gas_price.or(tx.gas_price);

                records.push(TransactionRecord {
                    hash: tx.hash,
                    from: tx.from,
                    to: tx.to,
                    value: tx.value.to_ether_string(),
                    gas_used: Some(receipt.gas_used.to_string()),
                    gas_price: gas_price.map(|p| p.to_gwei_string()),
                    gas_fee: None,
                    status: TxStatus::from_receipt(&receipt),
                    block_number: Some(block.number),
                    timestamp,
                });
            }
        }

        Ok(records)
    }

    /// Put a locally observed record at the head of the active history.
    /// Returns false when the hash is already known. Either way the hash
    /// leaves the submitted list.
    pub async fn record_local(&self, record: TransactionRecord) -> Result<bool> {
        let _guard = self.store_lock.lock().await;
        let hash = record.hash;

        let mut active = self.active()?;
        let known = active.iter().any(|r| r.hash == hash)
            || self.deleted()?.iter().any(|d| d.record.hash == hash);
        if known {
            debug!("Transaction {} already in history", hash);
        } else {
            info!("Recorded transaction {} ({:?})", hash, record.status);
            active.insert(0, record);
            save_list(self.store.as_ref(), TRANSACTIONS_KEY, &active)?;
        }

        // History first: an interrupted record is resolved again by refresh
        self.untrack_submitted(&HashSet::from([hash]))?;
        Ok(!known)
    }

    /// Soft-delete one record. Unknown hashes are a no-op returning false.
    pub async fn delete(&self, hash: &TxHash) -> Result<bool> {
        let _guard = self.store_lock.lock().await;

        let mut active = self.active()?;
        let Some(index) = active.iter().position(|r| &r.hash == hash) else {
            return Ok(false);
        };
        let record = active.remove(index);

        let mut deleted = self.deleted()?;
        deleted.push(DeletedTransactionRecord {
            record,
            deleted_at: Utc::now(),
        });

        // Deleted list first: an interrupted delete leaves a duplicate that the
        // next refresh drops, never a lost record.
        save_list(self.store.as_ref(), DELETED_TRANSACTIONS_KEY, &deleted)?;
        save_list(self.store.as_ref(), TRANSACTIONS_KEY, &active)?;
        info!("Deleted transaction {} from history", hash);
        Ok(true)
    }

    /// Soft-delete every active record with one shared timestamp. Returns the
    /// number moved.
    pub async fn clear_all(&self) -> Result<usize> {
        let _guard = self.store_lock.lock().await;

        let active = self.active()?;
        if active.is_empty() {
            return Ok(0);
        }

        let deleted_at = Utc::now();
        let count = active.len();
        let mut deleted = self.deleted()?;
        deleted.extend(
            active
                .into_iter()
                .map(|record| DeletedTransactionRecord { record, deleted_at }),
        );

        save_list(self.store.as_ref(), DELETED_TRANSACTIONS_KEY, &deleted)?;
        save_list::<TransactionRecord>(self.store.as_ref(), TRANSACTIONS_KEY, &[])?;
        info!("Cleared {} transactions from history", count);
        Ok(count)
    }

    /// Fee total over the active history.
    pub fn aggregate_fee(&self) -> Result<Wei> {
        Ok(aggregate_fee(&self.active()?))
    }
}

/// Refresh `ledger` every `period` until `shutdown` fires. Ticks that land
/// while a refresh is still running are skipped.
pub fn spawn_refresh_task(
    ledger: Arc<TransactionLedger>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("History refresh every {:?}", period);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let result = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = ledger.try_refresh() => result,
                    };
                    match result {
                        Ok(_) => {}
                        Err(WalletError::Node(e)) => warn!("History refresh failed: {}", e),
                        Err(e) => warn!("History refresh error: {}", e),
                    }
                }
            }
        }

        info!("History refresh stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rpc::Block,
        storage::MemoryStore,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Chain with only a genesis block whose `eth_blockNumber` answers one
    /// caller at a time, each after `release` is notified.
    #[derive(Default)]
    struct GatedNode {
        entered: Notify,
        release: Notify,
        height_calls: AtomicUsize,
    }

    #[async_trait]
    impl NodeRpc for GatedNode {
        async fn accounts(&self) -> Result<Vec<Address>> {
            unimplemented!()
        }
        async fn send_transaction(&self, _: Address, _: Address, _: Wei, _: u64) -> Result<TxHash> {
            unimplemented!()
        }
        async fn send_raw_transaction(&self, _: &[u8]) -> Result<TxHash> {
            unimplemented!()
        }
        async fn get_balance(&self, _: Address) -> Result<Wei> {
            unimplemented!()
        }
        async fn gas_price(&self) -> Result<Wei> {
            unimplemented!()
        }
        async fn get_transaction_count(&self, _: Address) -> Result<u64> {
            unimplemented!()
        }
        async fn get_transaction_receipt(&self, _: &TxHash) -> Result<Option<TransactionReceipt>> {
            Ok(None)
        }
        async fn chain_id(&self) -> Result<u64> {
            unimplemented!()
        }
        async fn block_number(&self) -> Result<u64> {
            self.height_calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(0)
        }
        async fn get_block(&self, number: u64) -> Result<Option<Block>> {
            Ok(Some(Block {
                number,
                timestamp: 1_700_000_000,
                transactions: Vec::new(),
            }))
        }
    }

    fn record(hash_byte: u8, value: &str) -> TransactionRecord {
        TransactionRecord {
            hash: TxHash([hash_byte; 32]),
            from: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap(),
            to: Some("0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap()),
            value: value.to_string(),
            gas_used: None,
            gas_price: None,
            gas_fee: None,
            status: TxStatus::Success,
            block_number: Some(1),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn submitted(hash_byte: u8) -> SubmittedTransfer {
        let base = record(hash_byte, "2.0");
        SubmittedTransfer {
            hash: base.hash,
            from: base.from,
            to: base.to.unwrap(),
            value: base.value,
            gas_price: "3.0".to_string(),
            submitted_at: base.timestamp,
        }
    }

    #[test]
    fn test_merge_remote_first() {
        let remote = vec![record(1, "1.0"), record(2, "2.0")];
        let local = vec![record(2, "9.0"), record(3, "3.0")];

        let merged = merge_records(remote, local, &HashSet::new());
        let hashes: Vec<u8> = merged.iter().map(|r| r.hash.0[0]).collect();
        assert_eq!(hashes, vec![1, 2, 3]);
        // remote copy wins
        assert_eq!(merged[1].value, "2.0");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let remote = vec![record(1, "1.0"), record(2, "2.0")];
        let local = vec![record(3, "3.0")];

        let once = merge_records(remote.clone(), local, &HashSet::new());
        let twice = merge_records(remote, once.clone(), &HashSet::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_excludes_deleted() {
        let excluded: HashSet<TxHash> = [TxHash([2; 32])].into_iter().collect();
        let merged = merge_records(vec![record(1, "1.0"), record(2, "2.0")], vec![], &excluded);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].hash, TxHash([1; 32]));
    }

    #[test]
    fn test_fee_from_gas() {
        let mut tx = record(1, "1.0");
        tx.gas_used = Some("21000".to_string());
        tx.gas_price = Some("20".to_string());
        assert_eq!(tx.fee().to_ether_string(), "0.00042");

        // stored fee takes precedence
        tx.gas_fee = Some("0.5".to_string());
        assert_eq!(tx.fee().to_ether_string(), "0.5");
    }

    #[test]
    fn test_fee_unusable_inputs_are_zero() {
        let mut tx = record(1, "1.0");
        assert_eq!(tx.fee(), Wei::ZERO);

        tx.gas_used = Some("lots".to_string());
        tx.gas_price = Some("20".to_string());
        assert_eq!(tx.fee(), Wei::ZERO);

        tx.gas_used = Some("21000".to_string());
        tx.gas_price = None;
        assert_eq!(tx.fee(), Wei::ZERO);
    }

    #[test]
    fn test_aggregate_fee_rounds_to_8_places() {
        let mut a = record(1, "1.0");
        a.gas_used = Some("21000".to_string());
        a.gas_price = Some("1.000000007".to_string());
        let mut b = record(2, "1.0");
        b.gas_fee = Some("not-a-number".to_string());
        let mut c = record(3, "1.0");
        c.gas_fee = Some("0.000000004".to_string());

        // 0.000021000000147 + 0 + 0.000000004 = 0.000021004000147
        let total = aggregate_fee(&[a, b, c]);
        assert_eq!(total.to_ether_fixed(FEE_DECIMALS), "0.00002100");
        assert_eq!(total, Wei::from_ether_str("0.000021").unwrap());
    }

    #[test]
    fn test_record_json_shape() {
        let mut tx = record(0xab, "1.5");
        tx.gas_used = Some("21000".to_string());
        tx.gas_price = Some("1.0".to_string());
        let deleted = DeletedTransactionRecord {
            record: tx.clone(),
            deleted_at: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
        };

        let json = serde_json::to_value(&deleted).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["gasUsed"], "21000");
        assert_eq!(json["blockNumber"], 1);
        assert!(json.get("gasFee").is_none());
        assert!(json.get("deletedAt").is_some());
        assert!(json.get("record").is_none());

        let back: DeletedTransactionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.record, tx);
    }

    #[tokio::test]
    async fn test_refresh_does_not_overlap() {
        let node = Arc::new(GatedNode::default());
        let ledger = Arc::new(TransactionLedger::new(
            Arc::new(MemoryStore::new()),
            node.clone(),
            16,
        ));
        ledger.set_accounts(vec![record(1, "1.0").from]);

        let first = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.refresh().await }
        });
        node.entered.notified().await;

        // the first refresh is parked inside the node call
        assert!(ledger.try_refresh().await.unwrap().is_none());
        let second = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.refresh().await }
        });
        tokio::task::yield_now().await;
        assert!(!second.is_finished());
        assert_eq!(node.height_calls.load(Ordering::SeqCst), 1);

        node.release.notify_one();
        assert!(first.await.unwrap().unwrap().is_empty());

        // the waiting refresh runs only after the first one finished
        node.entered.notified().await;
        assert_eq!(node.height_calls.load(Ordering::SeqCst), 2);
        node.release.notify_one();
        assert!(second.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_submission_stays_tracked() {
        let node = Arc::new(GatedNode::default());
        let ledger = TransactionLedger::new(Arc::new(MemoryStore::new()), node, 16);
        let transfer = submitted(7);

        ledger.track_submitted(transfer.clone()).await.unwrap();
        ledger.track_submitted(transfer.clone()).await.unwrap();
        // no tracked accounts: refresh only looks up receipts
        assert!(ledger.refresh().await.unwrap().is_empty());
        assert_eq!(ledger.submitted().unwrap(), vec![transfer.clone()]);

        let receipt = TransactionReceipt {
            transaction_hash: transfer.hash,
            status: Some(1),
            gas_used: 21_000,
            block_number: Some(3),
            effective_gas_price: None,
        };
        let record = transfer.to_record(&receipt, transfer.submitted_at);
        assert!(ledger.record_local(record.clone()).await.unwrap());
        assert!(ledger.submitted().unwrap().is_empty());
        assert_eq!(ledger.active().unwrap(), vec![record]);
    }

    #[test]
    fn test_record_from_failed_receipt() {
        let transfer = submitted(9);
        let receipt = TransactionReceipt {
            transaction_hash: transfer.hash,
            status: Some(0),
            gas_used: 21_000,
            block_number: Some(12),
            effective_gas_price: None,
        };

        let record = transfer.to_record(&receipt, transfer.submitted_at);
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(record.value, "2.0");
        assert_eq!(record.gas_price.as_deref(), Some("3.0"));
        assert_eq!(record.fee().to_ether_string(), "0.000063");
        assert_eq!(record.block_number, Some(12));

        let receipt = TransactionReceipt {
            effective_gas_price: Some(Wei::from_gwei_str("4").unwrap()),
            ..receipt
        };
        let record = transfer.to_record(&receipt, transfer.submitted_at);
        assert_eq!(record.gas_price.as_deref(), Some("4.0"));
    }
}
