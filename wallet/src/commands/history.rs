//! Transaction history commands

use anyhow::{anyhow, Result};
use geth_wallet::{ledger::FEE_DECIMALS, TransactionRecord, TxHash, TxStatus, WalletConfig};
use tokio_util::sync::CancellationToken;

use super::{open_wallet, print_error, print_success, print_warning, prompt_confirm};

fn print_table(records: &[(&TransactionRecord, Option<String>)]) {
    println!(
        "{:<68} {:>8} {:>16} {:>12} {:<8}",
        "HASH", "BLOCK", "VALUE (ETH)", "FEE (ETH)", "STATUS"
    );
    println!("{}", "-".repeat(116));

    for (record, deleted_at) in records {
        let status = match record.status {
            TxStatus::Success => "\x1b[32msuccess\x1b[0m",
            TxStatus::Failed => "\x1b[31mfailed\x1b[0m",
        };
        println!(
            "{:<68} {:>8} {:>16} {:>12} {}",
            record.hash.to_string(),
            record
                .block_number
                .map_or("-".to_string(), |b| b.to_string()),
            record.value,
            record.fee().to_ether_fixed(FEE_DECIMALS),
            status
        );
        println!(
            "    {} -> {}  {}",
            record.from,
            record.to.map_or("(contract creation)".to_string(), |to| to.to_string()),
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(deleted_at) = deleted_at {
            println!("    deleted {}", deleted_at);
        }
    }
}

/// Run the history command
pub async fn run(config: &WalletConfig, deleted: bool, limit: usize) -> Result<()> {
    let wallet = open_wallet(config)?;

    if deleted {
        let records = wallet.ledger().deleted()?;
        if records.is_empty() {
            println!("No deleted transactions.");
            return Ok(());
        }

        println!();
        let rows: Vec<_> = records
            .iter()
            .take(limit)
            .map(|d| {
                (
                    &d.record,
                    Some(d.deleted_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                )
            })
            .collect();
        print_table(&rows);
        return Ok(());
    }

    let records = match wallet.refresh_history().await {
        Ok(records) => records,
        Err(e) => {
            print_warning(&format!("Could not reach node, showing stored history: {}", e));
            wallet.ledger().active()?
        }
    };

    let awaiting = wallet.ledger().submitted()?.len();
    if awaiting > 0 {
        println!("{} submitted transfer(s) awaiting a receipt", awaiting);
    }

    if records.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    println!();
    let rows: Vec<_> = records.iter().take(limit).map(|r| (r, None)).collect();
    print_table(&rows);

    println!();
    println!(
        "{} transactions, total fees {} ETH",
        records.len(),
        geth_wallet::ledger::aggregate_fee(&records).to_ether_fixed(FEE_DECIMALS)
    );
    Ok(())
}

/// Move one transaction to the deleted list
pub async fn forget(config: &WalletConfig, hash: &str) -> Result<()> {
    let wallet = open_wallet(config)?;
    let hash: TxHash = hash.parse().map_err(|e| anyhow!("{}", e))?;

    if wallet.ledger().delete(&hash).await? {
        print_success(&format!("Removed {} from history", hash));
    } else {
        print_error(&format!("{} is not in the history", hash));
    }
    Ok(())
}

/// Move every transaction to the deleted list
pub async fn clear(config: &WalletConfig, yes: bool) -> Result<()> {
    let wallet = open_wallet(config)?;

    if !yes && !prompt_confirm("Clear the whole transaction history?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let count = wallet.ledger().clear_all().await?;
    print_success(&format!("Cleared {} transactions", count));
    Ok(())
}

/// Keep the history refreshed until Ctrl-C
pub async fn watch(config: &WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    wallet.refresh_history().await?;

    let shutdown = CancellationToken::new();
    let refresher = wallet.spawn_history_refresh(shutdown.clone());

    println!(
        "Refreshing history every {}s from {} (Ctrl-C to stop)",
        config.history_refresh_secs, config.rpc_url
    );
    tokio::signal::ctrl_c().await?;

    shutdown.cancel();
    refresher.await?;

    let records = wallet.ledger().active()?;
    println!("{} transactions in history", records.len());
    Ok(())
}
