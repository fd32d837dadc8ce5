//! Send and fee estimate commands

use anyhow::Result;
use geth_wallet::{FeeQuote, TransferOutcome, WalletConfig, WalletError};

use super::{open_wallet, print_error, print_success, print_warning, prompt_confirm, prompt_password};

/// Show the fee a transfer would cost
pub async fn estimate(config: &WalletConfig, from: &str, to: &str, amount: &str) -> Result<()> {
    let wallet = open_wallet(config)?;

    match wallet.estimate(from, to, amount).await? {
        FeeQuote::Unavailable => {
            print_warning("Enter a sender, a recipient and a positive amount to estimate the fee.");
        }
        FeeQuote::Ready(estimate) => {
            println!();
            for (name, value) in &estimate.breakdown {
                println!("  {:<10} {}", name, value);
            }
        }
    }
    Ok(())
}

/// Run the send command
pub async fn run(
    config: &WalletConfig,
    from: &str,
    to: &str,
    amount: &str,
    yes: bool,
    no_wait: bool,
) -> Result<()> {
    let wallet = open_wallet(config)?;

    if let FeeQuote::Ready(estimate) = wallet.estimate(from, to, amount).await? {
        println!();
        println!("Transaction details:");
        println!("  From:   {}", from);
        println!("  To:     {}", to);
        println!("  Amount: {} ETH", amount);
        println!("  Fee:    {} ETH", estimate.fee_ether());
        println!();
    }

    if !yes && !prompt_confirm("Send this transaction?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let password = prompt_password("Enter account password: ")?;

    let pending = match wallet.send(from, to, amount, &password).await {
        Ok(pending) => pending,
        Err(e) => {
            match &e {
                WalletError::InsufficientFunds { balance, .. } => {
                    print_error(&format!("Insufficient funds (balance {} ETH)", balance))
                }
                other => print_error(&other.to_string()),
            }
            return Err(e.into());
        }
    };

    print_success(&format!("Transaction submitted: {}", pending.hash));

    if no_wait {
        pending.cancel();
        println!("Not waiting for confirmation; 'geth-wallet history' will pick it up.");
        return Ok(());
    }

    println!("Waiting for confirmation...");
    let waiter = tokio::spawn(pending.wait());
    let outcome = tokio::select! {
        outcome = waiter => outcome??,
        _ = tokio::signal::ctrl_c() => {
            wallet.shutdown();
            println!();
            println!("Stopped waiting; the transaction stays valid on chain.");
            return Ok(());
        }
    };

    match outcome {
        TransferOutcome::Confirmed(record) => print_success(&format!(
            "Confirmed in block {}",
            record.block_number.map_or("?".to_string(), |b| b.to_string())
        )),
        TransferOutcome::Failed(record) => {
            print_error(&format!("Transaction {} failed on chain", record.hash))
        }
        TransferOutcome::Abandoned => {
            print_warning("No receipt yet; 'geth-wallet history' will pick it up once mined.")
        }
    }
    Ok(())
}
