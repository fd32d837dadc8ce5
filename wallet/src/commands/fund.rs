//! Test funding command

use anyhow::Result;
use geth_wallet::{Wei, WalletConfig};

use super::{open_wallet, parse_address, print_success, print_warning, prompt_new_password};

/// Fund `address`, or create and fund a new account when none is given
pub async fn run(config: &WalletConfig, address: Option<String>, amount: Option<String>) -> Result<()> {
    let wallet = open_wallet(config)?;
    print_warning("Funding uses the node's managed accounts and only works on development networks.");

    let amount = Wei::from_ether_str(amount.as_deref().unwrap_or(&config.test_funding_amount))?;

    match address {
        Some(address) => {
            let address = parse_address(&address)?;
            let receipt = wallet.fund_address(address, amount).await?;

            print_success(&format!("Sent {} to {}", receipt.amount, receipt.recipient));
            println!("From:        {}", receipt.funder);
            println!("Transaction: {}", receipt.hash);
        }
        None => {
            let password = prompt_new_password()?;
            let (account, receipt) = wallet.fund_test_account(&password, Some(amount)).await?;

            println!();
            print_success("Test account created and funded!");
            println!("Address:     {}", account.address);
            println!("Amount:      {}", receipt.amount);
            println!("Transaction: {}", receipt.hash);
        }
    }
    Ok(())
}
