//! Balance check command

use anyhow::Result;
use geth_wallet::WalletConfig;

use super::{open_wallet, print_success};

/// Run the balance command. Without an address, every stored account is shown.
pub async fn run(config: &WalletConfig, address: Option<String>) -> Result<()> {
    let wallet = open_wallet(config)?;

    let addresses = match address {
        Some(address) => vec![address],
        None => wallet
            .keystore()
            .list()?
            .into_iter()
            .map(|a| a.to_string())
            .collect(),
    };

    if addresses.is_empty() {
        println!("No accounts. Run 'geth-wallet create' first.");
        return Ok(());
    }

    println!();
    for address in addresses {
        let balance = wallet.balance(&address).await?;
        print_success(&format!("{}: {}", address, balance));
    }
    Ok(())
}
