//! Node status command

use anyhow::Result;
use geth_wallet::WalletConfig;

use super::{open_wallet, print_error, print_success};

/// Run the status command
pub async fn run(config: &WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;

    println!("Node: {}", config.rpc_url);
    if !wallet.check_connection().await {
        print_error("Node is not reachable");
        return Ok(());
    }

    let chain_id = wallet.rpc().chain_id().await?;
    let height = wallet.rpc().block_number().await?;
    let gas_price = wallet.rpc().gas_price().await?;

    print_success("Connected");
    println!("  Chain id:     {}", chain_id);
    println!("  Block height: {}", height);
    println!("  Gas price:    {} Gwei", gas_price.to_gwei_string());
    println!("  Accounts:     {}", wallet.keystore().list()?.len());
    println!("  Data dir:     {}", config.data_dir.display());
    Ok(())
}
