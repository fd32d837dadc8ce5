//! Account management commands

use anyhow::Result;
use geth_wallet::{AccountOrigin, WalletConfig};

use super::{
    open_wallet, parse_address, print_error, print_success, print_warning, prompt_confirm,
    prompt_new_password, prompt_password,
};

/// Create a new account
pub async fn create(config: &WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    let password = prompt_new_password()?;

    let account = wallet.create_account(&password)?;

    println!();
    print_success("Account created!");
    println!("Address: {}", account.address);
    Ok(())
}

/// Import a raw private key
pub async fn import(config: &WalletConfig, key: Option<String>) -> Result<()> {
    let wallet = open_wallet(config)?;

    let key = match key {
        Some(key) => {
            print_warning("Passing a private key on the command line may leave it in shell history");
            zeroize::Zeroizing::new(key)
        }
        None => prompt_password("Enter private key (hex): ")?,
    };
    let password = prompt_new_password()?;

    let account = wallet.import_account(&key, &password)?;

    println!();
    print_success("Account imported!");
    println!("Address: {}", account.address);
    Ok(())
}

/// Print an account's private key
pub async fn export(config: &WalletConfig, address: &str) -> Result<()> {
    let wallet = open_wallet(config)?;
    let address = parse_address(address)?;

    println!();
    print_warning("Anyone with this key controls the account. Do not share or store it in plain text.");
    if !prompt_confirm("Show the private key?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let password = prompt_password("Enter account password: ")?;
    match wallet.keystore().export_private_key(address, &password) {
        Ok(key) => {
            println!();
            println!("{}", key.as_str());
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            Err(e.into())
        }
    }
}

/// List stored accounts
pub async fn list(config: &WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    let accounts = wallet.keystore().accounts()?;

    if accounts.is_empty() {
        println!("No accounts. Run 'geth-wallet create' or 'geth-wallet import' first.");
        return Ok(());
    }

    println!();
    println!("{:<44} {:<12} {}", "ADDRESS", "ORIGIN", "CREATED");
    println!("{}", "-".repeat(80));
    for account in accounts {
        let origin = match account.origin {
            AccountOrigin::Created => "created",
            AccountOrigin::Imported => "imported",
            AccountOrigin::TestFunded => "test-funded",
        };
        println!(
            "{:<44} {:<12} {}",
            account.address,
            origin,
            account.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Remove an account from the keystore
pub async fn delete(config: &WalletConfig, address: &str, yes: bool) -> Result<()> {
    let wallet = open_wallet(config)?;
    let address = parse_address(address)?;

    if !yes {
        print_warning("The key cannot be recovered unless you exported it.");
        if !prompt_confirm(&format!("Delete account {}?", address))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if wallet.delete_account(address)? {
        print_success(&format!("Deleted {}", address));
    } else {
        print_error(&format!("No account {}", address));
    }
    Ok(())
}

/// Re-encrypt an account under a new password
pub async fn change_password(config: &WalletConfig, address: &str) -> Result<()> {
    let wallet = open_wallet(config)?;
    let address = parse_address(address)?;

    let old_password = prompt_password("Enter current password: ")?;
    let new_password = prompt_new_password()?;

    wallet
        .keystore()
        .change_password(address, &old_password, &new_password)?;
    print_success("Password changed.");
    Ok(())
}
