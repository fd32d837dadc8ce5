//! CLI Commands
//!
//! Implementation of all wallet CLI commands.

pub mod account;
pub mod balance;
pub mod fund;
pub mod history;
pub mod send;
pub mod status;

use anyhow::{anyhow, Result};
use geth_wallet::{Address, Wallet, WalletConfig};
use std::io::{self, Write};
use zeroize::Zeroizing;

/// Prompt for password input (hidden)
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let password = rpassword::read_password()?;
    Ok(Zeroizing::new(password))
}

/// Prompt for a new password twice
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = prompt_password("Enter new password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    if *password != *confirm {
        return Err(anyhow!("Passwords do not match"));
    }
    Ok(password)
}

/// Prompt for confirmation
pub fn prompt_confirm(message: &str) -> Result<bool> {
    print!("{} [y/N]: ", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y") || input.trim().eq_ignore_ascii_case("yes"))
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("\x1b[32m{}\x1b[0m", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("\x1b[33mWarning:\x1b[0m {}", message);
}

/// Open the wallet described by `config`
pub fn open_wallet(config: &WalletConfig) -> Result<Wallet> {
    Wallet::open(config.clone()).map_err(|e| anyhow!("Failed to open wallet: {}", e))
}

/// Parse an address argument
pub fn parse_address(s: &str) -> Result<Address> {
    s.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid address {}: {}", s, e))
}
