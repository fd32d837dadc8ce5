//! Geth Wallet CLI
//!
//! Manage local accounts and send transfers through a JSON-RPC node.

use anyhow::Result;
use clap::{Parser, Subcommand};
use geth_wallet::WalletConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "geth-wallet")]
#[command(about = "Local keystore wallet for a JSON-RPC ledger node")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Node JSON-RPC endpoint, overrides the configuration file
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Wallet data directory, overrides the configuration file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Create,

    /// Import an account from a raw private key
    Import {
        /// Hex private key; prompted for when omitted
        key: Option<String>,
    },

    /// Print an account's private key
    Export {
        /// Account address
        address: String,
    },

    /// List stored accounts
    List,

    /// Delete an account from the keystore
    Delete {
        /// Account address
        address: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Change an account's password
    ChangePassword {
        /// Account address
        address: String,
    },

    /// Show balances
    Balance {
        /// Address to query; all stored accounts when omitted
        address: Option<String>,
    },

    /// Estimate the fee of a transfer
    Estimate {
        /// Sender address
        from: String,

        /// Recipient address
        to: String,

        /// Amount in ETH
        amount: String,
    },

    /// Send ETH to an address
    Send {
        /// Sender address (a stored account)
        from: String,

        /// Recipient address
        to: String,

        /// Amount in ETH
        amount: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Return once submitted instead of waiting for the receipt
        #[arg(long)]
        no_wait: bool,
    },

    /// Show transaction history
    History {
        /// Show deleted transactions instead
        #[arg(long)]
        deleted: bool,

        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Remove a transaction from the history
    Forget {
        /// Transaction hash
        hash: String,
    },

    /// Remove every transaction from the history
    ClearHistory {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Fund an account from the node's managed accounts (development networks)
    Fund {
        /// Address to fund; a new account is created when omitted
        address: Option<String>,

        /// Amount in ETH (defaults to test_funding_amount)
        #[arg(long)]
        amount: Option<String>,
    },

    /// Check the node connection
    Status,

    /// Keep the history refreshed until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = WalletConfig::load_or_default(cli.config.as_deref())?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    config.validate()?;

    match cli.command {
        Commands::Create => commands::account::create(&config).await,
        Commands::Import { key } => commands::account::import(&config, key).await,
        Commands::Export { address } => commands::account::export(&config, &address).await,
        Commands::List => commands::account::list(&config).await,
        Commands::Delete { address, yes } => commands::account::delete(&config, &address, yes).await,
        Commands::ChangePassword { address } => {
            commands::account::change_password(&config, &address).await
        }
        Commands::Balance { address } => commands::balance::run(&config, address).await,
        Commands::Estimate { from, to, amount } => {
            commands::send::estimate(&config, &from, &to, &amount).await
        }
        Commands::Send {
            from,
            to,
            amount,
            yes,
            no_wait,
        } => commands::send::run(&config, &from, &to, &amount, yes, no_wait).await,
        Commands::History { deleted, limit } => commands::history::run(&config, deleted, limit).await,
        Commands::Forget { hash } => commands::history::forget(&config, &hash).await,
        Commands::ClearHistory { yes } => commands::history::clear(&config, yes).await,
        Commands::Fund { address, amount } => commands::fund::run(&config, address, amount).await,
        Commands::Status => commands::status::run(&config).await,
        Commands::Watch => commands::history::watch(&config).await,
    }
}
