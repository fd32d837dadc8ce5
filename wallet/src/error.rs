//! Wallet error taxonomy.

use gw_crypto_secp256k1::Address;

use crate::rpc::TxHash;

/// Errors reported by the keystore, estimator, pipeline and ledger.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Malformed address, non-positive amount or similar; raised before any
    /// network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Wrong password")]
    WrongPassword,

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Account already exists: {0}")]
    DuplicateAccount(Address),

    #[error("Insufficient funds (balance {balance} ETH, need {required} ETH)")]
    InsufficientFunds { balance: String, required: String },

    /// Connectivity failure or node-side rejection.
    #[error("Node error: {0}")]
    Node(String),

    /// On-chain execution failed. Recorded in the ledger, never returned from
    /// a send.
    #[error("Transaction {0} failed on chain")]
    TransactionFailed(TxHash),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl WalletError {
    /// True for errors raised before anything was submitted.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Node(_) | Self::TransactionFailed(_) | Self::Cancelled
        )
    }
}

impl From<gw_crypto_secp256k1::Error> for WalletError {
    fn from(e: gw_crypto_secp256k1::Error) -> Self {
        match e {
            gw_crypto_secp256k1::Error::InvalidAddress(_)
            | gw_crypto_secp256k1::Error::BadChecksum(_) => Self::InvalidInput(e.to_string()),
            other => Self::Crypto(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        Self::Node(e.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
