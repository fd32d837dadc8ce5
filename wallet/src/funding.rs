//! Test-network funding.
//!
//! Development nodes expose pre-funded, node-managed accounts. These helpers
//! move ether from the first of them to a wallet account using
//! `eth_sendTransaction`, so no local key is involved on the sending side.

use gw_crypto_secp256k1::Address;
use tracing::info;

use crate::{
    error::{Result, WalletError},
    keystore::{Account, AccountOrigin, KeystoreManager},
    rpc::{NodeRpc, TxHash},
    transaction::TRANSFER_GAS_LIMIT,
    units::Wei,
};

/// A completed funding transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingReceipt {
    pub funder: Address,
    pub recipient: Address,
    pub amount: Wei,
    pub hash: TxHash,
}

/// First node-managed account, checked to hold at least `amount`.
async fn funder_for(rpc: &dyn NodeRpc, amount: Wei) -> Result<Address> {
    let funder = rpc
        .accounts()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| WalletError::Node("Node has no managed accounts".to_string()))?;

    let balance = rpc.get_balance(funder).await?;
    if balance < amount {
        return Err(WalletError::InsufficientFunds {
            balance: balance.to_ether_string(),
            required: amount.to_ether_string(),
        });
    }
    Ok(funder)
}

fn check_amount(amount: Wei) -> Result<()> {
    if amount.is_zero() {
        return Err(WalletError::InvalidInput(
            "Funding amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Send `amount` from the node's first account to `recipient`.
pub async fn fund_address(rpc: &dyn NodeRpc, recipient: Address, amount: Wei) -> Result<FundingReceipt> {
    check_amount(amount)?;
    let funder = funder_for(rpc, amount).await?;

    let hash = rpc
        .send_transaction(funder, recipient, amount, TRANSFER_GAS_LIMIT)
        .await?;
    info!("Funded {} with {} from {} ({})", recipient, amount, funder, hash);

    Ok(FundingReceipt {
        funder,
        recipient,
        amount,
        hash,
    })
}

/// Create a new account under `password` and fund it.
///
/// The funder is checked before the account is created, so a node without a
/// usable funder leaves the keystore untouched.
pub async fn fund_test_account(
    keystore: &KeystoreManager,
    rpc: &dyn NodeRpc,
    password: &str,
    amount: Wei,
) -> Result<(Account, FundingReceipt)> {
    check_amount(amount)?;
    let funder = funder_for(rpc, amount).await?;

    let account = keystore.create_with_origin(password, AccountOrigin::TestFunded)?;
    let hash = rpc
        .send_transaction(funder, account.address, amount, TRANSFER_GAS_LIMIT)
        .await?;
    info!("Created test account {} funded with {} ({})", account.address, amount, hash);

    let receipt = FundingReceipt {
        funder,
        recipient: account.address,
        amount,
        hash,
    };
    Ok((account, receipt))
}
