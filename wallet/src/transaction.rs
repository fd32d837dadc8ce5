//! Transfer Building and Signing
//!
//! Value transfers are legacy transactions with EIP-155 replay protection,
//! signed over the Keccak-256 hash of their RLP signing payload. Signing
//! happens locally; only the signed bytes are handed to the node.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{self, Bytes, PrimitiveSignature, TxKind, U256},
};
use gw_crypto_secp256k1::{Address, RecoverableSignature};

use crate::{rpc::TxHash, units::Wei};

/// Gas consumed by a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// An unsigned value transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTransaction {
    pub nonce: u64,
    pub gas_price: Wei,
    pub gas_limit: u64,
    pub to: Address,
    pub value: Wei,
}

/// A signed transfer ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub raw: Vec<u8>,
    pub hash: TxHash,
}

impl TransferTransaction {
    /// A transfer using the fixed transfer gas limit.
    pub fn new(nonce: u64, gas_price: Wei, to: Address, value: Wei) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            to,
            value,
        }
    }

    /// Maximum fee this transfer can cost.
    pub fn max_fee(&self) -> Option<Wei> {
        self.gas_price.checked_mul(self.gas_limit as u128)
    }

    fn to_legacy(&self, chain_id: u64) -> TxLegacy {
        TxLegacy {
            chain_id: Some(chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price.0,
            gas_limit: self.gas_limit,
            to: TxKind::Call(primitives::Address::from(*self.to.as_bytes())),
            value: U256::from(self.value.0),
            input: Bytes::new(),
        }
    }

    /// RLP payload whose hash is signed.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        self.to_legacy(chain_id).encoded_for_signing()
    }

    /// Keccak-256 of the signing payload.
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        self.to_legacy(chain_id).signature_hash().0
    }

    /// Attach a signature produced over [`Self::signing_hash`].
    pub fn into_signed(self, chain_id: u64, signature: &RecoverableSignature) -> SignedTransfer {
        let signature = PrimitiveSignature::new(
            U256::from_be_bytes(signature.r),
            U256::from_be_bytes(signature.s),
            signature.recovery_id & 1 == 1,
        );

        let signed = self.to_legacy(chain_id).into_signed(signature);
        let hash = TxHash(signed.hash().0);
        let raw = TxEnvelope::from(signed).encoded_2718();
        SignedTransfer { raw, hash }
    }
}
