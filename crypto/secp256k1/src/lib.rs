#![deny(unsafe_code)]

//! Secp256k1 keys for an Ethereum-style account ledger.
//!
//! This crate is the only place the wallet touches curve arithmetic. It
//! provides key generation, Keccak-256 address derivation with EIP-55
//! checksums, and recoverable ECDSA signatures over 32-byte prehashes.
//!
//! # Examples
//!
//! ```
//! use gw_crypto_secp256k1::{keccak256, recover_address, Secp256k1Keypair};
//!
//! let keypair = Secp256k1Keypair::generate();
//! let address = keypair.address();
//! assert!(address.to_string().starts_with("0x"));
//!
//! let digest = keccak256(b"transfer");
//! let signature = keypair.sign_hash(&digest).unwrap();
//! assert_eq!(recover_address(&digest, &signature).unwrap(), address);
//! ```

use core::{fmt, str::FromStr};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors that can occur during key operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address checksum mismatch: {0}")]
    BadChecksum(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signing failed: {0}")]
    SigningError(String),
}

/// Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// A 20-byte account address.
///
/// Displays as a `0x`-prefixed EIP-55 checksummed string. Parsing accepts
/// all-lowercase and all-uppercase hex, and mixed case only when the checksum
/// matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the address of an uncompressed public key (0x04 || x || y).
    ///
    /// The address is the last 20 bytes of keccak256(x || y).
    pub fn from_public_key(uncompressed: &[u8; 65]) -> Self {
        let hash = keccak256(&uncompressed[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..32]);
        Self(bytes)
    }

    /// EIP-55 checksum encoding.
    pub fn to_checksum_string(&self) -> String {
        let hex_addr = hex::encode(self.0);
        let hash = keccak256(hex_addr.as_bytes());

        let mut result = String::with_capacity(42);
        result.push_str("0x");

        for (i, c) in hex_addr.chars().enumerate() {
            if c.is_ascii_digit() {
                result.push(c);
            } else {
                let hash_byte = hash[i / 2];
                let hash_nibble = if i % 2 == 0 {
                    hash_byte >> 4
                } else {
                    hash_byte & 0x0f
                };

                if hash_nibble >= 8 {
                    result.push(c.to_ascii_uppercase());
                } else {
                    result.push(c);
                }
            }
        }

        result
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum_string())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let address = Self(bytes);

        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum_string()[2..] != *hex_part {
            return Err(Error::BadChecksum(s.to_string()));
        }

        Ok(address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// An ECDSA signature with its public-key recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0 or 1
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// 65-byte form: r (32) || s (32) || v (1), where v is the recovery id + 27.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.recovery_id + 27;
        out
    }

    /// Parse the 65-byte form. Accepts v as 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8; 65]) -> Result<Self, Error> {
        let v = bytes[64];
        let recovery_id = if v >= 27 { v - 27 } else { v };
        if recovery_id > 1 {
            return Err(Error::InvalidSignature);
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery_id })
    }
}

/// A secp256k1 keypair.
///
/// The secret scalar is wiped when the keypair is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Secp256k1Keypair {
    #[zeroize(skip)] // SigningKey implements its own zeroization
    signing_key: SigningKey,
}

impl fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1Keypair {{ address: {} }}", self.address())
    }
}

impl Secp256k1Keypair {
    /// Generate a fresh keypair from the operating system RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a keypair from raw 32-byte private key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| Error::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create a keypair from a hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self, Error> {
        let trimmed = key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if hex_part.len() != 64 {
            return Err(Error::InvalidPrivateKey);
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(hex_part, &mut bytes[..]).map_err(|_| Error::InvalidPrivateKey)?;
        Self::from_bytes(&bytes)
    }

    /// The raw private key. Wiped when the returned value is dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut field_bytes = self.signing_key.to_bytes();
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&field_bytes);
        field_bytes.as_mut_slice().zeroize();
        out
    }

    /// The raw private key as `0x`-prefixed hex.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.secret_bytes().as_slice())))
    }

    /// Get the public key as uncompressed bytes (65 bytes: 0x04 || x || y).
    pub fn public_key_uncompressed(&self) -> [u8; 65] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut result = [0u8; 65];
        result.copy_from_slice(point.as_bytes());
        result
    }

    /// The account address of this keypair.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key_uncompressed())
    }

    /// Sign a 32-byte prehash (no further hashing is applied).
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<RecoverableSignature, Error> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| Error::SigningError(e.to_string()))?;

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

/// Recover the signer's address from a prehash and signature.
pub fn recover_address(hash: &[u8; 32], signature: &RecoverableSignature) -> Result<Address, Error> {
    let recovery_id =
        RecoveryId::try_from(signature.recovery_id).map_err(|_| Error::InvalidSignature)?;

    let mut r_s = [0u8; 64];
    r_s[..32].copy_from_slice(&signature.r);
    r_s[32..].copy_from_slice(&signature.s);
    let sig = K256Signature::from_slice(&r_s).map_err(|_| Error::InvalidSignature)?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|_| Error::InvalidSignature)?;

    let point = verifying_key.to_encoded_point(false);
    let mut pubkey = [0u8; 65];
    pubkey.copy_from_slice(point.as_bytes());
    Ok(Address::from_public_key(&pubkey))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (DO NOT USE WITH REAL FUNDS)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_known_key_address() {
        let keypair = Secp256k1Keypair::from_hex(DEV_KEY).unwrap();
        assert_eq!(keypair.address().to_string(), DEV_ADDRESS);
    }

    #[test]
    fn test_secret_roundtrip() {
        let keypair = Secp256k1Keypair::from_hex(DEV_KEY).unwrap();
        assert_eq!(keypair.secret_hex().as_str(), DEV_KEY);

        let restored = Secp256k1Keypair::from_bytes(&keypair.secret_bytes()).unwrap();
        assert_eq!(restored.address(), keypair.address());
    }

    #[test]
    fn test_invalid_private_keys() {
        assert_eq!(
            Secp256k1Keypair::from_bytes(&[0u8; 32]).unwrap_err(),
            Error::InvalidPrivateKey
        );
        assert!(Secp256k1Keypair::from_hex("0x1234").is_err());
        assert!(Secp256k1Keypair::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let lower: Address = expected.to_lowercase().parse().unwrap();
            assert_eq!(lower.to_string(), expected);

            let parsed: Address = expected.parse().unwrap();
            assert_eq!(parsed, lower);
        }
    }

    #[test]
    fn test_address_parse_rejects() {
        // Flipped case on one letter breaks the checksum
        assert!(matches!(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD".parse::<Address>(),
            Err(Error::BadChecksum(_))
        ));
        assert!("0x1234".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
        assert!("0xg39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Address>().is_err());

        // Missing prefix and all-uppercase are fine
        assert!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Address>().is_ok());
        assert!("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266".parse::<Address>().is_ok());
    }

    #[test]
    fn test_sign_and_recover() {
        let keypair = Secp256k1Keypair::generate();
        let digest = keccak256(b"value transfer");

        let signature = keypair.sign_hash(&digest).unwrap();
        assert!(signature.recovery_id <= 1);
        assert_eq!(recover_address(&digest, &signature).unwrap(), keypair.address());

        // A different message recovers someone else
        let other = keccak256(b"another transfer");
        assert_ne!(recover_address(&other, &signature).ok(), Some(keypair.address()));
    }

    #[test]
    fn test_signature_bytes() {
        let keypair = Secp256k1Keypair::from_hex(DEV_KEY).unwrap();
        let signature = keypair.sign_hash(&keccak256(b"abc")).unwrap();

        let bytes = signature.to_bytes();
        assert!(bytes[64] == 27 || bytes[64] == 28);
        assert_eq!(RecoverableSignature::from_bytes(&bytes).unwrap(), signature);

        let mut bad = bytes;
        bad[64] = 30;
        assert!(RecoverableSignature::from_bytes(&bad).is_err());
    }

    #[test]
    fn test_address_serde() {
        let address: Address = DEV_ADDRESS.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", DEV_ADDRESS));

        let back: Address = serde_json::from_str(&json.to_lowercase()).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Secp256k1Keypair::from_hex(DEV_KEY).unwrap();
        let debug = format!("{:?}", keypair);
        assert!(debug.contains(DEV_ADDRESS));
        assert!(!debug.contains(&DEV_KEY[2..]));
    }
}
