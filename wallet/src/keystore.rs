//! Encrypted Keystore
//!
//! Account secrets are stored encrypted using:
//! - Argon2id for password-based key derivation
//! - ChaCha20-Poly1305 for authenticated encryption
//!
//! Neither the password nor the raw key is ever written to storage. A key is
//! only usable through [`UnlockedSigner`], which signs once and is zeroed on
//! drop.

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use chrono::{DateTime, Utc};
use gw_crypto_secp256k1::{Address, RecoverableSignature, Secp256k1Keypair};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::{
    error::{Result, WalletError},
    storage::{load_list, save_list, Storage, ACCOUNTS_KEY},
};

/// Current keystore record format version
const KEYSTORE_VERSION: u32 = 1;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Argon2id cost parameters, stored alongside each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal cost, for tests only.
    pub fn light() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Password-sealed account secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSecret {
    version: u32,
    /// Argon2 salt (hex)
    salt: String,
    /// ChaCha20-Poly1305 nonce (hex)
    nonce: String,
    /// Encrypted 32-byte key (hex)
    ciphertext: String,
    kdf: KdfParams,
}

impl EncryptedSecret {
    /// Seal a raw secret under `password`.
    pub fn seal(secret: &[u8; 32], password: &str, kdf: KdfParams) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce_bytes);

        let key = derive_key(password, &salt, &kdf)?;
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| WalletError::Crypto("Failed to create cipher".to_string()))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), secret.as_slice())
            .map_err(|_| WalletError::Crypto("Encryption failed".to_string()))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
            kdf,
        })
    }

    /// Recover the raw secret. Any authentication failure is reported as
    /// [`WalletError::WrongPassword`].
    pub fn open(&self, password: &str) -> Result<Zeroizing<[u8; 32]>> {
        if self.version != KEYSTORE_VERSION {
            return Err(WalletError::Crypto(format!(
                "Unsupported keystore version: {} (expected {})",
                self.version, KEYSTORE_VERSION
            )));
        }

        let salt = hex::decode(&self.salt)
            .map_err(|_| WalletError::Crypto("Invalid salt format".to_string()))?;
        let nonce_bytes = hex::decode(&self.nonce)
            .map_err(|_| WalletError::Crypto("Invalid nonce format".to_string()))?;
        let ciphertext = hex::decode(&self.ciphertext)
            .map_err(|_| WalletError::Crypto("Invalid ciphertext format".to_string()))?;

        if nonce_bytes.len() != NONCE_LEN {
            return Err(WalletError::Crypto("Invalid nonce length".to_string()));
        }

        let key = derive_key(password, &salt, &self.kdf)?;
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| WalletError::Crypto("Failed to create cipher".to_string()))?;

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
                .map_err(|_| WalletError::WrongPassword)?,
        );

        if plaintext.len() != 32 {
            return Err(WalletError::Crypto("Invalid secret length".to_string()));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&plaintext);
        Ok(secret)
    }
}

/// Derive a 32-byte encryption key from password using Argon2id
fn derive_key(password: &str, salt: &[u8], kdf: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    let params = argon2::Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, Some(32))
        .map_err(|e| WalletError::Crypto(format!("Invalid Argon2 parameters: {}", e)))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, key.as_mut_slice())
        .map_err(|e| WalletError::Crypto(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

/// How an account entered the keystore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountOrigin {
    Created,
    Imported,
    TestFunded,
}

/// A stored account. Holds no plaintext secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: Address,
    pub encrypted_secret: EncryptedSecret,
    pub created_at: DateTime<Utc>,
    pub origin: AccountOrigin,
}

/// Decrypted signing capability for one account.
///
/// Consumed by [`UnlockedSigner::sign_once`]; the key is zeroed when it drops.
pub struct UnlockedSigner {
    keypair: Secp256k1Keypair,
}

impl UnlockedSigner {
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Sign a 32-byte digest and discard the key.
    pub fn sign_once(self, hash: &[u8; 32]) -> Result<RecoverableSignature> {
        Ok(self.keypair.sign_hash(hash)?)
    }
}

impl fmt::Debug for UnlockedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Owns the persisted account list.
pub struct KeystoreManager {
    store: Arc<dyn Storage>,
    kdf: KdfParams,
    /// Serializes read-modify-write cycles on the account list
    write_lock: Mutex<()>,
}

impl KeystoreManager {
    pub fn new(store: Arc<dyn Storage>, kdf: KdfParams) -> Self {
        Self {
            store,
            kdf,
            write_lock: Mutex::new(()),
        }
    }

    /// Generate a new account sealed under `password`.
    pub fn create(&self, password: &str) -> Result<Account> {
        self.create_with_origin(password, AccountOrigin::Created)
    }

    /// Generate a new account and tag it with `origin`.
    pub fn create_with_origin(&self, password: &str, origin: AccountOrigin) -> Result<Account> {
        check_password(password)?;
        let keypair = Secp256k1Keypair::generate();
        let account = self.insert(&keypair, password, origin)?;
        info!("Created account {}", account.address);
        Ok(account)
    }

    /// Import a raw hex private key.
    pub fn import_private_key(&self, raw_key: &str, password: &str) -> Result<Account> {
        check_password(password)?;
        let keypair = Secp256k1Keypair::from_hex(raw_key)
            .map_err(|_| WalletError::InvalidInput("Invalid private key".to_string()))?;
        let account = self.insert(&keypair, password, AccountOrigin::Imported)?;
        info!("Imported account {}", account.address);
        Ok(account)
    }

    /// Decrypt an account into a one-shot signer.
    pub fn unlock(&self, address: Address, password: &str) -> Result<UnlockedSigner> {
        let account = self.get(address)?;
        let keypair = open_keypair(&account, password)?;
        debug!("Unlocked account {}", address);
        Ok(UnlockedSigner { keypair })
    }

    /// Return the raw key as `0x`-prefixed hex. The caller must not persist it.
    pub fn export_private_key(&self, address: Address, password: &str) -> Result<Zeroizing<String>> {
        let account = self.get(address)?;
        let keypair = open_keypair(&account, password)?;
        info!("Exported private key of {}", address);
        Ok(keypair.secret_hex())
    }

    /// Re-seal one account under a new password.
    pub fn change_password(&self, address: Address, old_password: &str, new_password: &str) -> Result<()> {
        check_password(new_password)?;
        let _guard = self.lock()?;

        let mut accounts = self.accounts()?;
        let account = accounts
            .iter_mut()
            .find(|a| a.address == address)
            .ok_or(WalletError::AccountNotFound(address))?;

        let keypair = open_keypair(account, old_password)?;
        account.encrypted_secret =
            EncryptedSecret::seal(&keypair.secret_bytes(), new_password, self.kdf)?;

        save_list(self.store.as_ref(), ACCOUNTS_KEY, &accounts)?;
        info!("Changed password of {}", address);
        Ok(())
    }

    /// Remove an account. Returns whether it existed.
    pub fn delete(&self, address: Address) -> Result<bool> {
        let _guard = self.lock()?;

        let mut accounts = self.accounts()?;
        let before = accounts.len();
        accounts.retain(|a| a.address != address);
        if accounts.len() == before {
            return Ok(false);
        }

        save_list(self.store.as_ref(), ACCOUNTS_KEY, &accounts)?;
        info!("Deleted account {}", address);
        Ok(true)
    }

    /// Addresses in insertion order.
    pub fn list(&self) -> Result<Vec<Address>> {
        Ok(self.accounts()?.into_iter().map(|a| a.address).collect())
    }

    /// Full account records in insertion order.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        load_list(self.store.as_ref(), ACCOUNTS_KEY)
    }

    pub fn get(&self, address: Address) -> Result<Account> {
        self.accounts()?
            .into_iter()
            .find(|a| a.address == address)
            .ok_or(WalletError::AccountNotFound(address))
    }

    pub fn contains(&self, address: Address) -> Result<bool> {
        Ok(self.accounts()?.iter().any(|a| a.address == address))
    }

    fn insert(&self, keypair: &Secp256k1Keypair, password: &str, origin: AccountOrigin) -> Result<Account> {
        let address = keypair.address();
        let _guard = self.lock()?;

        let mut accounts = self.accounts()?;
        if accounts.iter().any(|a| a.address == address) {
            return Err(WalletError::DuplicateAccount(address));
        }

        let account = Account {
            address,
            encrypted_secret: EncryptedSecret::seal(&keypair.secret_bytes(), password, self.kdf)?,
            created_at: Utc::now(),
            origin,
        };
        accounts.push(account.clone());
        save_list(self.store.as_ref(), ACCOUNTS_KEY, &accounts)?;
        Ok(account)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| WalletError::Storage("keystore lock poisoned".to_string()))
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn open_keypair(account: &Account, password: &str) -> Result<Secp256k1Keypair> {
    let secret = account.encrypted_secret.open(password)?;
    let keypair = Secp256k1Keypair::from_bytes(&secret)?;
    if keypair.address() != account.address {
        return Err(WalletError::Crypto(format!(
            "Keystore record for {} does not match its key",
            account.address
        )));
    }
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use gw_crypto_secp256k1::{keccak256, recover_address};

    const TEST_PASSWORD: &str = "test-password-123";
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn keystore() -> (Arc<MemoryStore>, KeystoreManager) {
        let store = Arc::new(MemoryStore::new());
        let keystore = KeystoreManager::new(store.clone(), KdfParams::light());
        (store, keystore)
    }

    #[test]
    fn test_seal_open() {
        let secret = [7u8; 32];
        let sealed = EncryptedSecret::seal(&secret, TEST_PASSWORD, KdfParams::light()).unwrap();
        assert_eq!(*sealed.open(TEST_PASSWORD).unwrap(), secret);
        assert!(matches!(
            sealed.open("wrong-password"),
            Err(WalletError::WrongPassword)
        ));
    }

    #[test]
    fn test_create_unlock_sign() {
        let (_, keystore) = keystore();
        let account = keystore.create(TEST_PASSWORD).unwrap();
        assert_eq!(account.origin, AccountOrigin::Created);

        let signer = keystore.unlock(account.address, TEST_PASSWORD).unwrap();
        assert_eq!(signer.address(), account.address);

        let digest = keccak256(b"transfer");
        let signature = signer.sign_once(&digest).unwrap();
        assert_eq!(recover_address(&digest, &signature).unwrap(), account.address);
    }

    #[test]
    fn test_wrong_password() {
        let (_, keystore) = keystore();
        let account = keystore.create(TEST_PASSWORD).unwrap();
        assert!(matches!(
            keystore.unlock(account.address, "not-the-password"),
            Err(WalletError::WrongPassword)
        ));
        assert!(matches!(
            keystore.export_private_key(account.address, "not-the-password"),
            Err(WalletError::WrongPassword)
        ));
    }

    #[test]
    fn test_weak_password() {
        let (store, keystore) = keystore();
        assert!(matches!(
            keystore.create("12345"),
            Err(WalletError::WeakPassword { min: 6 })
        ));
        assert_eq!(store.get(ACCOUNTS_KEY).unwrap(), None);
        assert!(keystore.create("123456").is_ok());
    }

    #[test]
    fn test_unknown_account() {
        let (_, keystore) = keystore();
        let address: Address = DEV_ADDRESS.parse().unwrap();
        assert!(matches!(
            keystore.unlock(address, TEST_PASSWORD),
            Err(WalletError::AccountNotFound(a)) if a == address
        ));
    }

    #[test]
    fn test_import_and_export() {
        let (_, keystore) = keystore();
        let account = keystore.import_private_key(DEV_KEY, TEST_PASSWORD).unwrap();
        assert_eq!(account.address.to_string(), DEV_ADDRESS);
        assert_eq!(account.origin, AccountOrigin::Imported);

        let exported = keystore
            .export_private_key(account.address, TEST_PASSWORD)
            .unwrap();
        assert_eq!(exported.as_str(), DEV_KEY);
    }

    #[test]
    fn test_import_duplicate() {
        let (_, keystore) = keystore();
        keystore.import_private_key(DEV_KEY, TEST_PASSWORD).unwrap();
        assert!(matches!(
            keystore.import_private_key(DEV_KEY, "another-password"),
            Err(WalletError::DuplicateAccount(_))
        ));
        assert_eq!(keystore.list().unwrap().len(), 1);
    }

    #[test]
    fn test_import_invalid_key() {
        let (_, keystore) = keystore();
        assert!(matches!(
            keystore.import_private_key("0x1234", TEST_PASSWORD),
            Err(WalletError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_secrets_never_persisted() {
        let (store, keystore) = keystore();
        let account = keystore.import_private_key(DEV_KEY, TEST_PASSWORD).unwrap();
        keystore
            .change_password(account.address, TEST_PASSWORD, "rotated-password")
            .unwrap();

        let persisted = store.get(ACCOUNTS_KEY).unwrap().unwrap();
        assert!(!persisted.contains(DEV_KEY.trim_start_matches("0x")));
        assert!(!persisted.contains(TEST_PASSWORD));
        assert!(!persisted.contains("rotated-password"));
    }

    #[test]
    fn test_list_order_and_delete() {
        let (_, keystore) = keystore();
        let first = keystore.create(TEST_PASSWORD).unwrap().address;
        let second = keystore.create(TEST_PASSWORD).unwrap().address;
        let third = keystore.import_private_key(DEV_KEY, TEST_PASSWORD).unwrap().address;
        assert_eq!(keystore.list().unwrap(), vec![first, second, third]);

        assert!(keystore.delete(second).unwrap());
        assert!(!keystore.delete(second).unwrap());
        assert_eq!(keystore.list().unwrap(), vec![first, third]);
    }

    #[test]
    fn test_change_password() {
        let (_, keystore) = keystore();
        let address = keystore.create(TEST_PASSWORD).unwrap().address;

        assert!(matches!(
            keystore.change_password(address, "bad-old-password", "new-password-456"),
            Err(WalletError::WrongPassword)
        ));

        keystore
            .change_password(address, TEST_PASSWORD, "new-password-456")
            .unwrap();
        assert!(keystore.unlock(address, TEST_PASSWORD).is_err());
        assert!(keystore.unlock(address, "new-password-456").is_ok());
    }

    #[test]
    fn test_signer_debug_hides_key() {
        let (_, keystore) = keystore();
        let account = keystore.import_private_key(DEV_KEY, TEST_PASSWORD).unwrap();
        let signer = keystore.unlock(account.address, TEST_PASSWORD).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains(DEV_ADDRESS));
        assert!(!debug.contains(&DEV_KEY[2..]));
    }
}
