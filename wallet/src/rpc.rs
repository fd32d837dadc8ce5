//! JSON-RPC Node Boundary
//!
//! The wallet talks to a single node over HTTP JSON-RPC 2.0. [`NodeRpc`] is
//! the seam every component depends on; [`RpcClient`] is the HTTP
//! implementation. Node errors (`{"error": {"message": ..}}`) and transport
//! failures both surface as [`WalletError::Node`].

use async_trait::async_trait;
use gw_crypto_secp256k1::Address;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    error::{Result, WalletError},
    units::Wei,
};

/// JSON-RPC request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| WalletError::InvalidInput(format!("Invalid transaction hash: {}", s)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    /// 1 on success, 0 on failure; absent on pre-Byzantium chains
    #[serde(default, deserialize_with = "quantity::opt_u64")]
    pub status: Option<u64>,
    #[serde(deserialize_with = "quantity::u64")]
    pub gas_used: u64,
    #[serde(default, deserialize_with = "quantity::opt_u64")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "quantity::opt_wei")]
    pub effective_gas_price: Option<Wei>,
}

impl TransactionReceipt {
    /// Whether execution succeeded.
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |s| s == 1)
    }
}

/// A block with full transaction objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(deserialize_with = "quantity::u64")]
    pub number: u64,
    /// Unix seconds
    #[serde(deserialize_with = "quantity::u64")]
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

/// A transaction as listed inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// None for contract creation
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(deserialize_with = "quantity::wei")]
    pub value: Wei,
    #[serde(default, deserialize_with = "quantity::opt_wei")]
    pub gas_price: Option<Wei>,
}

/// The node operations the wallet consumes.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Node-managed accounts (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Transfer from a node-managed account (`eth_sendTransaction`).
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: Wei,
        gas_limit: u64,
    ) -> Result<TxHash>;

    /// Submit a signed transaction (`eth_sendRawTransaction`).
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash>;

    /// Latest balance (`eth_getBalance`).
    async fn get_balance(&self, address: Address) -> Result<Wei>;

    /// Current gas price in wei (`eth_gasPrice`).
    async fn gas_price(&self) -> Result<Wei>;

    /// Next nonce including pending transactions (`eth_getTransactionCount`).
    async fn get_transaction_count(&self, address: Address) -> Result<u64>;

    /// Receipt, or None while pending (`eth_getTransactionReceipt`).
    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>>;

    /// Chain identifier (`eth_chainId`).
    async fn chain_id(&self) -> Result<u64>;

    /// Height of the latest block (`eth_blockNumber`).
    async fn block_number(&self) -> Result<u64>;

    /// Block with full transactions (`eth_getBlockByNumber`).
    async fn get_block(&self, number: u64) -> Result<Option<Block>>;
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// HTTP JSON-RPC client for one node endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Node(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method`; a `null` result is returned as `None`.
    async fn call_nullable<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            method,
            params,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("{} to {} failed: {}", method, self.url, e);
                WalletError::Node(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(WalletError::Node(format!("HTTP error: {}", response.status())));
        }

        let json_response: JsonRpcResponse<T> = response.json().await?;
        debug!("{} answered in {} ms", method, start.elapsed().as_millis());

        if let Some(error) = json_response.error {
            debug!("{} rejected ({}): {}", method, error.code, error.message);
            return Err(WalletError::Node(error.message));
        }

        Ok(json_response.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.call_nullable(method, params)
            .await?
            .ok_or_else(|| WalletError::Node(format!("Missing result in {} response", method)))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u128> {
        let raw: String = self.call(method, params).await?;
        parse_quantity(&raw)
    }
}

#[async_trait]
impl NodeRpc for RpcClient {
    async fn accounts(&self) -> Result<Vec<Address>> {
        self.call("eth_accounts", json!([])).await
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: Wei,
        gas_limit: u64,
    ) -> Result<TxHash> {
        self.call(
            "eth_sendTransaction",
            json!([{
                "from": from,
                "to": to,
                "value": to_quantity(value.0),
                "gas": to_quantity(gas_limit as u128),
            }]),
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash> {
        self.call(
            "eth_sendRawTransaction",
            json!([format!("0x{}", hex::encode(raw))]),
        )
        .await
    }

    async fn get_balance(&self, address: Address) -> Result<Wei> {
        self.call_quantity("eth_getBalance", json!([address, "latest"]))
            .await
            .map(Wei)
    }

    async fn gas_price(&self) -> Result<Wei> {
        self.call_quantity("eth_gasPrice", json!([])).await.map(Wei)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        let count = self
            .call_quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        u64::try_from(count).map_err(|_| WalletError::Node("Nonce out of range".to_string()))
    }

    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>> {
        self.call_nullable("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    async fn chain_id(&self) -> Result<u64> {
        let id = self.call_quantity("eth_chainId", json!([])).await?;
        u64::try_from(id).map_err(|_| WalletError::Node("Chain id out of range".to_string()))
    }

    async fn block_number(&self) -> Result<u64> {
        let height = self.call_quantity("eth_blockNumber", json!([])).await?;
        u64::try_from(height).map_err(|_| WalletError::Node("Block number out of range".to_string()))
    }

    async fn get_block(&self, number: u64) -> Result<Option<Block>> {
        self.call_nullable(
            "eth_getBlockByNumber",
            json!([to_quantity(number as u128), true]),
        )
        .await
    }
}

/// Encode a quantity as minimal `0x` hex.
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Decode a `0x` hex quantity.
pub fn parse_quantity(s: &str) -> Result<u128> {
    let hex_part = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| WalletError::Node(format!("Invalid quantity: {}", s)))?;
    if hex_part.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(hex_part, 16).map_err(|_| WalletError::Node(format!("Invalid quantity: {}", s)))
}

/// Serde helpers for hex quantities.
mod quantity {
    use super::parse_quantity;
    use crate::units::Wei;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = parse_quantity(&s).map_err(D::Error::custom)?;
        u64::try_from(value).map_err(D::Error::custom)
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => {
                let value = parse_quantity(&s).map_err(D::Error::custom)?;
                u64::try_from(value).map(Some).map_err(D::Error::custom)
            }
            None => Ok(None),
        }
    }

    pub fn wei<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Wei, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_quantity(&s).map(Wei).map_err(D::Error::custom)
    }

    pub fn opt_wei<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Wei>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_quantity(&s).map(|v| Some(Wei(v))).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(21_000), "0x5208");
        assert_eq!(parse_quantity("0x5208").unwrap(), 21_000);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("5208").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_tx_hash_roundtrip() {
        let text = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        let hash: TxHash = text.parse().unwrap();
        assert_eq!(hash.to_string(), text);
        assert_eq!(serde_json::to_string(&hash).unwrap(), format!("\"{}\"", text));
        assert!("0x1234".parse::<TxHash>().is_err());
    }

    #[test]
    fn test_request_envelope() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_gasPrice",
            params: json!([]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_gasPrice", "params": []})
        );
    }

    #[test]
    fn test_error_response() {
        let response: JsonRpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds for gas * price + value"}}"#,
        )
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(
            response.error.unwrap().message,
            "insufficient funds for gas * price + value"
        );
    }

    #[test]
    fn test_null_receipt_response() {
        let response: JsonRpcResponse<TransactionReceipt> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_receipt_parsing() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "status": "0x0",
            "gasUsed": "0x5208",
            "blockNumber": "0x1b4",
            "logs": [],
        }))
        .unwrap();

        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.block_number, Some(436));
        assert!(!receipt.succeeded());
        assert_eq!(receipt.effective_gas_price, None);
    }

    #[test]
    fn test_block_parsing() {
        let block: Block = serde_json::from_value(json!({
            "number": "0x10",
            "timestamp": "0x6553f100",
            "transactions": [{
                "hash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
                "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
                "to": null,
                "value": "0xde0b6b3a7640000",
                "gasPrice": "0x3b9aca00",
                "nonce": "0x0",
            }],
        }))
        .unwrap();

        assert_eq!(block.number, 16);
        assert_eq!(block.timestamp, 0x6553f100);
        let tx = &block.transactions[0];
        assert_eq!(tx.to, None);
        assert_eq!(tx.value.to_ether_string(), "1.0");
        assert_eq!(tx.gas_price.unwrap().to_gwei_string(), "1.0");
    }
}
