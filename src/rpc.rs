/// Raw JSON-RPC access to the Solana ledger
///
/// The sniper only needs a handful of RPC methods: signature listing for the
/// tracked mint, transaction detail fetches, token balances for sell sizing,
/// and raw transaction submission. Everything goes through `execute_raw`,
/// a plain JSON-RPC POST over reqwest.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::time::Duration;

use crate::arguments::is_debug_rpc_enabled;
use crate::logger::{log, LogTag};
use crate::utils::safe_truncate;

/// RPC request timeout (seconds)
pub const RPC_TIMEOUT_SECS: u64 = 30;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64) as u64
}

/// One entry from getSignaturesForAddress
#[derive(Debug, Clone)]
pub struct SignatureInfo {
    /// The transaction signature
    pub signature: String,
    /// The slot the transaction was confirmed in
    pub slot: u64,
    /// Error if the transaction failed, None if successful
    pub err: Option<String>,
    /// Block time as Unix timestamp
    pub block_time: Option<i64>,
}

/// Parsed transaction payload (jsonParsed encoding)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub message: Value,
    #[serde(default)]
    pub signatures: Vec<String>,
}

/// Transaction meta from getTransaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<TokenBalance>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u32,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    pub ui_amount: Option<f64>,
    pub decimals: u8,
    pub amount: String,
}

/// Full transaction detail record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub transaction: TransactionEnvelope,
    pub meta: Option<TransactionMeta>,
}

impl TransactionDetails {
    /// Account keys referenced by the transaction, as base58 strings.
    /// Handles both the plain-string and `{pubkey: ...}` object forms the
    /// jsonParsed encoding produces.
    pub fn account_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(array) = self
            .transaction
            .message
            .get("accountKeys")
            .and_then(|v| v.as_array())
        {
            for entry in array {
                if let Some(s) = entry.as_str() {
                    keys.push(s.to_string());
                } else if let Some(s) = entry.get("pubkey").and_then(|k| k.as_str()) {
                    keys.push(s.to_string());
                }
            }
        }
        keys
    }

    /// True when the transaction landed without an on-chain error.
    pub fn succeeded(&self) -> bool {
        self.meta.as_ref().map(|m| m.err.is_none()).unwrap_or(false)
    }
}

/// The ledger operations the sniper consumes. Split out as a trait so the
/// detection and trading loops can be driven by a mock ledger in tests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// List signatures for an address, newest first. `until` bounds the
    /// scan: only signatures strictly newer than it are returned.
    async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: Option<usize>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, String>;

    /// Fetch one transaction's details. Returns None when the ledger does
    /// not know the signature (yet).
    async fn get_transaction(&self, signature: &str)
        -> Result<Option<TransactionDetails>, String>;
}

/// JSON-RPC client for a single Solana endpoint
pub struct SolanaRpc {
    url: String,
    http: reqwest::Client,
}

impl SolanaRpc {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn execute_raw(&self, method: &str, params: Value) -> Result<Value, String> {
        if is_debug_rpc_enabled() {
            log(LogTag::Rpc, "REQUEST", &format!("🌐 {} -> {}", method, self.url));
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("RPC request failed: {}", e))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| format!("Invalid RPC response: {}", e))?;

        if let Some(error) = payload.get("error") {
            return Err(format!("RPC error from {}: {}", method, error));
        }

        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Total balance of `mint` held by `owner`, in raw token units.
    pub async fn get_token_balance(&self, owner: &str, mint: &str) -> Result<u64, String> {
        let params = json!([
            owner,
            { "mint": mint },
            { "encoding": "jsonParsed", "commitment": "confirmed" }
        ]);

        let result = self.execute_raw("getTokenAccountsByOwner", params).await?;

        let accounts = result
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or("Invalid response: expected token account array")?;

        let mut total: u64 = 0;
        for account in accounts {
            let amount = account
                .pointer("/account/data/parsed/info/tokenAmount/amount")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            total = total.saturating_add(amount);
        }

        Ok(total)
    }

    /// Sign a base64-encoded unsigned transaction with `keypair` and submit
    /// it. Returns the transaction signature.
    pub async fn sign_and_send_transaction(
        &self,
        transaction_base64: &str,
        keypair: &Keypair,
    ) -> Result<String, String> {
        let raw = BASE64
            .decode(transaction_base64)
            .map_err(|e| format!("Failed to decode transaction base64: {}", e))?;

        let mut transaction: VersionedTransaction =
            bincode::deserialize(&raw).map_err(|e| format!("Failed to decode transaction: {}", e))?;

        let signature = keypair.sign_message(&transaction.message.serialize());
        if transaction.signatures.is_empty() {
            transaction.signatures.push(signature);
        } else {
            // Fee payer signature slot
            transaction.signatures[0] = signature;
        }

        let signed = bincode::serialize(&transaction)
            .map_err(|e| format!("Failed to encode signed transaction: {}", e))?;
        let signed_base64 = BASE64.encode(signed);

        let params = json!([
            signed_base64,
            { "encoding": "base64", "skipPreflight": true, "maxRetries": 3 }
        ]);

        let result = self.execute_raw("sendTransaction", params).await?;

        let sent_signature = result
            .as_str()
            .ok_or("Invalid response: expected signature string")?
            .to_string();

        log(
            LogTag::Rpc,
            "SENT",
            &format!("📤 Transaction sent: {}", safe_truncate(&sent_signature, 16)),
        );

        Ok(sent_signature)
    }
}

fn parse_signature_info(item: &Value) -> Result<SignatureInfo, String> {
    let signature = item
        .get("signature")
        .and_then(|v| v.as_str())
        .ok_or("Missing signature field")?
        .to_string();

    let slot = item.get("slot").and_then(|v| v.as_u64()).unwrap_or(0);

    let err = match item.get("err") {
        Some(Value::Null) | None => None,
        Some(value) => Some(value.to_string()),
    };

    let block_time = item.get("blockTime").and_then(|v| v.as_i64());

    Ok(SignatureInfo {
        signature,
        slot,
        err,
        block_time,
    })
}

#[async_trait]
impl LedgerClient for SolanaRpc {
    async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: Option<usize>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, String> {
        let mut config = serde_json::Map::new();
        if let Some(limit_val) = limit {
            config.insert("limit".to_string(), Value::Number(limit_val.into()));
        }
        if let Some(until_sig) = until {
            config.insert("until".to_string(), Value::String(until_sig.to_string()));
        }
        config.insert(
            "commitment".to_string(),
            Value::String("confirmed".to_string()),
        );

        let params = json!([address, Value::Object(config)]);

        let result = self.execute_raw("getSignaturesForAddress", params).await?;

        let items = result
            .as_array()
            .ok_or("Invalid response: expected array")?;

        let mut signatures = Vec::with_capacity(items.len());
        for item in items {
            signatures.push(parse_signature_info(item)?);
        }

        Ok(signatures)
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionDetails>, String> {
        let params = json!([
            signature,
            {
                "encoding": "jsonParsed",
                "commitment": "confirmed",
                "maxSupportedTransactionVersion": 0
            }
        ]);

        let result = self.execute_raw("getTransaction", params).await?;

        if result.is_null() {
            return Ok(None);
        }

        let details: TransactionDetails = serde_json::from_value(result)
            .map_err(|e| format!("Failed to parse transaction details: {}", e))?;

        Ok(Some(details))
    }
}
