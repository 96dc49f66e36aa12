/// Live price retrieval for the monitored token
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::logger::{log, LogTag};
use crate::utils::safe_truncate;

/// Price request timeout (seconds)
pub const PRICE_TIMEOUT_SECS: u64 = 10;

const DEXSCREENER_PAIRS_API: &str = "https://api.dexscreener.com/token-pairs/v1/solana";

/// SOL-denominated spot price source. Trait seam so the position monitor
/// can be driven by scripted prices in tests.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, mint: &str) -> Result<f64, String>;
}

/// Price oracle backed by the DexScreener token-pairs API
pub struct DexScreenerOracle {
    http: reqwest::Client,
}

impl DexScreenerOracle {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for DexScreenerOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for DexScreenerOracle {
    async fn get_price(&self, mint: &str) -> Result<f64, String> {
        let url = format!("{}/{}", DEXSCREENER_PAIRS_API, mint);

        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(PRICE_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| format!("Price request failed: {}", e))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| format!("Invalid price response: {}", e))?;

        let price = extract_native_price(&payload)
            .ok_or_else(|| format!("No price available for {}", safe_truncate(mint, 8)))?;

        log(
            LogTag::Price,
            "PRICE",
            &format!("💰 {} = {:.12} SOL", safe_truncate(mint, 8), price),
        );

        Ok(price)
    }
}

/// Pick the first pair in the response that carries a native (SOL) price.
fn extract_native_price(payload: &Value) -> Option<f64> {
    let pairs = payload.as_array()?;
    for pair in pairs {
        if let Some(price) = pair
            .get("priceNative")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
        {
            if price > 0.0 && price.is_finite() {
                return Some(price);
            }
        }
    }
    None
}
