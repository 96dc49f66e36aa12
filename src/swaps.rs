/// Trade execution SDK
///
/// `TradeSdk` is the seam the executor drives; `PumpSwapRouter` is the
/// production implementation: request a swap route from the router API,
/// check the quoted price impact, then sign and submit the returned
/// transaction through the RPC layer.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::arguments::is_debug_swap_enabled;
use crate::config::SniperConfig;
use crate::filtering::impact_within_band;
use crate::logger::{log, LogTag};
use crate::rpc::{sol_to_lamports, SolanaRpc};
use crate::utils::safe_truncate;
use solana_sdk::signature::Keypair;

/// SOL token mint address
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Quote request timeout (seconds)
pub const QUOTE_TIMEOUT_SECS: u64 = 15;

/// Retry attempts for failed quote requests
pub const QUOTE_RETRY_ATTEMPTS: u32 = 3;

/// Swap route quote endpoint
pub const QUOTE_API: &str = "https://gmgn.ai/defi/router/v1/sol/tx/get_swap_route";

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("API Error: {0}")]
    Api(String),
    #[error("Network Error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid Response: {0}")]
    InvalidResponse(String),
    #[error("Invalid Amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient Balance: {0}")]
    InsufficientBalance(String),
    #[error("Price Impact Out Of Band: {0}")]
    PriceImpactOutOfBand(String),
    #[error("Transaction Error: {0}")]
    Transaction(String),
}

/// Outcome of one executed swap
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub signature: String,
    pub input_amount: u64,
    pub price_impact_pct: Option<f64>,
}

/// Buy/sell operations the trade executor consumes
#[async_trait]
pub trait TradeSdk: Send + Sync {
    /// Buy `amount_sol` worth of `mint` for `wallet`.
    async fn buy(&self, mint: &str, wallet: &str, amount_sol: f64)
        -> Result<SwapOutcome, SwapError>;

    /// Sell `percentage` (0-100] of the wallet's `mint` balance.
    async fn sell_percentage(
        &self,
        mint: &str,
        wallet: &str,
        percentage: f64,
    ) -> Result<SwapOutcome, SwapError>;
}

/// Quote information from the swap router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "inAmount")]
    pub in_amount: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "outAmount")]
    pub out_amount: String,
    #[serde(rename = "priceImpactPct")]
    pub price_impact_pct: String,
}

/// Raw transaction data from the swap router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "swapTransaction")]
    pub swap_transaction: String,
    #[serde(rename = "lastValidBlockHeight", default)]
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapData {
    pub quote: SwapQuote,
    pub raw_tx: RawTransaction,
}

/// Router API response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct RouterResponse {
    pub code: i32,
    pub msg: String,
    pub data: Option<SwapData>,
}

/// Production trade SDK backed by the swap router API
pub struct PumpSwapRouter {
    rpc: Arc<SolanaRpc>,
    keypair: Arc<Keypair>,
    http: reqwest::Client,
    slippage_percent: f64,
    min_price_impact: f64,
    max_price_impact: f64,
}

impl PumpSwapRouter {
    pub fn new(rpc: Arc<SolanaRpc>, keypair: Arc<Keypair>, config: &SniperConfig) -> Self {
        Self {
            rpc,
            keypair,
            http: reqwest::Client::new(),
            slippage_percent: config.max_slippage_percent,
            min_price_impact: config.min_price_impact,
            max_price_impact: config.max_price_impact,
        }
    }

    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        input_amount: u64,
        from_address: &str,
    ) -> Result<SwapData, SwapError> {
        let url = build_quote_url(
            QUOTE_API,
            input_mint,
            output_mint,
            input_amount,
            from_address,
            self.slippage_percent,
        );

        if is_debug_swap_enabled() {
            log(LogTag::Swap, "QUOTE_URL", &format!("🌐 {}", url));
        }

        let mut last_error = None;

        for attempt in 1..=QUOTE_RETRY_ATTEMPTS {
            match self
                .http
                .get(&url)
                .timeout(Duration::from_secs(QUOTE_TIMEOUT_SECS))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let parsed: RouterResponse = response
                        .json()
                        .await
                        .map_err(|e| SwapError::InvalidResponse(e.to_string()))?;

                    if parsed.code != 0 {
                        return Err(SwapError::Api(format!(
                            "Router returned code {}: {}",
                            parsed.code, parsed.msg
                        )));
                    }

                    return parsed
                        .data
                        .ok_or_else(|| SwapError::InvalidResponse("Missing quote data".into()));
                }
                Ok(response) => {
                    last_error = Some(SwapError::Api(format!(
                        "Quote request failed with status {}",
                        response.status()
                    )));
                }
                Err(e) => {
                    last_error = Some(SwapError::Network(e));
                }
            }

            if attempt < QUOTE_RETRY_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| SwapError::Api("Quote request failed".into())))
    }

    async fn execute(&self, data: &SwapData) -> Result<SwapOutcome, SwapError> {
        let signature = self
            .rpc
            .sign_and_send_transaction(&data.raw_tx.swap_transaction, &self.keypair)
            .await
            .map_err(SwapError::Transaction)?;

        Ok(SwapOutcome {
            signature,
            input_amount: data.quote.in_amount.parse().unwrap_or(0),
            price_impact_pct: data.quote.price_impact_pct.parse().ok(),
        })
    }
}

#[async_trait]
impl TradeSdk for PumpSwapRouter {
    async fn buy(
        &self,
        mint: &str,
        wallet: &str,
        amount_sol: f64,
    ) -> Result<SwapOutcome, SwapError> {
        if amount_sol <= 0.0 || !amount_sol.is_finite() {
            return Err(SwapError::InvalidAmount(format!(
                "Invalid buy amount: {}",
                amount_sol
            )));
        }

        log(
            LogTag::Swap,
            "BUY_START",
            &format!(
                "🟢 Buying {} SOL worth of {} tokens",
                amount_sol,
                safe_truncate(mint, 8)
            ),
        );

        let quote = self
            .get_quote(SOL_MINT, mint, sol_to_lamports(amount_sol), wallet)
            .await?;

        // The quote is the first point where impact is actually computable;
        // reject routes outside the configured band before signing.
        if let Ok(impact) = quote.quote.price_impact_pct.parse::<f64>() {
            if !impact_within_band(impact, self.min_price_impact, self.max_price_impact) {
                return Err(SwapError::PriceImpactOutOfBand(format!(
                    "quoted impact {:.2}% outside [{:.2}%, {:.2}%]",
                    impact, self.min_price_impact, self.max_price_impact
                )));
            }
        }

        self.execute(&quote).await
    }

    async fn sell_percentage(
        &self,
        mint: &str,
        wallet: &str,
        percentage: f64,
    ) -> Result<SwapOutcome, SwapError> {
        if !(0.0..=100.0).contains(&percentage) || percentage == 0.0 {
            return Err(SwapError::InvalidAmount(format!(
                "Invalid sell percentage: {}",
                percentage
            )));
        }

        let balance = self
            .rpc
            .get_token_balance(wallet, mint)
            .await
            .map_err(SwapError::Api)?;

        let amount = percentage_to_amount(balance, percentage);
        if amount == 0 {
            return Err(SwapError::InsufficientBalance(format!(
                "No {} balance to sell",
                safe_truncate(mint, 8)
            )));
        }

        log(
            LogTag::Swap,
            "SELL_START",
            &format!(
                "🔴 Selling {}% of {} ({} raw units)",
                percentage,
                safe_truncate(mint, 8),
                amount
            ),
        );

        let quote = self.get_quote(mint, SOL_MINT, amount, wallet).await?;
        self.execute(&quote).await
    }
}

/// Raw token units corresponding to `percentage` of `balance`.
pub fn percentage_to_amount(balance: u64, percentage: f64) -> u64 {
    ((balance as f64) * percentage / 100.0) as u64
}

fn build_quote_url(
    api: &str,
    input_mint: &str,
    output_mint: &str,
    input_amount: u64,
    from_address: &str,
    slippage: f64,
) -> String {
    format!(
        "{}?token_in_address={}&token_out_address={}&in_amount={}&from_address={}&slippage={}&swap_mode=ExactIn",
        api, input_mint, output_mint, input_amount, from_address, slippage
    )
}
