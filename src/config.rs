use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sniper configuration, loaded once at startup from `sniper.json`.
/// No dynamic reconfiguration while the bot is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniperConfig {
    pub main_wallet_private: String,
    pub rpc_url: String,

    /// Token mint to snipe
    pub token_mint: String,
    /// Amount of SOL to buy with
    pub buy_amount_sol: f64,
    /// Percentage of the position to sell after the buy (0-100)
    pub sell_percentage: f64,
    /// Maximum allowed slippage (%)
    pub max_slippage_percent: f64,

    /// Delay before buying (ms)
    pub buy_delay_ms: u64,
    /// Delay before selling (ms)
    pub sell_delay_ms: u64,

    /// Minimum quote price impact to accept a buy (%)
    pub min_price_impact: f64,
    /// Maximum quote price impact to accept a buy (%)
    pub max_price_impact: f64,

    /// Maximum concurrent trade sessions
    pub max_concurrent_trades: usize,
    /// Stop loss percentage (relative to entry price)
    pub stop_loss_percentage: f64,
    /// Take profit percentage (relative to entry price)
    pub take_profit_percentage: f64,

    /// Optional bound on how long a position is monitored before the
    /// session is closed without selling. None keeps monitoring until a
    /// price threshold fires.
    #[serde(default)]
    pub max_monitor_secs: Option<u64>,
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            main_wallet_private: String::new(),
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            token_mint: String::new(),
            buy_amount_sol: 0.1,
            sell_percentage: 50.0,
            max_slippage_percent: 5.0,
            buy_delay_ms: 1000,
            sell_delay_ms: 5000,
            min_price_impact: 1.0,
            max_price_impact: 10.0,
            max_concurrent_trades: 3,
            stop_loss_percentage: 10.0,
            take_profit_percentage: 20.0,
            max_monitor_secs: None,
        }
    }
}

impl SniperConfig {
    /// Load the config from `path`, writing a default template first if the
    /// file does not exist yet.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate the invariants the trading loop relies on.
    pub fn validate(&self) -> Result<()> {
        if self.main_wallet_private.is_empty() {
            return Err(anyhow::anyhow!("main_wallet_private is required in config"));
        }
        if self.token_mint.is_empty() {
            return Err(anyhow::anyhow!("token_mint is required in config"));
        }
        if !(0.0..=100.0).contains(&self.sell_percentage) {
            return Err(anyhow::anyhow!(
                "sell_percentage must be within 0-100, got {}",
                self.sell_percentage
            ));
        }
        if self.buy_amount_sol <= 0.0 {
            return Err(anyhow::anyhow!(
                "buy_amount_sol must be positive, got {}",
                self.buy_amount_sol
            ));
        }
        if self.stop_loss_percentage < 0.0 {
            return Err(anyhow::anyhow!(
                "stop_loss_percentage must not be negative, got {}",
                self.stop_loss_percentage
            ));
        }
        if self.take_profit_percentage < 0.0 {
            return Err(anyhow::anyhow!(
                "take_profit_percentage must not be negative, got {}",
                self.take_profit_percentage
            ));
        }
        if self.max_concurrent_trades < 1 {
            return Err(anyhow::anyhow!("max_concurrent_trades must be at least 1"));
        }
        if self.max_price_impact < self.min_price_impact {
            return Err(anyhow::anyhow!(
                "max_price_impact ({}) must not be below min_price_impact ({})",
                self.max_price_impact,
                self.min_price_impact
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SniperConfig {
        SniperConfig {
            main_wallet_private: "key".to_string(),
            token_mint: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263".to_string(),
            ..SniperConfig::default()
        }
    }

    #[test]
    fn validate_accepts_defaults_with_wallet_and_mint() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_wallet() {
        let mut config = valid_config();
        config.main_wallet_private.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_sell_percentage_out_of_range() {
        let mut config = valid_config();
        config.sell_percentage = 150.0;
        assert!(config.validate().is_err());

        config.sell_percentage = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.max_concurrent_trades = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_impact_band() {
        let mut config = valid_config();
        config.min_price_impact = 10.0;
        config.max_price_impact = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_thresholds() {
        let mut config = valid_config();
        config.stop_loss_percentage = -5.0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.take_profit_percentage = -5.0;
        assert!(config.validate().is_err());
    }
}
