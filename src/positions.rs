/// Position lifecycle and stop-loss / take-profit monitoring
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::arguments::is_debug_positions_enabled;
use crate::config::SniperConfig;
use crate::logger::{log, LogTag};
use crate::pricing::PriceOracle;
use crate::swaps::{SwapError, TradeSdk};
use crate::utils::{check_shutdown_or_delay, safe_truncate};

/// Price polling cadence while a position is open
pub const PRICE_POLL_INTERVAL_SECS: u64 = 1;

/// Phase of one trade session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradePhase {
    Buying,
    Selling,
    Monitoring,
    Closed,
}

/// How a monitored position ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionExit {
    /// Price fell to or below the stop-loss threshold; full sell issued
    StopLoss,
    /// Price rose to or above the take-profit threshold; full sell issued
    TakeProfit,
    /// The bot is stopping; monitoring ended without selling
    Shutdown,
    /// The optional monitoring bound elapsed; no sell issued
    Expired,
}

/// Watch an open position until a price threshold fires.
///
/// Polls the oracle once per second and compares against `entry_price`:
/// a drop of `stop_loss_percentage` or more forces a full (100%) exit, a
/// gain of `take_profit_percentage` or more takes profit with a full exit.
/// Exactly one of the two can fire, and the sell is issued before this
/// function returns. The shutdown signal is observed at every tick.
///
/// A price fetch or sell failure is returned to the caller, which aborts
/// the surrounding session; there is no retry here.
pub async fn watch_position(
    sdk: &dyn TradeSdk,
    oracle: &dyn PriceOracle,
    config: &SniperConfig,
    mint: &str,
    wallet: &str,
    entry_price: f64,
    running: &AtomicBool,
    shutdown: &Notify,
) -> Result<PositionExit, SwapError> {
    let started = tokio::time::Instant::now();

    log(
        LogTag::Position,
        "WATCH",
        &format!(
            "👀 Monitoring {} from entry price {:.12} SOL (SL -{}% / TP +{}%)",
            safe_truncate(mint, 8),
            entry_price,
            config.stop_loss_percentage,
            config.take_profit_percentage
        ),
    );

    loop {
        if !running.load(Ordering::Acquire) {
            log(
                LogTag::Position,
                "SHUTDOWN",
                &format!("Monitoring of {} stopped by shutdown", safe_truncate(mint, 8)),
            );
            return Ok(PositionExit::Shutdown);
        }

        if let Some(max_secs) = config.max_monitor_secs {
            if started.elapsed() >= Duration::from_secs(max_secs) {
                log(
                    LogTag::Position,
                    "WARN",
                    &format!(
                        "⏰ Monitoring bound of {}s reached for {} - closing without exit",
                        max_secs,
                        safe_truncate(mint, 8)
                    ),
                );
                return Ok(PositionExit::Expired);
            }
        }

        let current_price = oracle.get_price(mint).await.map_err(SwapError::Api)?;
        let change_pct = (current_price - entry_price) / entry_price * 100.0;

        if is_debug_positions_enabled() {
            log(
                LogTag::Position,
                "TICK",
                &format!(
                    "📈 {} price {:.12} SOL ({:+.2}%)",
                    safe_truncate(mint, 8),
                    current_price,
                    change_pct
                ),
            );
        }

        if change_pct <= -config.stop_loss_percentage {
            sdk.sell_percentage(mint, wallet, 100.0).await?;
            log(
                LogTag::Position,
                "STOP_LOSS",
                &format!(
                    "🛑 Stop loss triggered for {} at {:+.2}%",
                    safe_truncate(mint, 8),
                    change_pct
                ),
            );
            return Ok(PositionExit::StopLoss);
        }

        if change_pct >= config.take_profit_percentage {
            sdk.sell_percentage(mint, wallet, 100.0).await?;
            log(
                LogTag::Position,
                "TAKE_PROFIT",
                &format!(
                    "🎯 Take profit triggered for {} at {:+.2}%",
                    safe_truncate(mint, 8),
                    change_pct
                ),
            );
            return Ok(PositionExit::TakeProfit);
        }

        if check_shutdown_or_delay(shutdown, Duration::from_secs(PRICE_POLL_INTERVAL_SECS)).await {
            log(
                LogTag::Position,
                "SHUTDOWN",
                &format!("Monitoring of {} stopped by shutdown", safe_truncate(mint, 8)),
            );
            return Ok(PositionExit::Shutdown);
        }
    }
}
