/// Sniper bot controller
///
/// Owns the monitor loop: poll the detector, filter the batch, open trade
/// sessions through the concurrency gate, and advance the watermark once
/// the batch has been dispatched. Sessions run as spawned tasks tracked in
/// a `JoinSet`; each one holds an owned semaphore permit for its entire
/// lifetime, so a slot frees up exactly when the session ends, on every
/// exit path.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;

use crate::arguments::is_debug_sniper_enabled;
use crate::config::SniperConfig;
use crate::detector::{ActivityRecord, SignatureDetector};
use crate::filtering::is_relevant_transaction;
use crate::logger::{log, LogTag};
use crate::positions::{watch_position, TradePhase};
use crate::pricing::PriceOracle;
use crate::rpc::{lamports_to_sol, LedgerClient};
use crate::swaps::{SwapError, TradeSdk};
use crate::utils::{format_block_time, safe_truncate};

/// Steady-state polling cadence (seconds)
pub const POLL_INTERVAL_SECS: u64 = 1;

/// Backoff after a failed monitor cycle (seconds)
pub const ERROR_BACKOFF_SECS: u64 = 5;

pub struct SniperBot {
    config: SniperConfig,
    ledger: Arc<dyn LedgerClient>,
    sdk: Arc<dyn TradeSdk>,
    oracle: Arc<dyn PriceOracle>,
    wallet: String,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    trade_slots: Arc<Semaphore>,
}

impl SniperBot {
    pub fn new(
        config: SniperConfig,
        ledger: Arc<dyn LedgerClient>,
        sdk: Arc<dyn TradeSdk>,
        oracle: Arc<dyn PriceOracle>,
        wallet: String,
    ) -> Self {
        let trade_slots = Arc::new(Semaphore::new(config.max_concurrent_trades));
        Self {
            config,
            ledger,
            sdk,
            oracle,
            wallet,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            trade_slots,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Free trade slots right now. Mostly useful for diagnostics.
    pub fn available_trade_slots(&self) -> usize {
        self.trade_slots.available_permits()
    }

    /// Run the monitor loop until `stop` is called. Returns an error if the
    /// bot is already running.
    pub async fn start(&self) -> Result<(), String> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err("Sniper bot is already running".to_string());
        }

        log(
            LogTag::Sniper,
            "START",
            &format!(
                "🚀 Sniping {} with {} SOL per trade (max {} concurrent)",
                safe_truncate(&self.config.token_mint, 8),
                self.config.buy_amount_sol,
                self.config.max_concurrent_trades
            ),
        );

        let mut detector =
            SignatureDetector::new(self.ledger.clone(), self.config.token_mint.clone());
        let mut sessions: JoinSet<()> = JoinSet::new();

        while self.running.load(Ordering::Acquire) {
            match detector.poll().await {
                Ok(batch) => {
                    if let Some(newest) = batch.last().map(|r| r.signature.clone()) {
                        for record in batch {
                            self.process_record(record, &mut sessions).await;
                        }
                        // The whole batch has been dispatched (or dropped);
                        // only now does the watermark move forward.
                        detector.commit_watermark(&newest);
                    }

                    while sessions.try_join_next().is_some() {}

                    tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
                }
                Err(e) => {
                    log(
                        LogTag::Sniper,
                        "ERROR",
                        &format!("❌ Monitor cycle failed: {}", e),
                    );
                    tokio::time::sleep(Duration::from_secs(ERROR_BACKOFF_SECS)).await;
                }
            }
        }

        if !sessions.is_empty() {
            log(
                LogTag::Sniper,
                "DRAIN",
                &format!("⏳ Waiting for {} open trade session(s)", sessions.len()),
            );
        }
        while sessions.join_next().await.is_some() {}

        log(LogTag::Sniper, "STOP", "✅ Sniper bot stopped");
        Ok(())
    }

    /// Request shutdown. The loop finishes its current cycle, open sessions
    /// wind down through their monitors, and `start` returns after the
    /// drain. An in-progress backoff sleep is not interrupted.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            log(
                LogTag::Sniper,
                "STOP",
                "🛑 Stop requested - finishing open work",
            );
            self.shutdown.notify_waiters();
        }
    }

    /// Inspect one detected record and open a trade session for it if it is
    /// relevant and a slot is free. Denied records are dropped, never
    /// queued.
    async fn process_record(&self, record: ActivityRecord, sessions: &mut JoinSet<()>) {
        let details = match self.ledger.get_transaction(&record.signature).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                if is_debug_sniper_enabled() {
                    log(
                        LogTag::Sniper,
                        "SKIP",
                        &format!(
                            "Transaction {} not available yet",
                            safe_truncate(&record.signature, 16)
                        ),
                    );
                }
                return;
            }
            Err(e) => {
                log(
                    LogTag::Sniper,
                    "WARN",
                    &format!(
                        "⚠️ Failed to fetch transaction {}: {}",
                        safe_truncate(&record.signature, 16),
                        e
                    ),
                );
                return;
            }
        };

        if !is_relevant_transaction(&details) {
            return;
        }

        let permit = match self.trade_slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                log(
                    LogTag::Sniper,
                    "WARN",
                    &format!(
                        "⚠️ Maximum concurrent trades reached - dropping {}",
                        safe_truncate(&record.signature, 16)
                    ),
                );
                return;
            }
        };

        log(
            LogTag::Sniper,
            "DETECTED",
            &format!(
                "🎯 Activity on {} (slot {}, block time {}) - opening trade session",
                safe_truncate(&record.signature, 16),
                record.slot,
                format_block_time(record.block_time)
            ),
        );

        let sdk = self.sdk.clone();
        let oracle = self.oracle.clone();
        let config = self.config.clone();
        let wallet = self.wallet.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let trigger = record.signature;

        sessions.spawn(async move {
            // The permit lives as long as the session task
            let _permit = permit;
            if let Err(e) =
                execute_trade(sdk, oracle, &config, &wallet, &trigger, &running, &shutdown).await
            {
                log(
                    LogTag::Sniper,
                    "ERROR",
                    &format!(
                        "❌ Trade session for {} aborted: {}",
                        safe_truncate(&trigger, 16),
                        e
                    ),
                );
            }
        });
    }
}

fn log_phase(trigger: &str, phase: TradePhase) {
    if is_debug_sniper_enabled() {
        log(
            LogTag::Sniper,
            "PHASE",
            &format!("{} -> {:?}", safe_truncate(trigger, 16), phase),
        );
    }
}

/// One trade session: delayed buy, delayed partial sell, then monitor the
/// remainder until a price threshold or shutdown closes it. Any step
/// failing aborts the session; nothing is retried.
async fn execute_trade(
    sdk: Arc<dyn TradeSdk>,
    oracle: Arc<dyn PriceOracle>,
    config: &SniperConfig,
    wallet: &str,
    trigger: &str,
    running: &AtomicBool,
    shutdown: &Notify,
) -> Result<(), SwapError> {
    let mint = &config.token_mint;

    log_phase(trigger, TradePhase::Buying);
    tokio::time::sleep(Duration::from_millis(config.buy_delay_ms)).await;

    let buy = sdk.buy(mint, wallet, config.buy_amount_sol).await?;
    log(
        LogTag::Sniper,
        "SUCCESS",
        &format!(
            "✅ Bought {} SOL of {} - tx {}",
            lamports_to_sol(buy.input_amount),
            safe_truncate(mint, 8),
            safe_truncate(&buy.signature, 16)
        ),
    );

    log_phase(trigger, TradePhase::Selling);
    if config.sell_percentage > 0.0 {
        tokio::time::sleep(Duration::from_millis(config.sell_delay_ms)).await;

        let sell = sdk
            .sell_percentage(mint, wallet, config.sell_percentage)
            .await?;
        log(
            LogTag::Sniper,
            "SUCCESS",
            &format!(
                "✅ Sold {}% of {} - tx {}",
                config.sell_percentage,
                safe_truncate(mint, 8),
                safe_truncate(&sell.signature, 16)
            ),
        );
    } else if is_debug_sniper_enabled() {
        // 0% keeps the whole position for the monitor
        log(
            LogTag::Sniper,
            "SKIP",
            &format!("Post-buy sell disabled for {}", safe_truncate(mint, 8)),
        );
    }

    log_phase(trigger, TradePhase::Monitoring);
    let entry_price = oracle.get_price(mint).await.map_err(SwapError::Api)?;

    let exit = watch_position(
        sdk.as_ref(),
        oracle.as_ref(),
        config,
        mint,
        wallet,
        entry_price,
        running,
        shutdown,
    )
    .await?;

    log_phase(trigger, TradePhase::Closed);
    log(
        LogTag::Sniper,
        "CLOSED",
        &format!(
            "🏁 Session for {} closed ({:?})",
            safe_truncate(trigger, 16),
            exit
        ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{SignatureInfo, TransactionDetails};
    use crate::swaps::SwapOutcome;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    const MINT: &str = "Mint1111111111111111111111111111111111111111";

    fn sig(name: &str, slot: u64) -> SignatureInfo {
        SignatureInfo {
            signature: name.to_string(),
            slot,
            err: None,
            block_time: Some(slot as i64),
        }
    }

    fn relevant_tx() -> TransactionDetails {
        serde_json::from_value(json!({
            "transaction": {
                "message": {
                    "accountKeys": ["Wallet111", crate::filtering::PUMPFUN_PROGRAM]
                },
                "signatures": ["sig"]
            },
            "meta": { "err": null, "fee": 5000, "preBalances": [], "postBalances": [] }
        }))
        .unwrap()
    }

    fn irrelevant_tx() -> TransactionDetails {
        serde_json::from_value(json!({
            "transaction": {
                "message": { "accountKeys": ["Wallet111", "SomeOtherProgram111"] },
                "signatures": ["sig"]
            },
            "meta": { "err": null, "fee": 5000, "preBalances": [], "postBalances": [] }
        }))
        .unwrap()
    }

    /// Scripted signature feed; falls back to `default` once the script is
    /// exhausted. Records the virtual instant of every poll.
    struct FakeLedger {
        script: Mutex<VecDeque<Result<Vec<SignatureInfo>, String>>>,
        default: Result<Vec<SignatureInfo>, String>,
        poll_instants: Mutex<Vec<tokio::time::Instant>>,
        transactions: Mutex<HashMap<String, Result<Option<TransactionDetails>, String>>>,
    }

    impl FakeLedger {
        fn new(
            script: Vec<Result<Vec<SignatureInfo>, String>>,
            default: Result<Vec<SignatureInfo>, String>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                default,
                poll_instants: Mutex::new(Vec::new()),
                transactions: Mutex::new(HashMap::new()),
            }
        }

        fn with_transaction(self, signature: &str, details: TransactionDetails) -> Self {
            self.transactions
                .lock()
                .unwrap()
                .insert(signature.to_string(), Ok(Some(details)));
            self
        }

        fn with_transaction_error(self, signature: &str, error: &str) -> Self {
            self.transactions
                .lock()
                .unwrap()
                .insert(signature.to_string(), Err(error.to_string()));
            self
        }

        fn poll_gaps(&self) -> Vec<Duration> {
            let instants = self.poll_instants.lock().unwrap();
            instants.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn get_signatures_for_address(
            &self,
            _address: &str,
            _limit: Option<usize>,
            _until: Option<&str>,
        ) -> Result<Vec<SignatureInfo>, String> {
            self.poll_instants
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone())
        }

        async fn get_transaction(
            &self,
            signature: &str,
        ) -> Result<Option<TransactionDetails>, String> {
            self.transactions
                .lock()
                .unwrap()
                .get(signature)
                .cloned()
                .unwrap_or(Ok(None))
        }
    }

    /// Trade SDK that records calls. Buys optionally block on a semaphore
    /// (to keep a slot busy) or fail outright.
    struct FakeSdk {
        buys: Mutex<Vec<String>>,
        sells: Mutex<Vec<(String, f64)>>,
        hold_buys: Option<Arc<Semaphore>>,
        fail_buys: bool,
    }

    impl FakeSdk {
        fn new() -> Self {
            Self {
                buys: Mutex::new(Vec::new()),
                sells: Mutex::new(Vec::new()),
                hold_buys: None,
                fail_buys: false,
            }
        }

        fn holding(gate: Arc<Semaphore>) -> Self {
            Self {
                hold_buys: Some(gate),
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail_buys: true,
                ..Self::new()
            }
        }

        fn buys(&self) -> Vec<String> {
            self.buys.lock().unwrap().clone()
        }

        fn sells(&self) -> Vec<(String, f64)> {
            self.sells.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TradeSdk for FakeSdk {
        async fn buy(
            &self,
            mint: &str,
            _wallet: &str,
            _amount_sol: f64,
        ) -> Result<SwapOutcome, SwapError> {
            self.buys.lock().unwrap().push(mint.to_string());
            if self.fail_buys {
                return Err(SwapError::Api("buy rejected".to_string()));
            }
            if let Some(gate) = &self.hold_buys {
                let _released = gate
                    .acquire()
                    .await
                    .map_err(|_| SwapError::Api("gate closed".to_string()))?;
            }
            Ok(outcome())
        }

        async fn sell_percentage(
            &self,
            mint: &str,
            _wallet: &str,
            percentage: f64,
        ) -> Result<SwapOutcome, SwapError> {
            self.sells.lock().unwrap().push((mint.to_string(), percentage));
            Ok(outcome())
        }
    }

    struct FlatOracle;

    #[async_trait]
    impl PriceOracle for FlatOracle {
        async fn get_price(&self, _mint: &str) -> Result<f64, String> {
            Ok(100.0)
        }
    }

    /// First call returns the entry price, every later call a 20% drop.
    struct FallingOracle {
        calls: Mutex<u32>,
    }

    impl FallingOracle {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceOracle for FallingOracle {
        async fn get_price(&self, _mint: &str) -> Result<f64, String> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Ok(100.0)
            } else {
                Ok(80.0)
            }
        }
    }

    fn outcome() -> SwapOutcome {
        SwapOutcome {
            signature: "tx-sig".to_string(),
            input_amount: 100_000_000,
            price_impact_pct: Some(2.5),
        }
    }

    fn config(max_concurrent: usize) -> SniperConfig {
        SniperConfig {
            main_wallet_private: "key".to_string(),
            token_mint: MINT.to_string(),
            buy_delay_ms: 0,
            sell_delay_ms: 0,
            max_concurrent_trades: max_concurrent,
            ..SniperConfig::default()
        }
    }

    fn bot(config: SniperConfig, ledger: Arc<FakeLedger>, sdk: Arc<FakeSdk>) -> Arc<SniperBot> {
        bot_with_oracle(config, ledger, sdk, Arc::new(FlatOracle))
    }

    fn bot_with_oracle(
        config: SniperConfig,
        ledger: Arc<FakeLedger>,
        sdk: Arc<FakeSdk>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Arc<SniperBot> {
        Arc::new(SniperBot::new(
            config,
            ledger,
            sdk,
            oracle,
            "Wallet111".to_string(),
        ))
    }

    async fn run_for(bot: &Arc<SniperBot>, secs: u64) -> Result<(), String> {
        let handle = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.start().await })
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
        bot.stop();
        handle.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn irrelevant_records_never_open_a_session() {
        let ledger = Arc::new(
            FakeLedger::new(
                vec![Ok(vec![sig("sig-seed", 1)]), Ok(vec![sig("sig-a", 2)])],
                Ok(vec![]),
            )
            .with_transaction("sig-a", irrelevant_tx()),
        );
        let sdk = Arc::new(FakeSdk::new());
        let bot = bot(config(3), ledger, sdk.clone());

        run_for(&bot, 5).await.unwrap();

        assert!(sdk.buys().is_empty());
        assert_eq!(bot.available_trade_slots(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_drops_excess_records_and_frees_slot_on_session_end() {
        let release = Arc::new(Semaphore::new(0));
        let ledger = Arc::new(
            FakeLedger::new(
                vec![
                    Ok(vec![sig("sig-seed", 1)]),
                    // Newest first; both relevant, but only one slot
                    Ok(vec![sig("sig-b", 3), sig("sig-a", 2)]),
                ],
                Ok(vec![]),
            )
            .with_transaction("sig-a", relevant_tx())
            .with_transaction("sig-b", relevant_tx()),
        );
        let sdk = Arc::new(FakeSdk::holding(release.clone()));
        let bot = bot(config(1), ledger, sdk.clone());

        let handle = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.start().await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;

        // Oldest record took the only slot; the second was dropped
        assert_eq!(sdk.buys(), vec![MINT.to_string()]);
        assert_eq!(bot.available_trade_slots(), 0);

        // Let the buy complete, then shut down through the monitor
        release.add_permits(1);
        tokio::time::sleep(Duration::from_secs(5)).await;
        bot.stop();
        handle.await.unwrap().unwrap();

        // Dropped record was never retried; the slot came back
        assert_eq!(sdk.buys().len(), 1);
        assert_eq!(sdk.sells(), vec![(MINT.to_string(), 50.0)]);
        assert_eq!(bot.available_trade_slots(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_buy_aborts_session_and_releases_slot() {
        let ledger = Arc::new(
            FakeLedger::new(
                vec![
                    Ok(vec![sig("sig-seed", 1)]),
                    Ok(vec![sig("sig-a", 2)]),
                    Ok(vec![sig("sig-b", 3)]),
                ],
                Ok(vec![]),
            )
            .with_transaction("sig-a", relevant_tx())
            .with_transaction("sig-b", relevant_tx()),
        );
        let sdk = Arc::new(FakeSdk::failing());
        let bot = bot(config(1), ledger, sdk.clone());

        run_for(&bot, 10).await.unwrap();

        // Both records got a slot because the first session's failure
        // released it; neither progressed to a sell
        assert_eq!(sdk.buys().len(), 2);
        assert!(sdk.sells().is_empty());
        assert_eq!(bot.available_trade_slots(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_sell_percentage_skips_the_sell_and_still_monitors() {
        let ledger = Arc::new(
            FakeLedger::new(
                vec![Ok(vec![sig("sig-seed", 1)]), Ok(vec![sig("sig-a", 2)])],
                Ok(vec![]),
            )
            .with_transaction("sig-a", relevant_tx()),
        );
        let sdk = Arc::new(FakeSdk::new());
        let mut keep_all = config(1);
        keep_all.sell_percentage = 0.0;
        let bot = bot_with_oracle(
            keep_all,
            ledger,
            sdk.clone(),
            Arc::new(FallingOracle::new()),
        );

        run_for(&bot, 10).await.unwrap();

        // The session skipped the post-buy sell, reached the monitor, and
        // the price drop closed it through the stop loss
        assert_eq!(sdk.buys().len(), 1);
        assert_eq!(sdk.sells(), vec![(MINT.to_string(), 100.0)]);
        assert_eq!(bot.available_trade_slots(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transaction_fetch_failure_skips_the_record() {
        let ledger = Arc::new(
            FakeLedger::new(
                vec![Ok(vec![sig("sig-seed", 1)]), Ok(vec![sig("sig-a", 2)])],
                Ok(vec![]),
            )
            .with_transaction_error("sig-a", "node behind"),
        );
        let sdk = Arc::new(FakeSdk::new());
        let bot = bot(config(3), ledger, sdk.clone());

        run_for(&bot, 5).await.unwrap();

        assert!(sdk.buys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let ledger = Arc::new(FakeLedger::new(vec![Ok(vec![sig("sig-seed", 1)])], Ok(vec![])));
        let sdk = Arc::new(FakeSdk::new());
        let bot = bot(config(3), ledger, sdk);

        let handle = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.start().await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(bot.is_running());
        assert!(bot.start().await.is_err());

        bot.stop();
        handle.await.unwrap().unwrap();
        assert!(!bot.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn steady_polling_runs_every_second() {
        let ledger = Arc::new(FakeLedger::new(vec![Ok(vec![sig("sig-seed", 1)])], Ok(vec![])));
        let sdk = Arc::new(FakeSdk::new());
        let bot = bot(config(3), ledger.clone(), sdk);

        run_for(&bot, 6).await.unwrap();

        let gaps = ledger.poll_gaps();
        assert!(gaps.len() >= 3);
        for gap in gaps {
            assert!(gap >= Duration::from_secs(1));
            assert!(gap < Duration::from_secs(ERROR_BACKOFF_SECS));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycles_back_off_for_five_seconds() {
        let ledger = Arc::new(FakeLedger::new(
            vec![Ok(vec![sig("sig-seed", 1)])],
            Err("rpc unavailable".to_string()),
        ));
        let sdk = Arc::new(FakeSdk::new());
        let bot = bot(config(3), ledger.clone(), sdk);

        run_for(&bot, 20).await.unwrap();

        let gaps = ledger.poll_gaps();
        // Every gap after the seed cycle is an error backoff
        assert!(gaps.len() >= 2);
        for gap in &gaps[1..] {
            assert!(*gap >= Duration::from_secs(ERROR_BACKOFF_SECS));
        }
    }
}
