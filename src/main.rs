use std::process::exit;
use std::sync::Arc;

use solana_sdk::signer::Signer;

use sniperbot::config::SniperConfig;
use sniperbot::logger::{header, log, print_key_value, LogTag};
use sniperbot::pricing::DexScreenerOracle;
use sniperbot::rpc::SolanaRpc;
use sniperbot::sniper::SniperBot;
use sniperbot::swaps::PumpSwapRouter;
use sniperbot::wallet::load_keypair;

const CONFIG_PATH: &str = "sniper.json";

#[tokio::main]
async fn main() {
    header("PumpSwap Token Sniper");

    let config = match SniperConfig::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            log(LogTag::System, "ERROR", &format!("❌ {:#}", e));
            exit(1);
        }
    };

    if let Err(e) = config.validate() {
        log(LogTag::System, "ERROR", &format!("❌ Invalid config: {:#}", e));
        exit(1);
    }

    let keypair = match load_keypair(&config.main_wallet_private) {
        Ok(keypair) => keypair,
        Err(e) => {
            log(LogTag::Wallet, "ERROR", &format!("❌ {:#}", e));
            exit(1);
        }
    };
    let wallet_address = keypair.pubkey().to_string();

    print_key_value("Wallet", &wallet_address);
    print_key_value("Token", &config.token_mint);
    print_key_value("Buy amount", &format!("{} SOL", config.buy_amount_sol));
    print_key_value("Sell after buy", &format!("{}%", config.sell_percentage));
    print_key_value(
        "Stop loss / take profit",
        &format!(
            "-{}% / +{}%",
            config.stop_loss_percentage, config.take_profit_percentage
        ),
    );
    print_key_value(
        "Max concurrent trades",
        &config.max_concurrent_trades.to_string(),
    );

    let rpc = Arc::new(SolanaRpc::new(&config.rpc_url));
    let sdk = Arc::new(PumpSwapRouter::new(rpc.clone(), Arc::new(keypair), &config));
    let oracle = Arc::new(DexScreenerOracle::new());

    let bot = Arc::new(SniperBot::new(
        config,
        rpc,
        sdk,
        oracle,
        wallet_address,
    ));

    {
        let bot = bot.clone();
        if let Err(e) = ctrlc::set_handler(move || bot.stop()) {
            log(
                LogTag::System,
                "WARN",
                &format!("⚠️ Could not install Ctrl+C handler: {}", e),
            );
        }
    }

    if let Err(e) = bot.start().await {
        log(LogTag::System, "ERROR", &format!("❌ {}", e));
        exit(1);
    }
}
