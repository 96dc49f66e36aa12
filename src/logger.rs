/// Tag-based console logging for the sniper bot
///
/// Every log line carries a module tag, an action keyword and a message:
/// `log(LogTag::Sniper, "START", "Starting PumpSwap Sniper Bot...")`
///
/// Lines are colored per tag and timestamped. Debug-only call sites are
/// gated by `--debug-<module>` flags (see `arguments.rs`), not here.
use chrono::Utc;
use colored::*;
use std::io::{self, Write};

/// Module tags for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Sniper,
    Detector,
    Swap,
    Position,
    Price,
    Rpc,
    Wallet,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Sniper => "SNIPER",
            LogTag::Detector => "DETECTOR",
            LogTag::Swap => "SWAP",
            LogTag::Position => "POSITION",
            LogTag::Price => "PRICE",
            LogTag::Rpc => "RPC",
            LogTag::Wallet => "WALLET",
        }
    }

    fn colored_label(&self) -> ColoredString {
        match self {
            LogTag::System => self.as_str().green().bold(),
            LogTag::Sniper => self.as_str().yellow().bold(),
            LogTag::Detector => self.as_str().magenta().bold(),
            LogTag::Swap => self.as_str().bright_yellow().bold(),
            LogTag::Position => self.as_str().cyan().bold(),
            LogTag::Price => self.as_str().bright_cyan().bold(),
            LogTag::Rpc => self.as_str().bright_green().bold(),
            LogTag::Wallet => self.as_str().blue().bold(),
        }
    }
}

/// Write one log line: tag, action keyword, message
pub fn log(tag: LogTag, action: &str, message: &str) {
    let timestamp = Utc::now().format("%H:%M:%S").to_string();

    let action_colored = match action {
        "ERROR" => action.red().bold(),
        "WARN" => action.yellow().bold(),
        "SUCCESS" => action.green().bold(),
        _ => action.normal().bold(),
    };

    println!(
        "{} {} {} {}",
        tag.colored_label(),
        format!("[{}]", timestamp).dimmed(),
        action_colored,
        message
    );
    let _ = io::stdout().flush();
}

/// Startup banner
pub fn header(title: &str) {
    println!();
    println!(
        "{} {} {}",
        "🤖".green().bold(),
        "SniperBot".green().bold(),
        format!("- {}", title).bright_white().bold()
    );
    println!("{}", "─".repeat(50).dimmed());
    let _ = io::stdout().flush();
}

/// Key/value line for config echo at startup
pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {}",
        format!("{}:", key).dimmed(),
        value.bright_white().bold()
    );
    let _ = io::stdout().flush();
}
