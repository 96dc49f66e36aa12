use chrono::DateTime;
use std::time::Duration;
use tokio::sync::Notify;

/// Waits for either shutdown signal or delay. Returns true if shutdown was triggered.
pub async fn check_shutdown_or_delay(shutdown: &Notify, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.notified() => true,
    }
}

/// Render a Unix block time as a clock time for log lines.
pub fn format_block_time(block_time: Option<i64>) -> String {
    block_time
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Truncate a string to at most `len` characters without panicking on
/// short input. Used to shorten mints and signatures in log lines.
pub fn safe_truncate(s: &str, len: usize) -> &str {
    if s.len() <= len {
        s
    } else {
        &s[..len]
    }
}
