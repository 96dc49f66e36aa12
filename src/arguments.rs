use once_cell::sync::Lazy;
use std::env;

/// Command-line arguments captured once at startup
pub static CMD_ARGS: Lazy<Vec<String>> = Lazy::new(|| env::args().collect());

fn has_flag(flag: &str) -> bool {
    CMD_ARGS.iter().any(|a| a == flag)
}

/// Check if debug sniper mode is enabled via command line args
pub fn is_debug_sniper_enabled() -> bool {
    has_flag("--debug-sniper")
}

/// Check if debug RPC mode is enabled via command line args
pub fn is_debug_rpc_enabled() -> bool {
    has_flag("--debug-rpc")
}

/// Check if debug swap mode is enabled via command line args
pub fn is_debug_swap_enabled() -> bool {
    has_flag("--debug-swap")
}

/// Check if debug positions mode is enabled via command line args
pub fn is_debug_positions_enabled() -> bool {
    has_flag("--debug-positions")
}
