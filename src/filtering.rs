/// Transaction relevance filtering
///
/// A detected signature is only worth trading on when the transaction
/// landed successfully and actually touched the PumpSwap/Pump.fun programs.
/// The check is a pure predicate: irrelevant records are dropped silently
/// by the caller, with no logging and no retry.
use crate::rpc::TransactionDetails;

/// Pump.fun bonding curve program
pub const PUMPFUN_PROGRAM: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// PumpSwap AMM program
pub const PUMPSWAP_AMM_PROGRAM: &str = "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA";

const WATCHED_PROGRAMS: [&str; 2] = [PUMPFUN_PROGRAM, PUMPSWAP_AMM_PROGRAM];

/// True when the transaction is one the sniper should act on.
pub fn is_relevant_transaction(details: &TransactionDetails) -> bool {
    if !details.succeeded() {
        return false;
    }

    details
        .account_keys()
        .iter()
        .any(|key| WATCHED_PROGRAMS.contains(&key.as_str()))
}

/// Band membership check for quoted price impact. Shared by the buy path
/// (which rejects out-of-band quotes before signing) and its tests.
pub fn impact_within_band(impact_pct: f64, min_pct: f64, max_pct: f64) -> bool {
    impact_pct >= min_pct && impact_pct <= max_pct
}
