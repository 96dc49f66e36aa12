/// Ledger change detection for the tracked mint
///
/// The detector owns the `last_signature` watermark. The first cycle seeds
/// it from the single most-recent signature so history is never replayed;
/// every later cycle fetches the signatures strictly after the watermark
/// and hands them to the caller oldest-first. The watermark only advances
/// through `commit_watermark`, which the controller calls after a batch has
/// been dispatched downstream, and it never rolls back.
use std::sync::Arc;

use crate::arguments::is_debug_sniper_enabled;
use crate::logger::{log, LogTag};
use crate::rpc::LedgerClient;
use crate::utils::safe_truncate;

/// One ledger event worth considering, oldest-first within a batch
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
}

pub struct SignatureDetector {
    ledger: Arc<dyn LedgerClient>,
    address: String,
    last_signature: Option<String>,
}

impl SignatureDetector {
    pub fn new(ledger: Arc<dyn LedgerClient>, address: String) -> Self {
        Self {
            ledger,
            address,
            last_signature: None,
        }
    }

    pub fn watermark(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    /// Seed the watermark from the most recent signature without replaying
    /// history. An empty history leaves the watermark unset; the next poll
    /// retries the seed.
    pub async fn seed(&mut self) -> Result<(), String> {
        let signatures = self
            .ledger
            .get_signatures_for_address(&self.address, Some(1), None)
            .await?;

        if let Some(newest) = signatures.first() {
            log(
                LogTag::Detector,
                "SEED",
                &format!(
                    "📌 Watermark seeded at {}",
                    safe_truncate(&newest.signature, 16)
                ),
            );
            self.last_signature = Some(newest.signature.clone());
        } else if is_debug_sniper_enabled() {
            log(LogTag::Detector, "SEED", "No history yet for tracked address");
        }

        Ok(())
    }

    /// Fetch the activity since the watermark, oldest-first. With no
    /// watermark set this performs the seed instead and returns an empty
    /// batch.
    pub async fn poll(&mut self) -> Result<Vec<ActivityRecord>, String> {
        let until = match self.last_signature.as_deref() {
            Some(sig) => sig.to_string(),
            None => {
                self.seed().await?;
                return Ok(Vec::new());
            }
        };

        // Newest-first from the ledger
        let signatures = self
            .ledger
            .get_signatures_for_address(&self.address, None, Some(&until))
            .await?;

        if signatures.is_empty() {
            return Ok(Vec::new());
        }

        if is_debug_sniper_enabled() {
            log(
                LogTag::Detector,
                "POLL",
                &format!("🔍 {} new signature(s) since watermark", signatures.len()),
            );
        }

        let batch = signatures
            .into_iter()
            .rev()
            .map(|info| ActivityRecord {
                signature: info.signature,
                slot: info.slot,
                block_time: info.block_time,
            })
            .collect();

        Ok(batch)
    }

    /// Advance the watermark after a batch has been dispatched downstream.
    pub fn commit_watermark(&mut self, newest_signature: &str) {
        self.last_signature = Some(newest_signature.to_string());
    }
}
