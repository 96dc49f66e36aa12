use anyhow::{anyhow, Result};
use solana_sdk::signature::Keypair;

/// Load the trading wallet keypair from the configured private key.
///
/// Accepts either a base58 string or a JSON-style `[1,2,3,...]` byte array,
/// both of which must decode to the full 64-byte keypair.
pub fn load_keypair(private_key: &str) -> Result<Keypair> {
    let bytes = if private_key.starts_with('[') && private_key.ends_with(']') {
        // Handle array format like [1,2,3,4,...]
        let inner = private_key.trim_start_matches('[').trim_end_matches(']');
        inner
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| anyhow!("Failed to parse private key array: {}", e))?
    } else {
        // Handle base58 format
        bs58::decode(private_key)
            .into_vec()
            .map_err(|e| anyhow!("Failed to decode base58 private key: {}", e))?
    };

    if bytes.len() != 64 {
        return Err(anyhow!(
            "Invalid private key length: expected 64 bytes, got {}",
            bytes.len()
        ));
    }

    Keypair::try_from(&bytes[..]).map_err(|e| anyhow!("Failed to create keypair: {}", e))
}
