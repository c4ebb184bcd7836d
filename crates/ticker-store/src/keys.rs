// crates/ticker-store/src/keys.rs
//
// Key layout shared by the store backends.
//
//   - `{ns}:last_epoch_checkpoint`                 -> decimal end height
//   - `{ns}:epoch_history:score:{score}:{begin}:{member}`  -> member JSON
//   - `{ns}:epoch_history:member:{member}`                 -> decimal timestamp
//
// `score` is the emission timestamp and `begin` the epoch's first block, both
// fixed-width hex so that lexicographic key order equals numeric order. A
// forward prefix scan is oldest-first, and epochs emitted within the same
// second order by height.

use ticker_core::{Epoch, TickerError};

/// Builds the namespaced keys for one deployment.
#[derive(Debug, Clone)]
pub struct StoreKeys {
    namespace: String,
}

impl StoreKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn checkpoint(&self) -> Vec<u8> {
        format!("{}:last_epoch_checkpoint", self.namespace).into_bytes()
    }

    /// Prefix of every score-ordered history key.
    pub fn history_score_prefix(&self) -> Vec<u8> {
        format!("{}:epoch_history:score:", self.namespace).into_bytes()
    }

    /// Smallest key strictly greater than every score-ordered history key.
    pub fn history_score_upper_bound(&self) -> Vec<u8> {
        // ';' is the byte after ':'.
        format!("{}:epoch_history:score;", self.namespace).into_bytes()
    }

    pub fn history_score(&self, timestamp: i64, begin: u64, member: &str) -> Vec<u8> {
        format!(
            "{}:epoch_history:score:{}:{:016x}:{}",
            self.namespace,
            encode_score(timestamp),
            begin,
            member
        )
        .into_bytes()
    }

    pub fn history_member(&self, member: &str) -> Vec<u8> {
        format!("{}:epoch_history:member:{}", self.namespace, member).into_bytes()
    }
}

/// Serialize an epoch into its history member form `{"begin":..,"end":..}`.
pub fn encode_member(epoch: &Epoch) -> Result<String, TickerError> {
    Ok(serde_json::to_string(epoch)?)
}

pub fn decode_member(bytes: &[u8]) -> Result<Epoch, TickerError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Fixed-width hex with the sign bit flipped, so negative timestamps sort first.
fn encode_score(timestamp: i64) -> String {
    format!("{:016x}", (timestamp as u64) ^ (1u64 << 63))
}

/// Inverse of `encode_score`, reading the score segment out of a full key.
pub fn decode_score(key: &[u8], prefix: &[u8]) -> Result<i64, TickerError> {
    let rest = key
        .get(prefix.len()..prefix.len() + 16)
        .ok_or_else(|| TickerError::Storage("Truncated history key".to_string()))?;
    let hex = std::str::from_utf8(rest)
        .map_err(|e| TickerError::Serialization(format!("Invalid history key: {}", e)))?;
    let raw = u64::from_str_radix(hex, 16)
        .map_err(|e| TickerError::Serialization(format!("Invalid history score: {}", e)))?;
    Ok((raw ^ (1u64 << 63)) as i64)
}
