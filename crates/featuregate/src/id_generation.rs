//! Hash-based identifier generation for features and dependency edges.
//!
//! IDs have the form `{prefix}-{hash}` where `hash` is a base36 encoding of a
//! SHA-256 digest over the record content, the current time and a nonce.
//! The hash grows from 4 to 6 characters as the store grows, and collisions
//! are retried with the next nonce.
//!
//! # Example
//!
//! ```
//! use featuregate::id_generation::{IdGenerator, IdGeneratorConfig};
//!
//! let mut generator = IdGenerator::new(IdGeneratorConfig {
//!     prefix: "flag".to_string(),
//!     store_size: 10,
//! });
//!
//! let id = generator.generate(&["dark-mode", "premium"]).unwrap();
//! assert!(id.starts_with("flag-"));
//! ```

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MIN_HASH_LENGTH: usize = 4;
const MAX_HASH_LENGTH: usize = 6;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Every nonce collided, even at the maximum hash length
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried
        attempts: u32,
    },

    /// Requested a zero-length hash
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Configuration for ID generation
#[derive(Debug, Clone)]
pub struct IdGeneratorConfig {
    /// Prefix for all IDs (e.g., "flag")
    pub prefix: String,

    /// Number of records currently in the store (drives the hash length)
    pub store_size: usize,
}

/// Hash-based ID generator with collision detection
#[derive(Debug)]
pub struct IdGenerator {
    config: IdGeneratorConfig,
    existing_ids: HashSet<String>,
}

impl IdGenerator {
    /// Create a new ID generator with the given configuration
    pub fn new(config: IdGeneratorConfig) -> Self {
        Self {
            config,
            existing_ids: HashSet::new(),
        }
    }

    /// The prefix this generator stamps on every ID
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Store size the generator was configured with
    pub fn store_size(&self) -> usize {
        self.config.store_size
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: String) {
        self.existing_ids.insert(id);
    }

    /// Forget a previously issued ID (after its record was deleted)
    pub fn release_id(&mut self, id: &str) {
        self.existing_ids.remove(id);
    }

    /// Generate a new unique ID seeded by `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`IdGenerationError::CollisionExhausted`] when every nonce
    /// collides at the longest hash length.
    pub fn generate(&mut self, parts: &[&str]) -> Result<String, IdGenerationError> {
        let mut length = self.adaptive_length();

        while length <= MAX_HASH_LENGTH {
            for nonce in 0..MAX_NONCE {
                let id = self.hash_id(parts, nonce, length)?;
                if self.existing_ids.insert(id.clone()) {
                    if nonce > 0 {
                        debug!(nonce, length, "Generated unique ID after collision retries");
                    }
                    return Ok(id);
                }
            }

            warn!(
                length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing ID length"
            );
            length += 1;
        }

        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_NONCE,
        })
    }

    fn hash_id(&self, parts: &[&str], nonce: u32, length: usize) -> Result<String, IdGenerationError> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(timestamp.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        let digest = hasher.finalize();

        let hash = encode_base36(&digest[..8], length)?;
        Ok(format!("{}-{}", self.config.prefix, hash))
    }

    /// Hash length for the current store size
    ///
    /// - 0-500 records: 4 chars
    /// - 501-1,500: 5 chars
    /// - 1,501+: 6 chars
    fn adaptive_length(&self) -> usize {
        match self.config.store_size {
            0..=500 => MIN_HASH_LENGTH,
            501..=1500 => 5,
            _ => MAX_HASH_LENGTH,
        }
    }
}

/// Encode up to 8 bytes as a fixed-length base36 string.
///
/// Bytes are folded into a `u64` with wrapping arithmetic, so the output is
/// deterministic for a given input.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut n = bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_shl(8).wrapping_add(u64::from(b)));

    let mut out = vec![0u8; length];
    for slot in out.iter_mut().rev() {
        *slot = BASE36_CHARS[(n % 36) as usize];
        n /= 36;
    }

    Ok(out.into_iter().map(char::from).collect())
}
