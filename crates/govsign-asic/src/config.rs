//! Signing-flow configuration.

use std::time::Duration;

use govsign_core::DigestAlgorithm;

use crate::envelope::TimestampScope;

/// Deadlines and hashing choices for [`ContainerSigner`](crate::ContainerSigner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Algorithm for the document digest (and the timestamp imprint).
    pub digest_algorithm: DigestAlgorithm,
    /// Deadline for the external sign call.
    pub sign_timeout: Duration,
    /// Deadline for the TSA round trip.
    pub timestamp_timeout: Duration,
    pub timestamp_scope: TimestampScope,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            digest_algorithm: DigestAlgorithm::Sha256,
            sign_timeout: Duration::from_millis(10_000),
            timestamp_timeout: Duration::from_millis(30_000),
            timestamp_scope: TimestampScope::Signature,
        }
    }
}

impl SigningConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Variables:
    /// - `GOVSIGN_DIGEST` (default: `sha256`)
    /// - `GOVSIGN_SIGN_TIMEOUT_MS` (default: 10000)
    /// - `GOVSIGN_TIMESTAMP_TIMEOUT_MS` (default: 30000)
    /// - `GOVSIGN_TIMESTAMP_SCOPE`: `signature` or `content` (default: `signature`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            digest_algorithm: env_parse("GOVSIGN_DIGEST", defaults.digest_algorithm)?,
            sign_timeout: Duration::from_millis(env_parse(
                "GOVSIGN_SIGN_TIMEOUT_MS",
                defaults.sign_timeout.as_millis() as u64,
            )?),
            timestamp_timeout: Duration::from_millis(env_parse(
                "GOVSIGN_TIMESTAMP_TIMEOUT_MS",
                defaults.timestamp_timeout.as_millis() as u64,
            )?),
            timestamp_scope: env_parse("GOVSIGN_TIMESTAMP_SCOPE", defaults.timestamp_scope)?,
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
