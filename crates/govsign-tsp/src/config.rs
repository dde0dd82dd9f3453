//! TSA client configuration.
//!
//! Loaded from the environment or built explicitly for tests. The custom
//! `Debug` implementation redacts the password.

use std::time::Duration;

use govsign_core::DigestAlgorithm;
use url::Url;
use zeroize::Zeroizing;

/// Connection settings for an RFC 3161 Time-Stamp Authority.
#[derive(Clone)]
pub struct TsaConfig {
    /// TSA endpoint that accepts `application/timestamp-query` POSTs.
    pub url: Url,
    /// HTTP basic-auth user, if the TSA requires one.
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Hash algorithm for message imprints.
    pub hash_algorithm: DigestAlgorithm,
    /// Ask the TSA to include its certificate in the token.
    pub cert_req: bool,
}

impl std::fmt::Debug for TsaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsaConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("cert_req", &self.cert_req)
            .finish()
    }
}

impl TsaConfig {
    /// Defaults for a TSA at `url`: no auth, 30 s timeout, SHA-256, certReq.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            username: None,
            password: None,
            timeout_secs: 30,
            hash_algorithm: DigestAlgorithm::Sha256,
            cert_req: true,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GOVSIGN_TSA_URL` (required)
    /// - `GOVSIGN_TSA_USERNAME`, `GOVSIGN_TSA_PASSWORD` (optional, basic auth)
    /// - `GOVSIGN_TSA_TIMEOUT_SECS` (default: 30)
    /// - `GOVSIGN_TSA_HASH` (default: `sha256`)
    /// - `GOVSIGN_TSA_CERT_REQ` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("GOVSIGN_TSA_URL").map_err(|_| ConfigError::MissingUrl)?;
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("GOVSIGN_TSA_URL".to_string(), e.to_string()))?;

        let hash_algorithm = match std::env::var("GOVSIGN_TSA_HASH") {
            Ok(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GOVSIGN_TSA_HASH".to_string(), s))?,
            Err(_) => DigestAlgorithm::Sha256,
        };
        let cert_req = match std::env::var("GOVSIGN_TSA_CERT_REQ") {
            Ok(s) => parse_bool(&s)
                .ok_or_else(|| ConfigError::InvalidValue("GOVSIGN_TSA_CERT_REQ".to_string(), s))?,
            Err(_) => true,
        };

        Ok(Self {
            url,
            username: std::env::var("GOVSIGN_TSA_USERNAME").ok(),
            password: std::env::var("GOVSIGN_TSA_PASSWORD").ok().map(Zeroizing::new),
            timeout_secs: std::env::var("GOVSIGN_TSA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            hash_algorithm,
            cert_req,
        })
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(Zeroizing::new(password.to_string()));
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("GOVSIGN_TSA_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
