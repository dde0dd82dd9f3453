//! # Timestamp Authority Client
//!
//! The `request_timestamp` capability. [`TimestampAuthority`] is the seam
//! the signing flow depends on; [`HttpTsaClient`] speaks RFC 3161 over
//! HTTP and [`StubTimestampAuthority`](crate::StubTimestampAuthority)
//! answers in-process for tests and offline use.

use std::future::Future;
use std::pin::Pin;

use crate::config::TsaConfig;
use crate::error::TimestampError;
use crate::request::TimeStampReq;
use crate::response::{TimeStampResp, TimestampToken};
use crate::retry::RetryPolicy;

/// `Content-Type` of an RFC 3161 request body.
pub const CONTENT_TYPE_QUERY: &str = "application/timestamp-query";
/// `Content-Type` of an RFC 3161 response body.
pub const CONTENT_TYPE_REPLY: &str = "application/timestamp-reply";

/// Boxed future returned by [`TimestampAuthority`] methods.
pub type TsaFuture<'a> = Pin<Box<dyn Future<Output = Result<TimeStampResp, TimestampError>> + Send + 'a>>;

/// A source of RFC 3161 timestamp responses.
///
/// Object-safe so the signing flow can hold an `Arc<dyn TimestampAuthority>`.
pub trait TimestampAuthority: Send + Sync {
    /// Submit `request` and return the decoded response.
    fn timestamp<'a>(&'a self, request: &'a TimeStampReq) -> TsaFuture<'a>;

    /// Name used in diagnostics.
    fn authority_name(&self) -> &str;
}

/// Submit `request` and return the token of a granted response.
///
/// Checks that the token's TSTInfo, when readable, echoes the request's
/// message imprint and nonce.
pub async fn request_token(
    authority: &dyn TimestampAuthority,
    request: &TimeStampReq,
) -> Result<TimestampToken, TimestampError> {
    let token = authority.timestamp(request).await?.into_token()?;
    if let Some(info) = token.tst_info() {
        if info.message_imprint != *request.message_imprint() {
            return Err(TimestampError::MalformedTimestampResponse(
                "token message imprint does not match the request".to_string(),
            ));
        }
        if request.nonce().is_some() && info.nonce != request.nonce() {
            return Err(TimestampError::MalformedTimestampResponse(
                "token nonce does not match the request".to_string(),
            ));
        }
    }
    Ok(token)
}

/// RFC 3161 over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTsaClient {
    http: reqwest::Client,
    config: TsaConfig,
}

impl HttpTsaClient {
    pub fn new(config: TsaConfig) -> Result<Self, TimestampError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TimestampError::Transport {
                endpoint: "client_init".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TsaConfig {
        &self.config
    }

    /// Build a request for `data` using the configured hash and certReq,
    /// with a random nonce.
    pub fn build_request(&self, data: &[u8]) -> TimeStampReq {
        TimeStampReq::new(self.config.hash_algorithm.digest(data))
            .with_cert_req(self.config.cert_req)
            .with_random_nonce()
    }

    async fn post(&self, request: &TimeStampReq) -> Result<TimeStampResp, TimestampError> {
        let body = request.to_der()?;
        let endpoint = self.config.url.as_str();
        RetryPolicy::default()
            .run(endpoint, || self.exchange(endpoint, &body))
            .await
    }

    /// One POST of `body` and the decoded reply.
    async fn exchange(&self, endpoint: &str, body: &[u8]) -> Result<TimeStampResp, TimestampError> {
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                TimestampError::Timeout(self.config.timeout())
            } else {
                TimestampError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let mut req = self
            .http
            .post(self.config.url.clone())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_QUERY)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE_REPLY)
            .body(body.to_vec());
        if let Some(user) = &self.config.username {
            req = req.basic_auth(user, self.config.password.as_ref().map(|p| p.as_str()));
        }
        let resp = req.send().await.map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TimestampError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref() {
            if !ct.starts_with(CONTENT_TYPE_REPLY) {
                tracing::warn!(content_type = ct, "TSA reply has unexpected content type");
            }
        }
        let bytes = resp.bytes().await.map_err(transport)?;
        tracing::info!(endpoint, bytes = bytes.len(), "received TSA reply");
        TimeStampResp::decode(&bytes)
    }
}

impl TimestampAuthority for HttpTsaClient {
    fn timestamp<'a>(&'a self, request: &'a TimeStampReq) -> TsaFuture<'a> {
        Box::pin(self.post(request))
    }

    fn authority_name(&self) -> &str {
        self.config.url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubTimestampAuthority;
    use govsign_core::DigestAlgorithm;

    #[tokio::test]
    async fn request_token_from_stub() {
        let tsa = StubTimestampAuthority::new();
        let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"sig")).with_nonce(42);
        let token = request_token(&tsa, &req).await.unwrap();
        let info = token.tst_info().unwrap();
        assert_eq!(info.nonce, Some(42));
        assert!(info.message_imprint.covers(b"sig"));
    }

    #[tokio::test]
    async fn request_token_surfaces_rejection() {
        let tsa = StubTimestampAuthority::rejecting("policy not accepted");
        let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"sig"));
        assert!(matches!(
            request_token(&tsa, &req).await,
            Err(TimestampError::Rejected { .. })
        ));
    }

    #[test]
    fn build_request_uses_config() {
        let cfg = TsaConfig {
            hash_algorithm: DigestAlgorithm::Sha512,
            cert_req: false,
            ..TsaConfig::new(url::Url::parse("http://127.0.0.1:9/").unwrap())
        };
        let client = HttpTsaClient::new(cfg).unwrap();
        let req = client.build_request(b"payload");
        assert_eq!(req.message_imprint().algorithm(), DigestAlgorithm::Sha512);
        assert!(!req.cert_req());
        assert!(req.nonce().is_some());
        assert_eq!(client.authority_name(), "http://127.0.0.1:9/");
    }
}
