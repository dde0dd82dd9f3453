//! Contract tests for HttpTsaClient against a simulated RFC 3161 endpoint.
//!
//! The mock TSA answers with bytes produced by `StubTimestampAuthority`,
//! so the client is exercised end to end over real HTTP: request headers,
//! body encoding, status handling, and response decoding.

use govsign_core::{DigestAlgorithm, Timestamp};
use govsign_tsp::{
    request_token, HttpTsaClient, PkiStatus, StubTimestampAuthority, TimeStampReq,
    TimestampAuthority, TimestampError, TsaConfig, CONTENT_TYPE_QUERY, CONTENT_TYPE_REPLY,
};
use wiremock::matchers::{basic_auth, body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> HttpTsaClient {
    let mut config = TsaConfig::new(format!("{}/tsa", mock_server.uri()).parse().unwrap());
    config.timeout_secs = 1;
    HttpTsaClient::new(config).unwrap()
}

fn reply(body: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", CONTENT_TYPE_REPLY)
        .set_body_bytes(body)
}

#[tokio::test]
async fn granted_reply_yields_token() {
    let mock_server = MockServer::start().await;
    let at = Timestamp::parse("2026-04-10T08:00:00Z").unwrap();
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"signature bytes"));
    let der = req.to_der().unwrap();
    let body = StubTimestampAuthority::new().with_clock(at).respond(&der);

    Mock::given(method("POST"))
        .and(path("/tsa"))
        .and(header("content-type", CONTENT_TYPE_QUERY))
        .and(body_bytes(der))
        .respond_with(reply(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let token = request_token(&client, &req).await.unwrap();
    let info = token.tst_info().unwrap();
    assert_eq!(info.gen_time, at);
    assert!(info.message_imprint.covers(b"signature bytes"));
}

#[tokio::test]
async fn sends_basic_auth_when_configured() {
    let mock_server = MockServer::start().await;
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    let body = StubTimestampAuthority::new().respond(&req.to_der().unwrap());

    Mock::given(method("POST"))
        .and(basic_auth("registry", "s3cret"))
        .respond_with(reply(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TsaConfig::new(mock_server.uri().parse().unwrap()).with_basic_auth("registry", "s3cret");
    let client = HttpTsaClient::new(config).unwrap();
    let resp = client.timestamp(&req).await.unwrap();
    assert_eq!(resp.status(), PkiStatus::Granted);
}

#[tokio::test]
async fn rejection_status_is_surfaced() {
    let mock_server = MockServer::start().await;
    let body = StubTimestampAuthority::rejecting("unaccepted policy").respond(&[]);

    Mock::given(method("POST"))
        .respond_with(reply(body))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    match request_token(&client, &req).await {
        Err(TimestampError::Rejected { status, text }) => {
            assert_eq!(status, PkiStatus::Rejection);
            assert_eq!(text, "unaccepted policy");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_is_final() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    let err = client.timestamp(&req).await.unwrap_err();
    assert!(matches!(err, TimestampError::HttpStatus { status: 500, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn truncated_reply_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(reply(vec![0x30, 0x05, 0x02]))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    assert!(matches!(
        client.timestamp(&req).await,
        Err(TimestampError::TruncatedResponse { .. })
    ));
}

#[tokio::test]
async fn non_der_reply_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(reply(b"<html>gateway</html>".to_vec()))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    assert!(matches!(
        client.timestamp(&req).await,
        Err(TimestampError::MalformedTimestampResponse(_))
    ));
}

#[tokio::test]
async fn token_for_another_imprint_is_refused() {
    let mock_server = MockServer::start().await;
    let other = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"something else"));
    let body = StubTimestampAuthority::new().respond(&other.to_der().unwrap());

    Mock::given(method("POST"))
        .respond_with(reply(body))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    assert!(matches!(
        request_token(&client, &req).await,
        Err(TimestampError::MalformedTimestampResponse(_))
    ));
}

#[tokio::test]
async fn unreachable_endpoint_is_retried_then_reported() {
    let mut config = TsaConfig::new("http://127.0.0.1:1/tsa".parse().unwrap());
    config.timeout_secs = 1;
    let client = HttpTsaClient::new(config).unwrap();
    let req = TimeStampReq::new(DigestAlgorithm::Sha256.digest(b"x"));
    let err = client.timestamp(&req).await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
}
