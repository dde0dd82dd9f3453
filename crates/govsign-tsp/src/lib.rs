//! # govsign-tsp: RFC 3161 Time-Stamp Protocol
//!
//! The TimestampCodec and the `request_timestamp` capability:
//!
//! - **ASN.1** ([`asn1`]): a typed DER builder and a bounds-checked reader.
//!   Lengths are computed from content, never patched in place.
//! - **Request** ([`request`]): `TimeStampReq` with message imprint, nonce,
//!   certReq, and requested policy.
//! - **Response** ([`response`]): `TimeStampResp` decoding, PKIStatus
//!   handling, and token extraction with TSTInfo inspection.
//! - **Client** ([`client`]): the [`TimestampAuthority`] seam and an HTTP
//!   implementation with retry and timeout.
//! - **Stub** ([`stub`]): an in-process authority for tests and offline use.
//!
//! ## Security Invariant
//!
//! A token is surfaced only from a response whose PKIStatus is granted.
//! Any response whose declared outer length disagrees with the bytes
//! received is rejected before field decoding begins.

pub mod asn1;
pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub(crate) mod retry;
pub mod stub;

pub use asn1::{Asn1Error, DerNode, Oid};
pub use client::{
    request_token, HttpTsaClient, TimestampAuthority, TsaFuture, CONTENT_TYPE_QUERY,
    CONTENT_TYPE_REPLY,
};
pub use config::{ConfigError, TsaConfig};
pub use error::TimestampError;
pub use request::{MessageImprint, TimeStampReq};
pub use response::{PkiStatus, TimeStampResp, TimestampToken, TstInfo};
pub use stub::{stub_token, StubTimestampAuthority, STUB_POLICY};
