//! # Stub Timestamp Authority
//!
//! An in-process TSA for tests, demos, and offline signing. It answers a
//! DER TimeStampReq with a structurally valid TimeStampResp: PKIStatus,
//! then a CMS ContentInfo / SignedData whose encapsulated TSTInfo echoes
//! the request's imprint and nonce. `signerInfos` is empty, so the token
//! carries no TSA signature and proves nothing about time to a third
//! party.

use std::sync::atomic::{AtomicU64, Ordering};

use govsign_core::Timestamp;

use crate::asn1::{Asn1Error, DerNode, Oid};
use crate::client::{TimestampAuthority, TsaFuture};
use crate::error::TimestampError;
use crate::request::TimeStampReq;
use crate::response::{TimeStampResp, OID_SIGNED_DATA, OID_TST_INFO};

/// Policy OID placed in stub tokens (under the `2.999` example arc).
pub const STUB_POLICY: &str = "2.999.3161.1";

#[derive(Debug, Clone)]
enum StubMode {
    Grant,
    Reject(String),
    Reply(Vec<u8>),
}

/// In-process TSA.
#[derive(Debug)]
pub struct StubTimestampAuthority {
    mode: StubMode,
    clock: Option<Timestamp>,
    serial: AtomicU64,
}

impl StubTimestampAuthority {
    /// Grants every well-formed request, stamping the current time.
    pub fn new() -> Self {
        Self {
            mode: StubMode::Grant,
            clock: None,
            serial: AtomicU64::new(1),
        }
    }

    /// Answers every request with PKIStatus `rejection`.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            mode: StubMode::Reject(reason.to_string()),
            ..Self::new()
        }
    }

    /// Answers every request with `bytes`, verbatim.
    pub fn replying_with(bytes: Vec<u8>) -> Self {
        Self {
            mode: StubMode::Reply(bytes),
            ..Self::new()
        }
    }

    /// Stamp `at` instead of the current time.
    pub fn with_clock(mut self, at: Timestamp) -> Self {
        self.clock = Some(at);
        self
    }

    /// Handle a DER TimeStampReq and return the DER TimeStampResp bytes.
    pub fn respond(&self, request_der: &[u8]) -> Vec<u8> {
        match &self.mode {
            StubMode::Reply(bytes) => bytes.clone(),
            StubMode::Reject(reason) => rejection(reason),
            StubMode::Grant => match TimeStampReq::from_der(request_der) {
                Ok(request) => self.grant(&request).unwrap_or_else(|e| rejection(&e.to_string())),
                Err(e) => rejection(&e.to_string()),
            },
        }
    }

    fn grant(&self, request: &TimeStampReq) -> Result<Vec<u8>, Asn1Error> {
        let serial = self.serial.fetch_add(1, Ordering::Relaxed);
        let gen_time = self.clock.unwrap_or_else(Timestamp::now);

        let mut tst_fields = vec![
            DerNode::uint(1),
            DerNode::Oid(Oid::parse(STUB_POLICY)?),
            request.message_imprint().to_node()?,
            DerNode::uint(serial),
            DerNode::GeneralizedTime(gen_time.to_generalized_time()),
        ];
        if let Some(nonce) = request.nonce() {
            tst_fields.push(DerNode::uint(nonce));
        }
        let tst_info = DerNode::Sequence(tst_fields).to_der();

        let algorithm = request.message_imprint().algorithm();
        let signed_data = DerNode::Sequence(vec![
            DerNode::uint(3),
            DerNode::Set(vec![DerNode::Sequence(vec![
                DerNode::oid(algorithm.oid())?,
                DerNode::Null,
            ])]),
            DerNode::Sequence(vec![
                DerNode::oid(OID_TST_INFO)?,
                DerNode::Explicit(0, Box::new(DerNode::OctetString(tst_info))),
            ]),
            DerNode::Set(Vec::new()),
        ]);
        let content_info = DerNode::Sequence(vec![
            DerNode::oid(OID_SIGNED_DATA)?,
            DerNode::Explicit(0, Box::new(signed_data)),
        ]);

        tracing::debug!(serial, gen_time = %gen_time, "stub TSA granted request");
        Ok(DerNode::Sequence(vec![
            DerNode::Sequence(vec![DerNode::uint(0)]),
            content_info,
        ])
        .to_der())
    }
}

impl Default for StubTimestampAuthority {
    fn default() -> Self {
        Self::new()
    }
}

fn rejection(reason: &str) -> Vec<u8> {
    DerNode::Sequence(vec![DerNode::Sequence(vec![
        DerNode::uint(2),
        DerNode::Sequence(vec![DerNode::Utf8String(reason.to_string())]),
    ])])
    .to_der()
}

impl TimestampAuthority for StubTimestampAuthority {
    fn timestamp<'a>(&'a self, request: &'a TimeStampReq) -> TsaFuture<'a> {
        Box::pin(async move {
            let der = request.to_der()?;
            let reply = self.respond(&der);
            TimeStampResp::decode(&reply)
        })
    }

    fn authority_name(&self) -> &str {
        "stub"
    }
}

/// Token bytes for `request` from a fresh stub authority stamping `at`.
pub fn stub_token(request: &TimeStampReq, at: Timestamp) -> Result<Vec<u8>, TimestampError> {
    let reply = StubTimestampAuthority::new()
        .with_clock(at)
        .respond(&request.to_der()?);
    Ok(TimeStampResp::decode(&reply)?.into_token()?.into_bytes())
}
