//! # TimeStampReq
//!
//! ```text
//! TimeStampReq ::= SEQUENCE {
//!    version         INTEGER { v1(1) },
//!    messageImprint  MessageImprint,
//!    reqPolicy       TSAPolicyId     OPTIONAL,
//!    nonce           INTEGER         OPTIONAL,
//!    certReq         BOOLEAN         DEFAULT FALSE,
//!    extensions  [0] IMPLICIT Extensions OPTIONAL }
//!
//! MessageImprint ::= SEQUENCE {
//!    hashAlgorithm   AlgorithmIdentifier,
//!    hashedMessage   OCTET STRING }
//! ```
//!
//! The hash algorithm identifier is written as `SEQUENCE { OID, NULL }`,
//! the form most TSAs expect. Both forms (NULL present or absent) are
//! accepted on decode.

use govsign_core::{Digest, DigestAlgorithm};

use crate::asn1::{tag, Asn1Error, DerNode, Oid, Tlv};
use crate::error::TimestampError;

/// The digest a timestamp is requested over, with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageImprint {
    digest: Digest,
}

impl MessageImprint {
    pub fn new(digest: Digest) -> Self {
        Self { digest }
    }

    /// Hash `data` with `algorithm` and wrap the result.
    pub fn of(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        Self::new(algorithm.digest(data))
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.digest.algorithm()
    }

    /// Constant-time comparison with the imprint over `data`.
    pub fn covers(&self, data: &[u8]) -> bool {
        self.digest.matches(&self.algorithm().digest(data))
    }

    pub(crate) fn to_node(&self) -> Result<DerNode, Asn1Error> {
        Ok(DerNode::Sequence(vec![
            DerNode::Sequence(vec![DerNode::oid(self.algorithm().oid())?, DerNode::Null]),
            DerNode::OctetString(self.digest.as_bytes().to_vec()),
        ]))
    }

    pub(crate) fn from_tlv(tlv: Tlv<'_>) -> Result<Self, TimestampError> {
        let mut fields = tlv.expect(tag::SEQUENCE)?.children();
        let alg_id = fields.read_tag(tag::SEQUENCE)?;
        let mut alg_fields = alg_id.children();
        let oid = alg_fields.read_tag(tag::OBJECT_IDENTIFIER)?.as_oid()?;
        alg_fields.read_optional(tag::NULL)?;
        alg_fields.finish()?;
        let hashed = fields.read_tag(tag::OCTET_STRING)?.content();
        fields.finish()?;

        let algorithm = DigestAlgorithm::from_oid(&oid.to_string()).ok_or_else(|| {
            TimestampError::MalformedTimestampResponse(format!("unsupported imprint algorithm {oid}"))
        })?;
        let digest = Digest::from_bytes(algorithm, hashed.to_vec())
            .map_err(|e| TimestampError::MalformedTimestampResponse(e.to_string()))?;
        Ok(Self { digest })
    }
}

/// An RFC 3161 timestamp request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeStampReq {
    message_imprint: MessageImprint,
    req_policy: Option<Oid>,
    nonce: Option<u64>,
    cert_req: bool,
}

impl TimeStampReq {
    /// A v1 request with no policy, no nonce, and `certReq` false.
    pub fn new(digest: Digest) -> Self {
        Self {
            message_imprint: MessageImprint::new(digest),
            req_policy: None,
            nonce: None,
            cert_req: false,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Attach a fresh random nonce from the OS CSPRNG.
    pub fn with_random_nonce(self) -> Self {
        let nonce = rand_core::RngCore::next_u64(&mut rand_core::OsRng);
        self.with_nonce(nonce)
    }

    pub fn with_cert_req(mut self, cert_req: bool) -> Self {
        self.cert_req = cert_req;
        self
    }

    pub fn with_policy(mut self, policy: Oid) -> Self {
        self.req_policy = Some(policy);
        self
    }

    pub fn message_imprint(&self) -> &MessageImprint {
        &self.message_imprint
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn cert_req(&self) -> bool {
        self.cert_req
    }

    pub fn policy(&self) -> Option<&Oid> {
        self.req_policy.as_ref()
    }

    /// DER encoding, ready to POST as `application/timestamp-query`.
    pub fn to_der(&self) -> Result<Vec<u8>, TimestampError> {
        let mut fields = vec![
            DerNode::uint(1),
            self.message_imprint
                .to_node()
                .map_err(|e| TimestampError::InvalidRequest(e.to_string()))?,
        ];
        if let Some(policy) = &self.req_policy {
            fields.push(DerNode::Oid(policy.clone()));
        }
        if let Some(nonce) = self.nonce {
            fields.push(DerNode::uint(nonce));
        }
        // DEFAULT FALSE is omitted in DER.
        if self.cert_req {
            fields.push(DerNode::Boolean(true));
        }
        let der = DerNode::Sequence(fields).to_der();
        tracing::debug!(
            algorithm = %self.message_imprint.algorithm(),
            bytes = der.len(),
            nonce = self.nonce.is_some(),
            "encoded TimeStampReq"
        );
        Ok(der)
    }

    /// Decode a DER TimeStampReq. Extensions are not supported.
    pub fn from_der(der: &[u8]) -> Result<Self, TimestampError> {
        let invalid = |e: Asn1Error| TimestampError::InvalidRequest(e.to_string());
        let outer = Tlv::parse_exact(der)
            .and_then(|t| t.expect(tag::SEQUENCE))
            .map_err(invalid)?;
        let mut fields = outer.children();

        let version = fields
            .read_tag(tag::INTEGER)
            .and_then(|t| t.as_u64())
            .map_err(invalid)?;
        if version != 1 {
            return Err(TimestampError::InvalidRequest(format!(
                "unsupported version {version}"
            )));
        }
        let imprint_tlv = fields.read().map_err(invalid)?;
        let message_imprint = MessageImprint::from_tlv(imprint_tlv)
            .map_err(|e| TimestampError::InvalidRequest(e.to_string()))?;
        let req_policy = fields
            .read_optional(tag::OBJECT_IDENTIFIER)
            .and_then(|t| t.map(|t| t.as_oid()).transpose())
            .map_err(invalid)?;
        let nonce = fields
            .read_optional(tag::INTEGER)
            .and_then(|t| t.map(|t| t.as_u64()).transpose())
            .map_err(invalid)?;
        let cert_req = fields
            .read_optional(tag::BOOLEAN)
            .and_then(|t| t.map(|t| t.as_bool()).transpose())
            .map_err(invalid)?
            .unwrap_or(false);
        fields.finish().map_err(invalid)?;

        Ok(Self {
            message_imprint,
            req_policy,
            nonce,
            cert_req,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_sha256_request_layout() {
        let digest = DigestAlgorithm::Sha256.digest(b"ORIGINAL CONTRACT CONTENT");
        let der = TimeStampReq::new(digest.clone()).to_der().unwrap();

        let mut expected = vec![
            0x30, 0x36, // TimeStampReq
            0x02, 0x01, 0x01, // version 1
            0x30, 0x31, // messageImprint
            0x30, 0x0d, // AlgorithmIdentifier
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00,
            0x04, 0x20, // hashedMessage
        ];
        expected.extend_from_slice(digest.as_bytes());
        assert_eq!(der, expected);
    }

    #[test]
    fn lengths_follow_digest_size() {
        for (alg, outer, octet) in [
            (DigestAlgorithm::Sha256, 0x36, 0x20),
            (DigestAlgorithm::Sha384, 0x46, 0x30),
            (DigestAlgorithm::Sha512, 0x56, 0x40),
        ] {
            let der = TimeStampReq::new(alg.digest(b"x")).to_der().unwrap();
            assert_eq!(der[1], outer, "{alg}");
            assert_eq!(der[22], 0x04);
            assert_eq!(der[23], octet, "{alg}");
            assert_eq!(der.len(), 2 + outer as usize);
        }
    }

    #[test]
    fn optional_fields_roundtrip() {
        let policy = Oid::parse("1.3.6.1.4.1.601.10.3.1").unwrap();
        let req = TimeStampReq::new(DigestAlgorithm::Sha384.digest(b"sig"))
            .with_policy(policy.clone())
            .with_nonce(0x8000_0000_0000_0001)
            .with_cert_req(true);
        let der = req.to_der().unwrap();
        assert_eq!(&der[der.len() - 3..], &[0x01, 0x01, 0xff]);

        let back = TimeStampReq::from_der(&der).unwrap();
        assert_eq!(back, req);
        assert_eq!(back.policy(), Some(&policy));
        assert_eq!(back.nonce(), Some(0x8000_0000_0000_0001));
        assert!(back.cert_req());
    }

    #[test]
    fn random_nonces_differ() {
        let d = DigestAlgorithm::Sha256.digest(b"x");
        let a = TimeStampReq::new(d.clone()).with_random_nonce();
        let b = TimeStampReq::new(d).with_random_nonce();
        assert!(a.nonce().is_some());
        assert_ne!(a.nonce(), b.nonce());
    }

    #[test]
    fn decode_accepts_absent_null_parameters() {
        let digest = DigestAlgorithm::Sha256.digest(b"y");
        let der = DerNode::Sequence(vec![
            DerNode::uint(1),
            DerNode::Sequence(vec![
                DerNode::Sequence(vec![DerNode::oid("2.16.840.1.101.3.4.2.1").unwrap()]),
                DerNode::OctetString(digest.as_bytes().to_vec()),
            ]),
        ])
        .to_der();
        let req = TimeStampReq::from_der(&der).unwrap();
        assert_eq!(req.message_imprint().digest(), &digest);
    }

    #[test]
    fn decode_rejects_wrong_version_and_bad_imprint() {
        let digest = DigestAlgorithm::Sha256.digest(b"y");
        let mut der = TimeStampReq::new(digest).to_der().unwrap();
        der[4] = 2;
        assert!(matches!(
            TimeStampReq::from_der(&der),
            Err(TimestampError::InvalidRequest(_))
        ));

        // 31-byte hash under a SHA-256 identifier.
        let short = DerNode::Sequence(vec![
            DerNode::uint(1),
            DerNode::Sequence(vec![
                DerNode::Sequence(vec![
                    DerNode::oid("2.16.840.1.101.3.4.2.1").unwrap(),
                    DerNode::Null,
                ]),
                DerNode::OctetString(vec![0; 31]),
            ]),
        ])
        .to_der();
        assert!(TimeStampReq::from_der(&short).is_err());
    }

    #[test]
    fn imprint_covers_its_input() {
        let imprint = MessageImprint::of(DigestAlgorithm::Sha512, b"signature bytes");
        assert!(imprint.covers(b"signature bytes"));
        assert!(!imprint.covers(b"other bytes"));
    }
}
