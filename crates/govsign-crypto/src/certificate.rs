//! # Signer Certificates
//!
//! Read-only view over an X.509 certificate carried in a signature
//! envelope. The container verifier needs four facts from it: who signed
//! (subject DN), when the certificate is valid, which algorithm the key
//! is for, and the key bytes themselves.
//!
//! Certificate issuance proper is out of scope. [`issue_certificate`] and
//! [`issue_self_signed`] exist so tests and the CLI can produce real DER
//! certificates for Ed25519 keys without an external CA.

use std::str::FromStr;
use std::time::Duration;

use der::asn1::{BitString, GeneralizedTime, ObjectIdentifier};
use der::{Decode, Encode};
use govsign_core::{hex, sha256_digest, Digest, Timestamp};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

use crate::algorithm::SignatureAlgorithm;
use crate::ed25519::Ed25519KeyPair;
use crate::error::CryptoError;

/// Where a reference time falls relative to a certificate's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityStatus {
    Valid,
    NotYetValid,
    Expired,
}

/// Parsed signer certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerCertificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: Vec<u8>,
    not_before: Timestamp,
    not_after: Timestamp,
    key_algorithm_oid: String,
    public_key: Vec<u8>,
}

impl SignerCertificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let cert = Certificate::from_der(der).map_err(cert_err)?;
        let tbs = &cert.tbs_certificate;
        Ok(Self {
            der: der.to_vec(),
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial: tbs.serial_number.as_bytes().to_vec(),
            not_before: time_to_timestamp(&tbs.validity.not_before)?,
            not_after: time_to_timestamp(&tbs.validity.not_after)?,
            key_algorithm_oid: tbs.subject_public_key_info.algorithm.oid.to_string(),
            public_key: tbs.subject_public_key_info.subject_public_key.raw_bytes().to_vec(),
        })
    }

    /// The DER bytes this view was parsed from.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name (RFC 4514 form). This is the signer name
    /// shown in verification reports.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial)
    }

    pub fn not_before(&self) -> Timestamp {
        self.not_before
    }

    pub fn not_after(&self) -> Timestamp {
        self.not_after
    }

    /// SPKI algorithm OID in dotted form.
    pub fn key_algorithm_oid(&self) -> &str {
        &self.key_algorithm_oid
    }

    /// SPKI algorithm, if it is one this crate knows.
    pub fn key_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.key_algorithm_oid)
    }

    /// Raw subject public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// SHA-256 over the certificate DER.
    pub fn fingerprint(&self) -> Digest {
        sha256_digest(&self.der)
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Validity at `at`. Both bounds are inclusive (RFC 5280 §4.1.2.5).
    pub fn validity_at(&self, at: Timestamp) -> ValidityStatus {
        if at < self.not_before {
            ValidityStatus::NotYetValid
        } else if at > self.not_after {
            ValidityStatus::Expired
        } else {
            ValidityStatus::Valid
        }
    }
}

impl std::fmt::Debug for SignerCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerCertificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial_hex())
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("key_algorithm", &self.key_algorithm_oid)
            .finish()
    }
}

/// Issue a certificate for `subject_public_key`, signed by an Ed25519 issuer.
///
/// Names are RFC 4514 strings such as `CN=Alice,O=Ministry of Finance`.
pub fn issue_certificate(
    issuer_key: &Ed25519KeyPair,
    issuer_name: &str,
    subject_name: &str,
    subject_algorithm: SignatureAlgorithm,
    subject_public_key: &[u8],
    not_before: Timestamp,
    not_after: Timestamp,
) -> Result<Vec<u8>, CryptoError> {
    let signature_algorithm = algorithm_identifier(SignatureAlgorithm::Ed25519)?;

    let mut serial_seed = subject_public_key.to_vec();
    serial_seed.extend_from_slice(&not_before.epoch_secs().to_be_bytes());
    let mut serial = sha256_digest(&serial_seed).as_bytes()[..16].to_vec();
    // Positive and minimally encoded.
    serial[0] = (serial[0] & 0x3f) | 0x40;

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&serial).map_err(cert_err)?,
        signature: signature_algorithm.clone(),
        issuer: Name::from_str(issuer_name).map_err(cert_err)?,
        validity: Validity {
            not_before: timestamp_to_time(not_before)?,
            not_after: timestamp_to_time(not_after)?,
        },
        subject: Name::from_str(subject_name).map_err(cert_err)?,
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: algorithm_identifier(subject_algorithm)?,
            subject_public_key: BitString::from_bytes(subject_public_key).map_err(cert_err)?,
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let tbs_der = tbs.to_der().map_err(cert_err)?;
    let signature = issuer_key.sign(&tbs_der);
    let cert = Certificate {
        tbs_certificate: tbs,
        signature_algorithm,
        signature: BitString::from_bytes(signature.as_bytes()).map_err(cert_err)?,
    };
    cert.to_der().map_err(cert_err)
}

/// Issue a self-signed Ed25519 certificate for `key`.
pub fn issue_self_signed(
    key: &Ed25519KeyPair,
    subject_name: &str,
    not_before: Timestamp,
    not_after: Timestamp,
) -> Result<Vec<u8>, CryptoError> {
    issue_certificate(
        key,
        subject_name,
        subject_name,
        SignatureAlgorithm::Ed25519,
        key.public_key().as_bytes(),
        not_before,
        not_after,
    )
}

fn algorithm_identifier(alg: SignatureAlgorithm) -> Result<AlgorithmIdentifierOwned, CryptoError> {
    Ok(AlgorithmIdentifierOwned {
        oid: ObjectIdentifier::new(alg.oid()).map_err(|e| CryptoError::Certificate(e.to_string()))?,
        parameters: None,
    })
}

fn time_to_timestamp(time: &Time) -> Result<Timestamp, CryptoError> {
    let secs = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|_| CryptoError::Certificate("validity time out of range".to_string()))?;
    Timestamp::from_epoch_secs(secs).map_err(|e| CryptoError::Certificate(e.to_string()))
}

fn timestamp_to_time(ts: Timestamp) -> Result<Time, CryptoError> {
    let secs = u64::try_from(ts.epoch_secs())
        .map_err(|_| CryptoError::Certificate("validity time before 1970".to_string()))?;
    let gt = GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).map_err(cert_err)?;
    Ok(Time::GeneralTime(gt))
}

fn cert_err(err: der::Error) -> CryptoError {
    CryptoError::Certificate(err.to_string())
}
