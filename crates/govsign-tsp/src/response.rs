//! # TimeStampResp and TimeStampToken
//!
//! ```text
//! TimeStampResp ::= SEQUENCE {
//!    status          PKIStatusInfo,
//!    timeStampToken  TimeStampToken OPTIONAL }
//!
//! PKIStatusInfo ::= SEQUENCE {
//!    status        PKIStatus,
//!    statusString  PKIFreeText OPTIONAL,
//!    failInfo      PKIFailureInfo OPTIONAL }
//! ```
//!
//! ## Outer envelope checks
//!
//! Both the response and the token stored in an envelope go through the
//! same gate before anything else is read:
//!
//! 1. Empty input, or a first octet other than `0x30`, is
//!    `MalformedTimestampResponse`.
//! 2. A declared outer length that differs from the number of bytes
//!    received is `TruncatedResponse`.
//!
//! The token's CMS signature and TSA certificate chain are not checked
//! here. [`TimestampToken::tst_info`] reads the TSTInfo fields on a
//! best-effort basis for reporting and imprint comparison.

use govsign_core::Timestamp;

use crate::asn1::{read_header, tag, Asn1Error, DerReader, Oid, Tlv};
use crate::error::TimestampError;
use crate::request::MessageImprint;

/// `id-signedData` (RFC 5652).
pub const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
/// `id-ct-TSTInfo` (RFC 3161).
pub const OID_TST_INFO: &str = "1.2.840.113549.1.9.16.1.4";

/// PKIStatus values (RFC 3161 §2.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkiStatus {
    Granted,
    GrantedWithMods,
    Rejection,
    Waiting,
    RevocationWarning,
    RevocationNotification,
    Other(u64),
}

impl PkiStatus {
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Self::Granted,
            1 => Self::GrantedWithMods,
            2 => Self::Rejection,
            3 => Self::Waiting,
            4 => Self::RevocationWarning,
            5 => Self::RevocationNotification,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u64 {
        match self {
            Self::Granted => 0,
            Self::GrantedWithMods => 1,
            Self::Rejection => 2,
            Self::Waiting => 3,
            Self::RevocationWarning => 4,
            Self::RevocationNotification => 5,
            Self::Other(code) => *code,
        }
    }

    /// Whether a token accompanies this status.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted | Self::GrantedWithMods)
    }
}

impl std::fmt::Display for PkiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => f.write_str("granted"),
            Self::GrantedWithMods => f.write_str("grantedWithMods"),
            Self::Rejection => f.write_str("rejection"),
            Self::Waiting => f.write_str("waiting"),
            Self::RevocationWarning => f.write_str("revocationWarning"),
            Self::RevocationNotification => f.write_str("revocationNotification"),
            Self::Other(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Apply the outer-envelope gate and return the top-level SEQUENCE.
fn outer_sequence(bytes: &[u8]) -> Result<Tlv<'_>, TimestampError> {
    match bytes.first() {
        None => {
            return Err(TimestampError::MalformedTimestampResponse(
                "empty response body".to_string(),
            ))
        }
        Some(&first) if first != tag::SEQUENCE => {
            return Err(TimestampError::MalformedTimestampResponse(format!(
                "expected DER SEQUENCE (0x30), found 0x{first:02x}"
            )))
        }
        Some(_) => {}
    }
    let header = read_header(bytes).map_err(|e| match e {
        Asn1Error::Truncated { needed, available } => TimestampError::TruncatedResponse {
            declared: needed,
            received: available,
        },
        other => other.into(),
    })?;
    if header.total_len() != bytes.len() {
        return Err(TimestampError::TruncatedResponse {
            declared: header.total_len(),
            received: bytes.len(),
        });
    }
    Ok(Tlv::parse_exact(bytes)?)
}

/// A decoded TimeStampResp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeStampResp {
    status: PkiStatus,
    status_text: Vec<String>,
    fail_info: Option<Vec<u8>>,
    token: Option<TimestampToken>,
}

impl TimeStampResp {
    /// Decode an `application/timestamp-reply` body.
    pub fn decode(bytes: &[u8]) -> Result<Self, TimestampError> {
        let outer = outer_sequence(bytes)?;
        let mut fields = outer.children();

        let status_info = fields.read_tag(tag::SEQUENCE)?;
        let mut status_fields = status_info.children();
        let status = PkiStatus::from_code(status_fields.read_tag(tag::INTEGER)?.as_u64()?);
        let status_text = match status_fields.read_optional(tag::SEQUENCE)? {
            Some(text) => read_free_text(text.children())?,
            None => Vec::new(),
        };
        let fail_info = status_fields
            .read_optional(tag::BIT_STRING)?
            .map(|t| t.content().to_vec());
        status_fields.finish()?;

        let token = match fields.read_optional(tag::SEQUENCE)? {
            Some(token) => Some(TimestampToken::decode(token.raw())?),
            None => None,
        };
        fields.finish()?;

        tracing::debug!(
            status = %status,
            bytes = bytes.len(),
            has_token = token.is_some(),
            "decoded TimeStampResp"
        );
        Ok(Self {
            status,
            status_text,
            fail_info,
            token,
        })
    }

    pub fn status(&self) -> PkiStatus {
        self.status
    }

    pub fn status_text(&self) -> &[String] {
        &self.status_text
    }

    /// Raw PKIFailureInfo BIT STRING content, if present.
    pub fn fail_info(&self) -> Option<&[u8]> {
        self.fail_info.as_deref()
    }

    pub fn token(&self) -> Option<&TimestampToken> {
        self.token.as_ref()
    }

    /// The token of a granted response.
    ///
    /// A non-granting status is `Rejected`; a granting status without a
    /// token is malformed.
    pub fn into_token(self) -> Result<TimestampToken, TimestampError> {
        if !self.status.is_granted() {
            return Err(TimestampError::Rejected {
                status: self.status,
                text: self.status_text.join("; "),
            });
        }
        self.token.ok_or_else(|| {
            TimestampError::MalformedTimestampResponse(
                "granted response carries no timeStampToken".to_string(),
            )
        })
    }
}

fn read_free_text(mut reader: DerReader<'_>) -> Result<Vec<String>, TimestampError> {
    let mut out = Vec::new();
    while !reader.is_empty() {
        out.push(reader.read_tag(tag::UTF8_STRING)?.as_str()?.to_string());
    }
    Ok(out)
}

/// An opaque RFC 3161 token (a CMS ContentInfo), as stored in envelopes.
#[derive(Clone, PartialEq, Eq)]
pub struct TimestampToken {
    der: Vec<u8>,
}

impl TimestampToken {
    /// Validate the outer envelope and keep the bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, TimestampError> {
        outer_sequence(bytes)?;
        Ok(Self { der: bytes.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.der
    }

    /// Read TSTInfo out of `ContentInfo / SignedData / encapContentInfo`.
    ///
    /// Returns `None` when the token is not shaped like a CMS SignedData
    /// carrying TSTInfo.
    pub fn tst_info(&self) -> Option<TstInfo> {
        match parse_tst_info(&self.der) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(error = %e, "token has no readable TSTInfo");
                None
            }
        }
    }
}

impl std::fmt::Debug for TimestampToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimestampToken({} bytes)", self.der.len())
    }
}

/// Fields read from a token's TSTInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TstInfo {
    pub policy: Oid,
    pub message_imprint: MessageImprint,
    /// Serial number magnitude bytes.
    pub serial: Vec<u8>,
    pub gen_time: Timestamp,
    pub nonce: Option<u64>,
}

fn parse_tst_info(der: &[u8]) -> Result<TstInfo, TimestampError> {
    let malformed = |what: &str| TimestampError::MalformedTimestampResponse(what.to_string());

    let mut content_info = Tlv::parse_exact(der)?.expect(tag::SEQUENCE)?.children();
    if content_info.read_tag(tag::OBJECT_IDENTIFIER)?.as_oid()?.to_string() != OID_SIGNED_DATA {
        return Err(malformed("content type is not signedData"));
    }
    let signed_data_wrapper = content_info.read_tag(tag::context(0))?;
    let signed_data = Tlv::parse_exact(signed_data_wrapper.content())?.expect(tag::SEQUENCE)?;

    let mut sd = signed_data.children();
    sd.read_tag(tag::INTEGER)?;
    sd.read_tag(tag::SET)?;
    let mut encap = sd.read_tag(tag::SEQUENCE)?.children();
    if encap.read_tag(tag::OBJECT_IDENTIFIER)?.as_oid()?.to_string() != OID_TST_INFO {
        return Err(malformed("encapsulated content is not TSTInfo"));
    }
    let econtent_wrapper = encap.read_tag(tag::context(0))?;
    let econtent = Tlv::parse_exact(econtent_wrapper.content())?.expect(tag::OCTET_STRING)?;

    let tst = Tlv::parse_exact(econtent.content())?.expect(tag::SEQUENCE)?;
    let mut fields = tst.children();
    let version = fields.read_tag(tag::INTEGER)?.as_u64()?;
    if version != 1 {
        return Err(malformed("unsupported TSTInfo version"));
    }
    let policy = fields.read_tag(tag::OBJECT_IDENTIFIER)?.as_oid()?;
    let message_imprint = MessageImprint::from_tlv(fields.read()?)?;
    let serial = fields.read_tag(tag::INTEGER)?.as_unsigned_bytes()?.to_vec();
    let gen_time_str = fields.read_tag(tag::GENERALIZED_TIME)?.as_str()?;
    let gen_time = Timestamp::from_generalized_time(gen_time_str)
        .map_err(|e| TimestampError::MalformedTimestampResponse(e.to_string()))?;
    // accuracy, ordering
    fields.read_optional(tag::SEQUENCE)?;
    fields.read_optional(tag::BOOLEAN)?;
    let nonce = match fields.read_optional(tag::INTEGER)? {
        Some(n) => n.as_u64().ok(),
        None => None,
    };

    Ok(TstInfo {
        policy,
        message_imprint,
        serial,
        gen_time,
        nonce,
    })
}
