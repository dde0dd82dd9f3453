//! # DER Node Codec
//!
//! A small typed encoder and a borrowing decoder for the subset of ASN.1
//! DER that RFC 3161 messages use. Every length prefix is computed from
//! the encoded children, so a node tree can never disagree with its own
//! byte form.
//!
//! ## Scope
//!
//! - Single-octet tags only (universal and context-specific `[0]`..`[30]`).
//! - Definite lengths of at most four octets. Indefinite lengths (BER) and
//!   non-minimal length encodings are rejected.
//! - `SET OF` children are sorted by encoding on output, as DER requires.

use thiserror::Error;

/// Universal and context tag octets.
pub mod tag {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const UTF8_STRING: u8 = 0x0c;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;

    /// Constructed context-specific tag `[n]`.
    pub const fn context(n: u8) -> u8 {
        0xa0 | n
    }
}

const MAX_LENGTH_OCTETS: usize = 4;

/// DER decoding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("truncated input: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("indefinite length encoding is not allowed in DER")]
    IndefiniteLength,

    #[error("length field of {0} octets exceeds the supported maximum")]
    LengthTooLarge(usize),

    #[error("non-minimal length encoding")]
    NonMinimalLength,

    #[error("multi-octet tag numbers are not supported")]
    HighTagNumber,

    #[error("expected tag 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("{0} trailing bytes after DER value")]
    TrailingData(usize),

    #[error("invalid object identifier: {0}")]
    InvalidOid(String),

    #[error("invalid {kind}: {reason}")]
    InvalidValue { kind: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Object identifiers
// ---------------------------------------------------------------------------

/// An ASN.1 OBJECT IDENTIFIER.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: Vec<u64>,
}

impl Oid {
    /// Parse dotted-decimal form, e.g. `2.16.840.1.101.3.4.2.1`.
    pub fn parse(dotted: &str) -> Result<Self, Asn1Error> {
        let arcs = dotted
            .split('.')
            .map(|arc| {
                arc.parse::<u64>()
                    .map_err(|_| Asn1Error::InvalidOid(dotted.to_string()))
            })
            .collect::<Result<Vec<u64>, _>>()?;
        Self::from_arcs(arcs).map_err(|_| Asn1Error::InvalidOid(dotted.to_string()))
    }

    fn from_arcs(arcs: Vec<u64>) -> Result<Self, Asn1Error> {
        let valid = match arcs.as_slice() {
            [first, second, ..] => *first <= 2 && (*first == 2 || *second < 40),
            _ => false,
        };
        if !valid {
            return Err(Asn1Error::InvalidOid(format!("{arcs:?}")));
        }
        Ok(Self { arcs })
    }

    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Base-128 content octets (no tag or length).
    pub fn to_der_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let head = self.arcs[0]
            .saturating_mul(40)
            .saturating_add(self.arcs[1]);
        push_base128(head, &mut out);
        for arc in &self.arcs[2..] {
            push_base128(*arc, &mut out);
        }
        out
    }

    /// Decode base-128 content octets.
    pub fn from_der_content(content: &[u8]) -> Result<Self, Asn1Error> {
        let invalid = |reason: &str| Asn1Error::InvalidOid(reason.to_string());
        if content.is_empty() {
            return Err(invalid("empty"));
        }
        let mut values = Vec::new();
        let mut acc: u64 = 0;
        let mut in_arc = false;
        for &byte in content {
            if !in_arc && byte == 0x80 {
                return Err(invalid("non-minimal arc encoding"));
            }
            if acc > (u64::MAX >> 7) {
                return Err(invalid("arc overflows 64 bits"));
            }
            acc = (acc << 7) | u64::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                values.push(acc);
                acc = 0;
                in_arc = false;
            } else {
                in_arc = true;
            }
        }
        if in_arc {
            return Err(invalid("truncated arc"));
        }
        let head = values[0];
        let (first, second) = match head {
            0..=39 => (0, head),
            40..=79 => (1, head - 40),
            _ => (2, head - 80),
        };
        let mut arcs = vec![first, second];
        arcs.extend_from_slice(&values[1..]);
        Ok(Self { arcs })
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.arcs.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl std::str::FromStr for Oid {
    type Err = Asn1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn push_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// A DER value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerNode {
    Boolean(bool),
    /// Two's-complement content octets, minimally encoded.
    Integer(Vec<u8>),
    OctetString(Vec<u8>),
    Null,
    Oid(Oid),
    Utf8String(String),
    /// `YYYYMMDDHHMMSSZ` form.
    GeneralizedTime(String),
    Sequence(Vec<DerNode>),
    Set(Vec<DerNode>),
    /// `[n] EXPLICIT` wrapper.
    Explicit(u8, Box<DerNode>),
    /// A complete, already-encoded TLV spliced in verbatim.
    Raw(Vec<u8>),
}

impl DerNode {
    /// Non-negative INTEGER from big-endian magnitude bytes.
    pub fn unsigned(magnitude: &[u8]) -> Self {
        let trimmed: &[u8] = match magnitude.iter().position(|b| *b != 0) {
            Some(i) => &magnitude[i..],
            None => &[0],
        };
        let mut content = Vec::with_capacity(trimmed.len() + 1);
        if trimmed[0] & 0x80 != 0 {
            content.push(0);
        }
        content.extend_from_slice(trimmed);
        Self::Integer(content)
    }

    pub fn uint(value: u64) -> Self {
        Self::unsigned(&value.to_be_bytes())
    }

    pub fn oid(dotted: &str) -> Result<Self, Asn1Error> {
        Ok(Self::Oid(Oid::parse(dotted)?))
    }

    /// Tag octet for this node. `Raw` reports the tag of its spliced TLV.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Boolean(_) => tag::BOOLEAN,
            Self::Integer(_) => tag::INTEGER,
            Self::OctetString(_) => tag::OCTET_STRING,
            Self::Null => tag::NULL,
            Self::Oid(_) => tag::OBJECT_IDENTIFIER,
            Self::Utf8String(_) => tag::UTF8_STRING,
            Self::GeneralizedTime(_) => tag::GENERALIZED_TIME,
            Self::Sequence(_) => tag::SEQUENCE,
            Self::Set(_) => tag::SET,
            Self::Explicit(n, _) => tag::context(*n),
            Self::Raw(raw) => raw.first().copied().unwrap_or(0),
        }
    }

    /// Total encoded length including tag and length octets.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Raw(raw) => raw.len(),
            _ => {
                let content = self.content_len();
                1 + length_octets(content) + content
            }
        }
    }

    fn content_len(&self) -> usize {
        match self {
            Self::Boolean(_) => 1,
            Self::Integer(c) => c.len().max(1),
            Self::OctetString(c) => c.len(),
            Self::Null => 0,
            Self::Oid(oid) => oid.to_der_content().len(),
            Self::Utf8String(s) | Self::GeneralizedTime(s) => s.len(),
            Self::Sequence(children) | Self::Set(children) => {
                children.iter().map(DerNode::encoded_len).sum()
            }
            Self::Explicit(_, inner) => inner.encoded_len(),
            Self::Raw(raw) => raw.len(),
        }
    }

    /// Append the DER encoding of this node to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        if let Self::Raw(raw) = self {
            out.extend_from_slice(raw);
            return;
        }
        out.push(self.tag());
        encode_length(self.content_len(), out);
        match self {
            Self::Boolean(b) => out.push(if *b { 0xff } else { 0x00 }),
            Self::Integer(c) if c.is_empty() => out.push(0),
            Self::Integer(c) | Self::OctetString(c) => out.extend_from_slice(c),
            Self::Null => {}
            Self::Oid(oid) => out.extend_from_slice(&oid.to_der_content()),
            Self::Utf8String(s) | Self::GeneralizedTime(s) => out.extend_from_slice(s.as_bytes()),
            Self::Sequence(children) => {
                for child in children {
                    child.encode_into(out);
                }
            }
            Self::Set(children) => {
                let mut encoded: Vec<Vec<u8>> = children.iter().map(DerNode::to_der).collect();
                encoded.sort();
                for child in encoded {
                    out.extend_from_slice(&child);
                }
            }
            Self::Explicit(_, inner) => inner.encode_into(out),
            Self::Raw(_) => {}
        }
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }
}

/// Append a DER definite length.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn length_octets(len: usize) -> usize {
    if len < 0x80 {
        1
    } else {
        1 + (usize::BITS as usize / 8 - (len.leading_zeros() as usize / 8))
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Tag and length octets of one TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u8,
    pub header_len: usize,
    pub content_len: usize,
}

impl Header {
    /// Header plus content length, as declared.
    pub fn total_len(&self) -> usize {
        self.header_len.saturating_add(self.content_len)
    }
}

/// Read the tag and length octets at the start of `input`.
pub fn read_header(input: &[u8]) -> Result<Header, Asn1Error> {
    let tag = *input.first().ok_or(Asn1Error::Truncated {
        needed: 1,
        available: 0,
    })?;
    if tag & 0x1f == 0x1f {
        return Err(Asn1Error::HighTagNumber);
    }
    let first = *input.get(1).ok_or(Asn1Error::Truncated {
        needed: 2,
        available: input.len(),
    })?;
    if first < 0x80 {
        return Ok(Header {
            tag,
            header_len: 2,
            content_len: usize::from(first),
        });
    }
    if first == 0x80 {
        return Err(Asn1Error::IndefiniteLength);
    }
    let n = usize::from(first & 0x7f);
    if n > MAX_LENGTH_OCTETS {
        return Err(Asn1Error::LengthTooLarge(n));
    }
    let octets = input.get(2..2 + n).ok_or(Asn1Error::Truncated {
        needed: 2 + n,
        available: input.len(),
    })?;
    if octets[0] == 0 {
        return Err(Asn1Error::NonMinimalLength);
    }
    let content_len = octets
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
    if content_len < 0x80 {
        return Err(Asn1Error::NonMinimalLength);
    }
    Ok(Header {
        tag,
        header_len: 2 + n,
        content_len,
    })
}

/// A borrowed TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    tag: u8,
    content: &'a [u8],
    raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Parse one TLV from the front of `input`, returning the remainder.
    pub fn parse(input: &'a [u8]) -> Result<(Self, &'a [u8]), Asn1Error> {
        let header = read_header(input)?;
        let total = header.total_len();
        if input.len() < total {
            return Err(Asn1Error::Truncated {
                needed: total,
                available: input.len(),
            });
        }
        let (raw, rest) = input.split_at(total);
        Ok((
            Self {
                tag: header.tag,
                content: &raw[header.header_len..],
                raw,
            },
            rest,
        ))
    }

    /// Parse a TLV that must span all of `input`.
    pub fn parse_exact(input: &'a [u8]) -> Result<Self, Asn1Error> {
        let (tlv, rest) = Self::parse(input)?;
        if !rest.is_empty() {
            return Err(Asn1Error::TrailingData(rest.len()));
        }
        Ok(tlv)
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    /// The full encoding, tag and length included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn expect(self, expected: u8) -> Result<Self, Asn1Error> {
        if self.tag != expected {
            return Err(Asn1Error::UnexpectedTag {
                expected,
                found: self.tag,
            });
        }
        Ok(self)
    }

    /// Reader over the children of a constructed value.
    pub fn children(&self) -> DerReader<'a> {
        DerReader::new(self.content)
    }

    pub fn as_bool(&self) -> Result<bool, Asn1Error> {
        match self.content {
            [0x00] => Ok(false),
            [0xff] => Ok(true),
            _ => Err(Asn1Error::InvalidValue {
                kind: "BOOLEAN",
                reason: format!("content {:02x?}", self.content),
            }),
        }
    }

    /// Magnitude octets of a non-negative INTEGER, leading zero removed.
    pub fn as_unsigned_bytes(&self) -> Result<&'a [u8], Asn1Error> {
        let invalid = |reason: &str| Asn1Error::InvalidValue {
            kind: "INTEGER",
            reason: reason.to_string(),
        };
        match self.content {
            [] => Err(invalid("empty")),
            [first, ..] if first & 0x80 != 0 => Err(invalid("negative")),
            [0, rest @ ..] if !rest.is_empty() => Ok(rest),
            content => Ok(content),
        }
    }

    pub fn as_u64(&self) -> Result<u64, Asn1Error> {
        let bytes = self.as_unsigned_bytes()?;
        if bytes.len() > 8 {
            return Err(Asn1Error::InvalidValue {
                kind: "INTEGER",
                reason: "does not fit in 64 bits".to_string(),
            });
        }
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn as_oid(&self) -> Result<Oid, Asn1Error> {
        Oid::from_der_content(self.content)
    }

    pub fn as_str(&self) -> Result<&'a str, Asn1Error> {
        std::str::from_utf8(self.content).map_err(|e| Asn1Error::InvalidValue {
            kind: "string",
            reason: e.to_string(),
        })
    }
}

/// Sequential reader over concatenated TLVs.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    input: &'a [u8],
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.input.first().copied()
    }

    pub fn read(&mut self) -> Result<Tlv<'a>, Asn1Error> {
        let (tlv, rest) = Tlv::parse(self.input)?;
        self.input = rest;
        Ok(tlv)
    }

    pub fn read_tag(&mut self, expected: u8) -> Result<Tlv<'a>, Asn1Error> {
        self.read()?.expect(expected)
    }

    /// Read the next value only if it carries `expected`.
    pub fn read_optional(&mut self, expected: u8) -> Result<Option<Tlv<'a>>, Asn1Error> {
        if self.peek_tag() == Some(expected) {
            self.read().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fail if unread input remains.
    pub fn finish(self) -> Result<(), Asn1Error> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(Asn1Error::TrailingData(self.input.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_and_long_lengths() {
        let mut out = Vec::new();
        encode_length(0x7f, &mut out);
        assert_eq!(out, [0x7f]);

        out.clear();
        encode_length(0x80, &mut out);
        assert_eq!(out, [0x81, 0x80]);

        out.clear();
        encode_length(0x0100, &mut out);
        assert_eq!(out, [0x82, 0x01, 0x00]);

        assert_eq!(length_octets(0x7f), 1);
        assert_eq!(length_octets(0x80), 2);
        assert_eq!(length_octets(0x0100), 3);
        assert_eq!(length_octets(0x01_0000), 4);
    }

    #[test]
    fn sha256_oid_encoding() {
        let oid = Oid::parse("2.16.840.1.101.3.4.2.1").unwrap();
        assert_eq!(
            DerNode::Oid(oid.clone()).to_der(),
            [0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01]
        );
        assert_eq!(Oid::from_der_content(&oid.to_der_content()).unwrap(), oid);
        assert_eq!(oid.to_string(), "2.16.840.1.101.3.4.2.1");
    }

    #[test]
    fn oid_first_arc_forms() {
        for dotted in ["0.9.2342", "1.2.840.113549.1.7.2", "2.999.3"] {
            let oid = Oid::parse(dotted).unwrap();
            assert_eq!(
                Oid::from_der_content(&oid.to_der_content()).unwrap().to_string(),
                dotted
            );
        }
        assert!(Oid::parse("3.1").is_err());
        assert!(Oid::parse("1.40").is_err());
        assert!(Oid::parse("1").is_err());
        assert!(Oid::parse("1.2.x").is_err());
    }

    #[test]
    fn oid_decode_rejects_bad_content() {
        assert!(Oid::from_der_content(&[]).is_err());
        assert!(Oid::from_der_content(&[0x2a, 0x86]).is_err());
        assert!(Oid::from_der_content(&[0x2a, 0x80, 0x01]).is_err());
    }

    #[test]
    fn unsigned_integers_are_minimal_and_positive() {
        assert_eq!(DerNode::uint(0).to_der(), [0x02, 0x01, 0x00]);
        assert_eq!(DerNode::uint(1).to_der(), [0x02, 0x01, 0x01]);
        assert_eq!(DerNode::uint(0x80).to_der(), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(DerNode::uint(0x0100).to_der(), [0x02, 0x02, 0x01, 0x00]);
        let max = DerNode::uint(u64::MAX).to_der();
        assert_eq!(max.len(), 2 + 9);
        assert_eq!(Tlv::parse_exact(&max).unwrap().as_u64().unwrap(), u64::MAX);
    }

    #[test]
    fn sequence_length_tracks_children() {
        let node = DerNode::Sequence(vec![
            DerNode::uint(1),
            DerNode::OctetString(vec![0xaa; 200]),
            DerNode::Null,
        ]);
        let der = node.to_der();
        assert_eq!(der.len(), node.encoded_len());
        // 3 + (3 + 200) + 2 = 208 content bytes, long-form length.
        assert_eq!(&der[..3], &[0x30, 0x81, 208]);
    }

    #[test]
    fn set_children_sorted() {
        let node = DerNode::Set(vec![DerNode::uint(2), DerNode::uint(1)]);
        assert_eq!(node.to_der(), [0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn explicit_and_raw_nodes() {
        let inner = DerNode::Boolean(true);
        let node = DerNode::Explicit(0, Box::new(inner.clone()));
        assert_eq!(node.to_der(), [0xa0, 0x03, 0x01, 0x01, 0xff]);
        let raw = DerNode::Raw(inner.to_der());
        assert_eq!(raw.tag(), tag::BOOLEAN);
        assert_eq!(
            DerNode::Sequence(vec![raw]).to_der(),
            [0x30, 0x03, 0x01, 0x01, 0xff]
        );
    }

    #[test]
    fn reader_walks_children() {
        let der = DerNode::Sequence(vec![
            DerNode::uint(7),
            DerNode::Boolean(false),
            DerNode::Utf8String("ok".to_string()),
        ])
        .to_der();
        let seq = Tlv::parse_exact(&der).unwrap().expect(tag::SEQUENCE).unwrap();
        let mut r = seq.children();
        assert_eq!(r.read_tag(tag::INTEGER).unwrap().as_u64().unwrap(), 7);
        assert!(r.read_optional(tag::NULL).unwrap().is_none());
        assert!(!r.read_tag(tag::BOOLEAN).unwrap().as_bool().unwrap());
        assert_eq!(r.read_tag(tag::UTF8_STRING).unwrap().as_str().unwrap(), "ok");
        r.finish().unwrap();
    }

    #[test]
    fn decoder_rejects_non_der() {
        assert_eq!(read_header(&[0x30, 0x80]), Err(Asn1Error::IndefiniteLength));
        assert_eq!(read_header(&[0x30, 0x81, 0x05]), Err(Asn1Error::NonMinimalLength));
        assert_eq!(read_header(&[0x30, 0x82, 0x00, 0x90]), Err(Asn1Error::NonMinimalLength));
        assert_eq!(read_header(&[0x1f, 0x01]), Err(Asn1Error::HighTagNumber));
        assert_eq!(read_header(&[0x30, 0x85, 1, 1, 1, 1, 1]), Err(Asn1Error::LengthTooLarge(5)));
        assert!(matches!(
            Tlv::parse(&[0x04, 0x05, 0x01]),
            Err(Asn1Error::Truncated { needed: 7, available: 3 })
        ));
        assert_eq!(
            Tlv::parse_exact(&[0x05, 0x00, 0x00]),
            Err(Asn1Error::TrailingData(1))
        );
        assert!(matches!(
            Tlv::parse_exact(&[0x05, 0x00]).unwrap().expect(tag::SEQUENCE),
            Err(Asn1Error::UnexpectedTag { expected: 0x30, found: 0x05 })
        ));
    }

    #[test]
    fn negative_integer_rejected() {
        let tlv = Tlv::parse_exact(&[0x02, 0x01, 0xff]).unwrap();
        assert!(tlv.as_unsigned_bytes().is_err());
    }

    proptest! {
        #[test]
        fn octet_string_header_matches_payload(payload in proptest::collection::vec(any::<u8>(), 0..2000)) {
            let der = DerNode::OctetString(payload.clone()).to_der();
            let tlv = Tlv::parse_exact(&der).unwrap();
            prop_assert_eq!(tlv.tag(), tag::OCTET_STRING);
            prop_assert_eq!(tlv.content(), payload.as_slice());
        }

        #[test]
        fn uint_decodes_to_same_value(v in any::<u64>()) {
            let der = DerNode::uint(v).to_der();
            prop_assert_eq!(Tlv::parse_exact(&der).unwrap().as_u64().unwrap(), v);
        }
    }
}
