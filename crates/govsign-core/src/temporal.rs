//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the instant type used for envelope creation times,
//! certificate validity windows, and TSA `genTime` values.
//!
//! ## Security Invariant
//!
//! Every timestamp is UTC, truncated to whole seconds, and rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. Envelope JSON therefore has one byte form per
//! instant. Offsets other than `Z` are rejected by [`Timestamp::parse`];
//! [`Timestamp::parse_lenient`] exists for operator input only.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string with `Z` suffix.
/// - [`Timestamp::from_generalized_time()`]: from an ASN.1 GeneralizedTime body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Wrap a `DateTime<Utc>`, discarding sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 timestamp. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "must use Z suffix (UTC only), got {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 timestamp with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse the body of an ASN.1 GeneralizedTime (`YYYYMMDDHHMMSS[.fff]Z`).
    ///
    /// RFC 3161 requires the `Z` form for `genTime`; local-time forms are
    /// rejected. Fractional seconds are accepted and truncated.
    pub fn from_generalized_time(s: &str) -> Result<Self, CoreError> {
        let body = s.strip_suffix('Z').ok_or_else(|| {
            CoreError::InvalidTimestamp(format!("GeneralizedTime must end in Z, got {s:?}"))
        })?;
        let whole = body.split('.').next().unwrap_or(body);
        let naive = NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S")
            .map_err(|e| CoreError::InvalidTimestamp(format!("GeneralizedTime {s:?}: {e}")))?;
        Ok(Self(naive.and_utc()))
    }

    /// Unix epoch seconds to a timestamp.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("epoch seconds out of range: {secs}")))
    }

    /// The inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as an ASN.1 GeneralizedTime body, `YYYYMMDDHHMMSSZ`.
    pub fn to_generalized_time(&self) -> String {
        self.0.format("%Y%m%d%H%M%SZ").to_string()
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
