//! Temporal filter parsing for the OGC `datetime` parameter.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Parsed form of the `datetime` query parameter.
///
/// OGC API - Features allows a single instant or an `A/B` interval where
/// either side may be the `..` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalFilter {
    /// A single zoned instant.
    Instant(DateTime<FixedOffset>),
    /// Open-start interval `../B`.
    Before(DateTime<FixedOffset>),
    /// Open-end interval `A/..`.
    After(DateTime<FixedOffset>),
    /// Closed interval `A/B` with A <= B.
    Range(DateTime<FixedOffset>, DateTime<FixedOffset>),
}

impl TemporalFilter {
    /// Parse a raw `datetime` parameter value.
    ///
    /// A value without `/` is a single instant. With `/`, the first two
    /// segments form the interval; `..` on either side leaves that side open.
    /// A closed interval whose end precedes its start is rejected.
    pub fn parse(raw: &str) -> Result<Self, DatetimeParseError> {
        if !raw.contains('/') {
            let instant = parse_instant(raw)?;
            return Ok(TemporalFilter::Instant(instant));
        }

        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() < 2 {
            return Err(DatetimeParseError::NotIso);
        }

        if parts[0] == ".." {
            let end = parse_instant(parts[1])?;
            Ok(TemporalFilter::Before(end))
        } else if parts[1] == ".." {
            let start = parse_instant(parts[0])?;
            Ok(TemporalFilter::After(start))
        } else {
            let start = parse_instant(parts[0])?;
            let end = parse_instant(parts[1])?;
            if end < start {
                return Err(DatetimeParseError::Misordered);
            }
            Ok(TemporalFilter::Range(start, end))
        }
    }
}

fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>, DatetimeParseError> {
    DateTime::parse_from_rfc3339(s).map_err(|_| DatetimeParseError::NotIso)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatetimeParseError {
    #[error("Time parameter not in ISO format")]
    NotIso,

    #[error("After time cannot be lesser than Before time")]
    Misordered,
}

impl From<DatetimeParseError> for crate::OgcError {
    fn from(err: DatetimeParseError) -> Self {
        crate::OgcError::BadRequest(err.to_string())
    }
}
