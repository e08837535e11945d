//! Server-assigned timestamps.
//!
//! Stored as integer microseconds since the Unix epoch so they sort
//! numerically; rendered as RFC 3339 in responses.

use anyhow::anyhow;
use serde::Serializer;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::{CatalogError, CatalogResult};

/// Current UTC time, truncated to the stored precision.
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

pub fn to_micros(ts: OffsetDateTime) -> i64 {
    i64::try_from(ts.unix_timestamp_nanos() / 1_000).unwrap_or(i64::MAX)
}

pub fn from_micros(micros: i64) -> CatalogResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|e| CatalogError::Internal(anyhow!("stored timestamp {} out of range: {}", micros, e)))
}

/// `serialize_with` target rendering RFC 3339.
pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}
