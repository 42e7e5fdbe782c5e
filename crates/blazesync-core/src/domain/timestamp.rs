//! Wire timestamps for `lastModified`
//!
//! The listing encodes modification times as `YYYY-MM-DDTHH:MM:SS.ffffffZ`
//! (UTC, literal `Z`). The backend currently emits millisecond precision, so
//! parsing accepts one to six fractional digits and pads them to
//! microseconds. Emission always writes exactly six digits.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use super::errors::DomainError;

/// `strftime` pattern used when emitting wire timestamps
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const BASE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const BASE_LEN: usize = "YYYY-MM-DDTHH:MM:SS".len();
const MAX_FRACTION_DIGITS: usize = 6;

/// Parse a wire timestamp, failing on anything that deviates from the
/// fixed layout.
pub fn parse_wire_timestamp(value: &str) -> Result<DateTime<Utc>, DomainError> {
    let malformed = || DomainError::malformed_timestamp(value);

    let body = value.strip_suffix('Z').ok_or_else(malformed)?;
    let (base, fraction) = body.split_once('.').ok_or_else(malformed)?;

    if base.len() != BASE_LEN
        || fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let naive = NaiveDateTime::parse_from_str(base, BASE_FORMAT).map_err(|_| malformed())?;
    let micros: u32 = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS)
        .parse()
        .map_err(|_| malformed())?;
    let naive = naive
        .with_nanosecond(micros * 1_000)
        .ok_or_else(malformed)?;

    Ok(naive.and_utc())
}

/// Format an instant as a wire timestamp (sub-microsecond precision is
/// truncated).
pub fn format_wire_timestamp(at: DateTime<Utc>) -> String {
    at.format(WIRE_FORMAT).to_string()
}

/// Truncate an instant to the precision the wire format can carry
pub fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = at.nanosecond();
    at.with_nanosecond(nanos - nanos % 1_000).unwrap_or(at)
}
