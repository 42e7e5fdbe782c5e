//! Staleness oracle
//!
//! Decides which side of a key is authoritative. Ties go to the remote.

use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::inventory::RemoteObject;
use super::timestamp::truncate_to_micros;

/// `true` only when the local modification time is strictly later than the
/// remote one.
///
/// The local value is truncated to microseconds first, since that is all the
/// wire format can carry; a file stamped from a remote timestamp therefore
/// compares equal rather than newer.
pub fn is_local_newer(local: DateTime<Utc>, remote: DateTime<Utc>) -> bool {
    truncate_to_micros(local) > remote
}

/// [`is_local_newer`] against a remote object's wire timestamp.
///
/// # Errors
/// Propagates [`DomainError::MalformedTimestamp`]; a value that cannot be
/// parsed is never treated as "oldest possible".
pub fn is_local_newer_than(
    local: DateTime<Utc>,
    remote: &RemoteObject,
) -> Result<bool, DomainError> {
    Ok(is_local_newer(local, remote.modified_at()?))
}

/// Size-only comparison. An unknown remote size never matches.
pub fn is_same_size(local: u64, remote: Option<u64>) -> bool {
    remote == Some(local)
}
