//! Canonical sync keys
//!
//! A [`SyncKey`] is the relative path that identifies an object on the
//! server and a file under the sync root. Both sides are reduced to the same
//! form before comparison: segments joined by `/`, no leading separator, no
//! empty segments, and no space directly touching a separator.
//!
//! Every producer of keys goes through [`SyncKey::canonicalize`]; the only
//! difference between the remote and local flavours is the set of characters
//! treated as separators.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Canonical separator used in every [`SyncKey`]
pub const KEY_SEPARATOR: char = '/';

/// File-name suffix that marks an intentionally empty stand-in object
pub const PLACEHOLDER_SUFFIX: &str = ".blazed-placeholder";

/// Suffix of in-progress downloads
///
/// The local walker deletes any file carrying it, so a remote key that ends
/// with it could never be kept on disk.
pub const TEMP_FILE_SUFFIX: &str = ".blazesync-part";

/// Separators a remote listing may use inside its keys
pub const REMOTE_SEPARATORS: &[char] = &['/', '\\'];

/// Canonical relative path shared by the remote and local inventories
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SyncKey(String);

impl SyncKey {
    /// Canonicalize `raw`, treating every character in `separators` as a
    /// path separator.
    ///
    /// Spaces adjacent to a separator are trimmed, empty and `.` segments are
    /// dropped. A `..` segment is rejected so a key can never resolve outside
    /// the sync root.
    pub fn canonicalize(raw: &str, separators: &[char]) -> Result<Self, DomainError> {
        let segments: Vec<&str> = raw.split(|c: char| separators.contains(&c)).collect();
        let last = segments.len().saturating_sub(1);

        let mut kept = Vec::with_capacity(segments.len());
        for (i, segment) in segments.into_iter().enumerate() {
            let mut segment = segment;
            if i > 0 {
                segment = segment.trim_start_matches(' ');
            }
            if i < last {
                segment = segment.trim_end_matches(' ');
            }
            match segment {
                "" | "." => continue,
                ".." => return Err(DomainError::InvalidKey(raw.to_string())),
                _ => kept.push(segment),
            }
        }

        if kept.is_empty() {
            return Err(DomainError::InvalidKey(raw.to_string()));
        }

        Ok(Self(kept.join("/")))
    }

    /// Canonicalize a key as it appears in the remote listing (either
    /// separator may be present).
    pub fn from_remote(raw: &str) -> Result<Self, DomainError> {
        Self::canonicalize(raw, REMOTE_SEPARATORS)
    }

    /// Strip the leading container segment from a raw listing key, then
    /// canonicalize what remains.
    ///
    /// A key without any separator has no container prefix and is kept whole.
    pub fn from_container_key(raw: &str) -> Result<Self, DomainError> {
        let rest = match raw.find(REMOTE_SEPARATORS) {
            Some(idx) => &raw[idx + 1..],
            None => raw,
        };
        Self::from_remote(rest)
    }

    /// Canonicalize a path relative to the sync root, using the host
    /// separator (and `/`, which every supported host accepts).
    pub fn from_relative_path(path: &Path) -> Result<Self, DomainError> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(DomainError::InvalidKey(path.display().to_string())),
            }
        }
        let joined = parts.join(std::path::MAIN_SEPARATOR_STR);
        Self::canonicalize(&joined, &[std::path::MAIN_SEPARATOR, KEY_SEPARATOR])
    }

    /// The key as a `/`-separated string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path relative to the sync root using the host's native separator
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }

    /// Iterate over the path segments of the key
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_SEPARATOR)
    }

    /// Last segment of the key
    pub fn file_name(&self) -> &str {
        self.0.rsplit(KEY_SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Whether this key names a placeholder marker rather than real content
    pub fn is_placeholder(&self) -> bool {
        self.file_name().ends_with(PLACEHOLDER_SUFFIX)
    }

    /// Whether the file name collides with the in-progress download suffix
    pub fn is_temp_name(&self) -> bool {
        self.file_name().ends_with(TEMP_FILE_SUFFIX)
    }
}

impl Display for SyncKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SyncKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_remote(&value)
    }
}

impl From<SyncKey> for String {
    fn from(key: SyncKey) -> Self {
        key.0
    }
}

impl AsRef<str> for SyncKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
