//! Record identifiers and sharded-path derivation.
//!
//! The clinic stores every document under a sharded directory derived from its
//! identifier. To keep path derivation deterministic and consistent across the
//! codebase, identifiers use a *canonical* representation: **32 lowercase
//! hexadecimal characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the value produced by `Uuid::new_v4().simple().to_string()`.
//! Externally supplied identifiers must already be canonical; use
//! [`RecordId::parse`] to validate them. Non-canonical values (uppercase,
//! hyphenated, wrong length, non-hex) are rejected.
//!
//! ## Sharded directory layout
//! For a canonical identifier `u`, documents live under
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, e.g.
//! `clinic_data/templates/55/0e/550e8400e29b41d4a716446655440000/`.
//! Sharding bounds per-directory fan-out so collections stay navigable as
//! records accumulate.

use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The supplied string is not in canonical form.
    #[error("identifier must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    NotCanonical(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;

/// A document identifier in canonical form.
///
/// Once constructed, a `RecordId` is guaranteed canonical, so it can be used
/// for path derivation and as a map/set key without re-validation. Identifiers
/// order lexically over their canonical form, which keeps derived id sets
/// deterministic.
///
/// # Construction
/// - [`RecordId::new`] allocates a fresh identifier (RFC 4122 v4).
/// - [`RecordId::parse`] validates an externally supplied string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a new identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// Other common UUID forms (hyphenated, uppercase) are **not** normalised;
    /// callers must supply the canonical representation.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::NotCanonical`] if `input` is not 32 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> IdResult<Self> {
        if !Self::is_canonical(input) {
            return Err(IdError::NotCanonical(input.to_owned()));
        }
        // is_canonical guarantees 32 valid hex digits, so this cannot fail.
        let uuid = Uuid::parse_str(input).map_err(|_| IdError::NotCanonical(input.to_owned()))?;
        Ok(Self(uuid))
    }

    /// Derives the sharded directory for this identifier under `parent_dir`.
    ///
    /// Layout: `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first four
    /// hex characters of the canonical form.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.canonical();
        parent_dir
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical)
    }

    /// Returns the canonical 32-character string form.
    pub fn canonical(&self) -> String {
        self.0.simple().to_string()
    }

    fn is_canonical(input: &str) -> bool {
        input.len() == 32 && input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.canonical())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}
