//! Tenant key validation.

use thiserror::Error;

/// Errors produced when validating a raw tenant key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TenantKeyError {
    /// The key was missing or empty.
    #[error("tenant key is empty")]
    Empty,

    /// The key contained characters that cannot appear in a database
    /// filename fragment.
    #[error("tenant key '{0}' contains path characters")]
    PathMaterial(String),
}

/// A validated tenant identifier.
///
/// The key names the tenant's database file on disk, so validation rejects
/// anything that could escape the data directory: path separators, `..`,
/// a leading dot, or NUL bytes. Keys are case-sensitive and compared
/// byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    /// Validates a raw key from the request boundary.
    ///
    /// # Errors
    ///
    /// Returns [`TenantKeyError::Empty`] for an empty or whitespace-only
    /// key, and [`TenantKeyError::PathMaterial`] for keys that contain
    /// filesystem path characters.
    pub fn parse(raw: &str) -> Result<Self, TenantKeyError> {
        if raw.trim().is_empty() {
            return Err(TenantKeyError::Empty);
        }

        let unsafe_for_filename = raw.contains('/')
            || raw.contains('\\')
            || raw.contains('\0')
            || raw.contains("..")
            || raw.starts_with('.');

        if unsafe_for_filename {
            return Err(TenantKeyError::PathMaterial(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// Returns the tenant key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
