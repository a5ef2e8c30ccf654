//! The per-number identity key.
//!
//! Every lifecycle operation, registry slot, durable record, and on-disk
//! workspace is scoped to one [`Identity`]: a phone number normalized to its
//! digits. Normalization happens once at the boundary — everything past it
//! can rely on the key containing only `0-9`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A phone number contained no digits after normalization.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("number is required and must contain digits")]
pub struct InvalidNumber;

/// Normalized numeric identity key (digits only).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw phone number into an identity.
    ///
    /// Strips every non-digit character (`"44 7700 900000"` becomes
    /// `"447700900000"`). Fails if nothing remains.
    pub fn sanitize(raw: &str) -> Result<Self, InvalidNumber> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(InvalidNumber);
        }
        Ok(Self(digits))
    }

    /// Return the normalized digits as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
