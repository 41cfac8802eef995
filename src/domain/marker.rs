//! Canonical gene marker identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Error type for marker validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    #[error("Marker symbol is empty")]
    Empty,

    #[error("Marker symbol {0:?} contains characters outside A-Z, 0-9 and '-'")]
    InvalidSymbol(String),
}

/// A validated marker symbol in canonical uppercase form.
///
/// Construction trims surrounding whitespace and uppercases, so
/// `" brca1"` and `"BRCA1"` name the same marker. Serde round-trips
/// through the canonical string and re-validates on the way in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkerId(String);

impl MarkerId {
    /// Validate and canonicalize a raw symbol.
    ///
    /// # Errors
    /// Rejects empty symbols and characters outside `A-Z`, `0-9`, `-`.
    pub fn new(symbol: &str) -> Result<Self, MarkerError> {
        let canonical = symbol.trim().to_ascii_uppercase();
        if canonical.is_empty() {
            return Err(MarkerError::Empty);
        }
        if !canonical
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(MarkerError::InvalidSymbol(symbol.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Canonical form of the symbol.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MarkerId {
    type Error = MarkerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<MarkerId> for String {
    fn from(marker: MarkerId) -> Self {
        marker.0
    }
}

/// Canonicalize a raw symbol list, failing on the first invalid entry.
///
/// # Errors
/// Propagates the first [`MarkerError`] encountered.
pub fn canonicalize_markers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<MarkerId>, MarkerError> {
    raw.iter().map(|symbol| MarkerId::new(symbol.as_ref())).collect()
}

/// Short stable fingerprint of a marker list.
///
/// Sensitive to content and order, not reversible to the symbols. Used to
/// decide whether a cached screening result still describes the list a
/// caller is asking about.
#[must_use]
pub fn marker_fingerprint(markers: &[MarkerId]) -> String {
    let mut hasher = Sha256::new();
    for marker in markers {
        hasher.update(marker.as_str().as_bytes());
        hasher.update(b"\n");
    }
    let result = hasher.finalize();
    result.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
