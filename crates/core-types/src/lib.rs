//! Primitives shared by every index-gate crate.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

pub mod address;
pub mod matcher;

pub use address::HostPattern;
pub use matcher::MatcherWithWildcards;

/// Set of index (or alias, or pattern) names addressed by a request.
pub type IndexSet = BTreeSet<String>;

/// Placeholder some request shapes carry when they address no concrete index.
pub const NO_INDEX: &str = "<no-index>";

/// Shared error type for the primitive layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid request id: {0}")]
    InvalidRequestId(String),
}

/// Longest id [`RequestId::parse`] accepts.
pub const MAX_REQUEST_ID_LEN: usize = 64;

/// Opaque identifier minted once per inbound request.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accepts ids minted elsewhere, e.g. forwarded by a fronting proxy.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_REQUEST_ID_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CoreError::InvalidRequestId(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds an [`IndexSet`] from anything yielding names.
pub fn index_set<I, S>(names: I) -> IndexSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Drops the [`NO_INDEX`] placeholder and empty names.
pub fn strip_placeholders(set: &mut IndexSet) {
    set.remove(NO_INDEX);
    set.remove("");
}
