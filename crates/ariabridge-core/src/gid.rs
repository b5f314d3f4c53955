//! Engine-assigned download identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier the engine assigns to one download instance.
///
/// A gid only exists after a command has returned successfully, and it stays
/// stable for the lifetime of that download.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(String);

impl Gid {
    /// Wrap a raw identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the default (never assigned) gid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Gid {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Gid {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
