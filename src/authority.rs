//! The `Authority` identifier
//!
//! An authority is the logical identifier for one scraping target: all
//! requests issued by one registered operation share an authority, and the
//! scheduler, registry, adaptive delay, and thread pool all route and key
//! their per-target state off of it.

use std::fmt;

/// Opaque identifier for one scraping target.
///
/// Cheap to clone (wraps an `Arc<str>`-free `String` internally — cloned
/// only at registration and when tagging requests/responses crossing
/// thread boundaries).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Authority(String);

impl Authority {
    /// Creates a new authority from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the authority name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Authority {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Authority {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
