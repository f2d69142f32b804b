//! CAS (compare-and-swap) version tokens
//!
//! A `Cas` identifies the state of one document at one point in time. The
//! store hands one back on every read and write; presenting it to a later
//! write makes that write conditional on the document being unchanged.
//!
//! ## Invariants
//!
//! - Tokens are opaque: callers may compare them for equality but must not
//!   derive meaning from their ordering.
//! - A successful mutation always produces a token different from the one
//!   it replaced.
//! - `Cas::NONE` (zero) means "no token"; the store never issues it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque document version token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cas(u64);

impl Cas {
    /// The absent token
    pub const NONE: Cas = Cas(0);

    /// Wrap a raw token value
    pub const fn new(raw: u64) -> Self {
        Cas(raw)
    }

    /// Raw token value, for carrying across process boundaries
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// True when this is `Cas::NONE`
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// `None` for the absent token, `Some(self)` otherwise
    pub fn into_option(self) -> Option<Cas> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u64> for Cas {
    fn from(raw: u64) -> Self {
        Cas(raw)
    }
}

impl From<Cas> for u64 {
    fn from(cas: Cas) -> Self {
        cas.0
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
