//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct type
//! rather than a bare primitive. A [`LayerId`] is a closed enum so that every
//! dispatch over layers is an exhaustive `match`; a [`RunId`] correlates all
//! spans and history records produced by one orchestration run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Layer identifiers
// ---------------------------------------------------------------------------

/// Identifies one transformation layer.
///
/// Discriminants are the wire ids used by callers. Ids are assigned so that a
/// layer's dependencies always have numerically smaller ids, which lets a
/// sorted layer set double as an execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum LayerId {
    /// Project configuration (compiler target, framework flags).
    Configuration = 1,
    /// Entity decoding and leftover debug-statement cleanup.
    EntityCleanup = 2,
    /// Component hygiene (list keys, image alt text).
    Components = 3,
    /// Guards around browser-only APIs.
    Hydration = 4,
    /// App Router directives.
    NextJs = 5,
    /// Error-handling and testability fixes.
    Testing = 6,
}

impl LayerId {
    /// Every layer, in canonical (execution) order.
    pub const ALL: [LayerId; 6] = [
        LayerId::Configuration,
        LayerId::EntityCleanup,
        LayerId::Components,
        LayerId::Hydration,
        LayerId::NextJs,
        LayerId::Testing,
    ];

    /// The foundation layer every recommendation includes.
    pub const FOUNDATION: LayerId = LayerId::Configuration;

    /// Returns the wire id.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LayerId {
    type Error = UnknownLayer;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LayerId::Configuration),
            2 => Ok(LayerId::EntityCleanup),
            3 => Ok(LayerId::Components),
            4 => Ok(LayerId::Hydration),
            5 => Ok(LayerId::NextJs),
            6 => Ok(LayerId::Testing),
            other => Err(UnknownLayer(other)),
        }
    }
}

impl From<LayerId> for u8 {
    fn from(id: LayerId) -> Self {
        id.as_u8()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A numeric layer id with no registered layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown layer id {0}")]
pub struct UnknownLayer(pub u8);

// ---------------------------------------------------------------------------
// Run identifiers
// ---------------------------------------------------------------------------

/// Identifies a single orchestration run.
///
/// Generated fresh for every call to the orchestrator; recorded on the run's
/// tracing span and on its history record so all activity from one run can be
/// correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

/// Content-derived key for the result caches.
///
/// Built by [`crate::cache::cache_key`]; opaque to everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub(crate) fn from_parts(digest: &str, layers: &str) -> Self {
        Self(format!("{digest}:{layers}"))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
