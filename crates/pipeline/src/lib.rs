//! Core domain for the Laminate layer orchestration engine.
//!
//! This crate contains every domain concept, identifier, shared value type,
//! error type and port trait used by the engine. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a layer run needs; `engine`, `transform-api` and
//! `listener` define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `LayerId`, `RunId`, `CacheKey` |
//! | [`types`] | Options, issues, scores, timestamps |
//! | [`results`] | `LayerResult`, `Summary`, `OrchestrationResult` |
//! | [`errors`] | Run-level and layer-level error types |
//! | [`registry`] | Static layer catalog and dependency closure |
//! | [`detector`] | Problem-pattern scanning |
//! | [`recommend`] | Issues → recommended layer set |
//! | [`validator`] | Structural accept/revert check |
//! | [`cache`] | FIFO-bounded result cache |
//! | [`history`] | Bounded run log and stats |
//! | [`transform`] | `LayerTransformer` port and fallback combinator |

pub mod cache;
pub mod detector;
pub mod errors;
pub mod history;
pub mod identifiers;
pub mod recommend;
pub mod registry;
pub mod results;
pub mod transform;
pub mod types;
pub mod validator;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use cache::{cache_key, ResultCache};
pub use errors::{LaminateError, LayerExecutionError};
pub use history::{ExecutionHistory, HistoryRecord, HistoryReport, Stats};
pub use identifiers::{CacheKey, LayerId, RunId, UnknownLayer};
pub use recommend::{AnalysisReport, Recommendation};
pub use registry::{Correction, LayerDefinition};
pub use results::{LayerResult, OrchestrationResult, Summary};
pub use transform::{FallbackTransformer, LayerTransformer, TransformOutput};
pub use types::{
    Confidence, DetectedIssue, ExecutionOptions, Impact, IssueKind, IssueSeverity, Timestamp,
};
pub use validator::Verdict;
