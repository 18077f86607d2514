//! Layer handlers and the run orchestrator for Laminate.
//!
//! This crate supplies the six built-in layer handlers, the
//! [`LocalTransformer`] that dispatches to them, and the [`Orchestrator`]
//! that sequences a run: dependency correction, caching, execution,
//! validation, and history.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The orchestrator sequences calls between the
//! domain rules in [`pipeline`] and whichever [`pipeline::LayerTransformer`]
//! it was built with. It holds no domain rules of its own beyond run
//! sequencing.

pub mod diff;
pub mod handlers;
pub mod local;
pub mod orchestrator;

pub use diff::count_changes;
pub use handlers::{handler_for, LayerHandler};
pub use local::LocalTransformer;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
