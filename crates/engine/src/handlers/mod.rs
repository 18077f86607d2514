//! In-process layer handlers.
//!
//! Each [`LayerId`] has exactly one handler, selected by [`handler_for`].
//! Adding a layer means adding a variant and a handler; the exhaustive match
//! makes a missing handler a compile error.

mod components;
mod configuration;
mod entities;
mod hydration;
mod nextjs;
mod testing;

use pipeline::validator::BALANCE_THRESHOLD;
use pipeline::{ExecutionOptions, LayerExecutionError, LayerId, TransformOutput};

pub use components::ComponentsLayer;
pub use configuration::ConfigurationLayer;
pub use entities::EntityCleanupLayer;
pub use hydration::HydrationLayer;
pub use nextjs::NextJsLayer;
pub use testing::TestingLayer;

/// One layer's local transformation.
pub trait LayerHandler: Send + Sync {
    /// `false` when the handler can already tell the layer would be a no-op.
    fn is_applicable(&self, code: &str) -> bool;

    fn apply(
        &self,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError>;
}

/// Returns the handler for `layer`.
pub fn handler_for(layer: LayerId) -> &'static dyn LayerHandler {
    match layer {
        LayerId::Configuration => &ConfigurationLayer,
        LayerId::EntityCleanup => &EntityCleanupLayer,
        LayerId::Components => &ComponentsLayer,
        LayerId::Hydration => &HydrationLayer,
        LayerId::NextJs => &NextJsLayer,
        LayerId::Testing => &TestingLayer,
    }
}

/// Most rewrites adding one bracket pair that a single pass may make.
///
/// The validator reverts a layer whose bracket count moves by more than
/// [`BALANCE_THRESHOLD`]; handlers leave the remaining sites for a later run.
pub(crate) const PAIRED_EDITS_PER_PASS: usize = BALANCE_THRESHOLD / 2;

/// Improvement message for sites left over by [`PAIRED_EDITS_PER_PASS`].
pub(crate) fn deferred(count: usize, noun: &str) -> String {
    format!("Deferred {} to a later run", counted(count, noun))
}

/// Pluralises `noun` for improvement messages.
pub(crate) fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        return format!("1 {noun}");
    }
    match noun.strip_suffix('y') {
        Some(stem) if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) => format!("{count} {stem}ies"),
        _ => format!("{count} {noun}s"),
    }
}
