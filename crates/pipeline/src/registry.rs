//! Static catalog of layers and dependency closure.
//!
//! The registry is pure data: one [`LayerDefinition`] per [`LayerId`], defined
//! at compile time. [`close`] turns a caller's requested ids into an
//! executable set by pulling in every transitive dependency.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::duration_ms;
use crate::LayerId;

/// Static description of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    pub id: LayerId,
    pub name: String,
    pub description: String,
    pub dependencies: BTreeSet<LayerId>,
    #[serde(with = "duration_ms")]
    pub estimated_cost: Duration,
}

/// Human-readable name of a layer.
pub fn name(layer: LayerId) -> &'static str {
    match layer {
        LayerId::Configuration => "Configuration",
        LayerId::EntityCleanup => "Entity Cleanup",
        LayerId::Components => "Components",
        LayerId::Hydration => "Hydration",
        LayerId::NextJs => "Next.js App Router",
        LayerId::Testing => "Testing & Validation",
    }
}

fn description(layer: LayerId) -> &'static str {
    match layer {
        LayerId::Configuration => "Modernises compiler targets and framework flags",
        LayerId::EntityCleanup => "Decodes HTML entities and removes stray console.log calls",
        LayerId::Components => "Adds missing list keys and image alt text",
        LayerId::Hydration => "Guards browser-only storage access for server rendering",
        LayerId::NextJs => "Adds client directives to components that use hooks",
        LayerId::Testing => "Fills empty catch blocks so failures surface",
    }
}

fn estimated_cost(layer: LayerId) -> Duration {
    let millis = match layer {
        LayerId::Configuration => 50,
        LayerId::EntityCleanup => 100,
        LayerId::Components => 200,
        LayerId::Hydration | LayerId::NextJs => 150,
        LayerId::Testing => 250,
    };
    Duration::from_millis(millis)
}

/// Direct dependencies of `layer`.
///
/// Every dependency has a smaller id than its dependent.
pub fn dependencies(layer: LayerId) -> &'static [LayerId] {
    use LayerId::*;
    match layer {
        Configuration => &[],
        EntityCleanup => &[Configuration],
        Components => &[Configuration, EntityCleanup],
        Hydration => &[Configuration, EntityCleanup, Components],
        NextJs => &[Configuration, EntityCleanup, Components, Hydration],
        Testing => &[Configuration, EntityCleanup, Components, Hydration, NextJs],
    }
}

/// Full definition of one layer.
pub fn definition(layer: LayerId) -> LayerDefinition {
    LayerDefinition {
        id: layer,
        name: name(layer).to_string(),
        description: description(layer).to_string(),
        dependencies: dependencies(layer).iter().copied().collect(),
        estimated_cost: estimated_cost(layer),
    }
}

/// Every layer definition, in id order.
pub fn definitions() -> Vec<LayerDefinition> {
    LayerId::ALL.into_iter().map(definition).collect()
}

/// Result of [`close`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Correction {
    /// Requested layers plus every transitive dependency, ascending.
    pub corrected: Vec<LayerId>,
    /// One entry per requested layer whose dependencies had to be added.
    pub warnings: Vec<String>,
}

/// Computes the dependency closure of the requested wire ids.
///
/// Unknown ids are dropped without error. Duplicates collapse. The output is
/// sorted ascending, which is also a valid execution order.
pub fn close(requested: &[u8]) -> Correction {
    let mut known = Vec::with_capacity(requested.len());
    for &raw in requested {
        match LayerId::try_from(raw) {
            Ok(layer) => known.push(layer),
            Err(unknown) => debug!(layer = raw, "ignoring {unknown}"),
        }
    }
    close_layers(&known)
}

/// [`close`] over already-typed layer ids.
pub fn close_layers(requested: &[LayerId]) -> Correction {
    let mut corrected: BTreeSet<LayerId> = requested.iter().copied().collect();
    let mut warnings = Vec::new();

    let mut seen = BTreeSet::new();
    for &layer in requested {
        if !seen.insert(layer) {
            continue;
        }
        let mut added = BTreeSet::new();
        collect_missing(layer, &mut corrected, &mut added);
        if !added.is_empty() {
            let ids: Vec<String> = added.iter().map(ToString::to_string).collect();
            warnings.push(format!(
                "Layer {layer} ({}) requires layers {}; added automatically",
                name(layer),
                ids.join(", ")
            ));
        }
    }

    Correction {
        corrected: corrected.into_iter().collect(),
        warnings,
    }
}

fn collect_missing(
    layer: LayerId,
    corrected: &mut BTreeSet<LayerId>,
    added: &mut BTreeSet<LayerId>,
) {
    for &dep in dependencies(layer) {
        if corrected.insert(dep) {
            added.insert(dep);
        }
        collect_missing(dep, corrected, added);
    }
}
