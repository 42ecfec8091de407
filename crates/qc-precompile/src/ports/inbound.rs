//! # Driving Ports (API - Inbound)
//!
//! The interface the precompile engine exposes to build tooling and to the
//! deployment collaborator that consumes its artifacts.

use crate::algorithms::dependency_resolver::BuildPlan;
use crate::domain::entities::{CompiledArtifact, OpenSlot};
use crate::domain::graph::UnitGraph;
use crate::domain::value_objects::{ExternalBindings, UnitName};
use crate::errors::{BuildFailure, PrecompileError};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// BUILD OUTPUT
// =============================================================================

/// Counters for one build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Units in the build plan.
    pub units: usize,
    /// Units compiled by this build.
    pub compiled: usize,
    /// Units served from the artifact cache.
    pub cache_hits: usize,
}

/// Successful build result.
#[derive(Clone, Debug)]
pub struct BuildOutput {
    /// Root artifact.
    pub root: Arc<CompiledArtifact>,
    /// Every artifact built, keyed by unit.
    pub artifacts: BTreeMap<UnitName, Arc<CompiledArtifact>>,
    /// Build order, children first.
    pub order: Vec<UnitName>,
    /// Counters.
    pub stats: BuildStats,
}

impl BuildOutput {
    /// Artifact of `unit`, if it was part of the build.
    #[must_use]
    pub fn artifact(&self, unit: &str) -> Option<&Arc<CompiledArtifact>> {
        self.artifacts
            .iter()
            .find(|(name, _)| name.as_str() == unit)
            .map(|(_, artifact)| artifact)
    }

    /// Slots of the root left for the caller to patch.
    #[must_use]
    pub fn unresolved(&self) -> &[OpenSlot] {
        &self.root.open_slots
    }
}

// =============================================================================
// PRECOMPILE API (Primary Driving Port)
// =============================================================================

/// Primary API for precompilation.
///
/// ## Usage
///
/// ```ignore
/// let output = engine.build(&graph, "Root", &bindings)?;
/// deploy(&output.root.bytecode);
/// ```
pub trait PrecompileApi: Send + Sync {
    /// Resolve the build order for `root` without compiling anything.
    ///
    /// # Errors
    ///
    /// Graph errors: unknown units, cycles, limits.
    fn plan(&self, graph: &UnitGraph, root: &str) -> Result<BuildPlan, PrecompileError>;

    /// Build `root` and everything it embeds.
    ///
    /// # Errors
    ///
    /// A [`BuildFailure`] listing every failed unit and the units skipped
    /// because of them.
    fn build(
        &self,
        graph: &UnitGraph,
        root: &str,
        bindings: &ExternalBindings,
    ) -> Result<BuildOutput, BuildFailure>;
}
