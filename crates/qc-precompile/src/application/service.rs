//! # Precompile Engine
//!
//! Drives a build: resolve the graph, then for each unit children-first
//! render sentinels, compile through the adapter, locate and patch slots,
//! hash, and hand the artifact to its parents.
//!
//! ## Failure handling
//!
//! A failing unit blocks its ancestors, which are reported as skipped.
//! Independent subtrees keep building unless `fail_fast` is set, so one
//! build reports every failure it can find.

use crate::algorithms::dependency_resolver::{resolve, BuildPlan};
use crate::algorithms::kahns::{kahns_level_schedule, BuildSchedule};
use crate::algorithms::offset_locator::{locate_embedded_slot, locate_slot};
use crate::algorithms::template_renderer::render_template;
use crate::application::cache::{BuildSession, CacheKey, CacheOutcome};
use crate::config::PrecompileConfig;
use crate::domain::entities::{
    CompiledArtifact, OpenSlot, ResolveContext, TemplateVariable, UnitDescriptor, UnitKind,
    VariableOffset, VariableSource,
};
use crate::domain::graph::UnitGraph;
use crate::domain::invariants::artifact_invariants_hold;
use crate::domain::services::{content_hash, derive_address, encode_value, patch, sentinel, SlotState};
use crate::domain::value_objects::{ExternalBindings, TemplateValue, UnitName};
use crate::errors::{BuildFailure, PrecompileError, UnitFailure};
use crate::ports::inbound::{BuildOutput, BuildStats, PrecompileApi};
use crate::ports::outbound::CompilerAdapter;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Artifacts built so far in one build, keyed by unit.
type Built = BTreeMap<UnitName, Arc<CompiledArtifact>>;

/// Encoded value per declared variable, in declaration order; `None` for open slots.
type Bindings = Vec<(String, Option<Vec<u8>>)>;

/// The precompile engine.
///
/// Generic over the compiler adapter so tests can wrap it (see
/// [`CountingCompiler`](crate::adapters::CountingCompiler)).
pub struct PrecompileEngine<C> {
    compiler: C,
    config: PrecompileConfig,
}

impl<C: CompilerAdapter> PrecompileEngine<C> {
    /// Creates an engine with default configuration.
    pub fn new(compiler: C) -> Self {
        Self::with_config(compiler, PrecompileConfig::default())
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(compiler: C, config: PrecompileConfig) -> Self {
        Self { compiler, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &PrecompileConfig {
        &self.config
    }

    /// The compiler adapter.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Splits an artifact's bytecode into pages of the configured size.
    pub fn pages<'a>(&self, artifact: &'a CompiledArtifact) -> Vec<&'a [u8]> {
        artifact.pages(self.config.page_size)
    }

    /// Builds `root` reusing (and filling) the artifacts of `session`.
    ///
    /// # Errors
    ///
    /// A [`BuildFailure`] with every failed unit and the units skipped
    /// because of them. Graph errors (unknown units, cycles, limits) are
    /// reported before anything is compiled.
    #[instrument(skip(self, session, graph, bindings))]
    pub fn build_in_session(
        &self,
        session: &BuildSession,
        graph: &UnitGraph,
        root: &str,
        bindings: &ExternalBindings,
    ) -> Result<BuildOutput, BuildFailure> {
        let plan = resolve(graph, root, self.config.limits())
            .map_err(|e| BuildFailure::single(root, e))?;

        let schedule = if self.config.parallel {
            kahns_level_schedule(&plan, graph).map_err(|e| BuildFailure::single(root, e))?
        } else {
            BuildSchedule::sequential(&plan.order)
        };

        info!(
            units = plan.len(),
            levels = schedule.levels.len(),
            parallel = self.config.parallel,
            "Starting precompile build"
        );

        let mut built = Built::new();
        let mut failures: Vec<UnitFailure> = Vec::new();
        let mut skipped: Vec<UnitName> = Vec::new();
        let mut blocked: HashSet<UnitName> = HashSet::new();
        let mut stats = BuildStats {
            units: plan.len(),
            ..BuildStats::default()
        };

        for level in &schedule.levels {
            let mut ready: Vec<&Arc<UnitDescriptor>> = Vec::with_capacity(level.len());
            for name in &level.units {
                let descriptor = graph.unit(name).ok_or_else(|| {
                    BuildFailure::single(
                        root,
                        PrecompileError::Internal(format!("planned unit `{name}` missing from graph")),
                    )
                })?;

                let stopped = self.config.fail_fast && !failures.is_empty();
                if stopped || descriptor.children().iter().any(|c| blocked.contains(c)) {
                    warn!(unit = %name, "Skipping unit: a dependency failed");
                    blocked.insert(name.clone());
                    skipped.push(name.clone());
                    continue;
                }
                ready.push(descriptor);
            }

            let results: Vec<(UnitName, Result<(Arc<CompiledArtifact>, CacheOutcome), PrecompileError>)> =
                if self.config.parallel {
                    ready
                        .par_iter()
                        .map(|unit| (unit.name().clone(), self.build_unit(session, unit, &built, bindings)))
                        .collect()
                } else {
                    ready
                        .iter()
                        .map(|unit| (unit.name().clone(), self.build_unit(session, unit, &built, bindings)))
                        .collect()
                };

            for (name, result) in results {
                match result {
                    Ok((artifact, outcome)) => {
                        match outcome {
                            CacheOutcome::Hit => stats.cache_hits += 1,
                            CacheOutcome::Built => stats.compiled += 1,
                        }
                        debug!(
                            unit = %name,
                            bytes = artifact.bytecode.len(),
                            open_slots = artifact.open_slots.len(),
                            cached = outcome == CacheOutcome::Hit,
                            "Unit ready"
                        );
                        built.insert(name, artifact);
                    }
                    Err(error) => {
                        warn!(unit = %name, error = %error, "Unit failed");
                        blocked.insert(name.clone());
                        failures.push(UnitFailure {
                            unit: Some(name),
                            error,
                        });
                    }
                }
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|f| f.unit.as_ref().and_then(|u| plan.position(u)));
            skipped.sort_by_key(|u| plan.position(u));
            warn!(
                failed = failures.len(),
                skipped = skipped.len(),
                "Precompile build failed"
            );
            return Err(BuildFailure {
                root: root.to_string(),
                failures,
                skipped,
            });
        }

        let root_artifact = built.get(&plan.root).cloned().ok_or_else(|| {
            BuildFailure::single(
                root,
                PrecompileError::Internal(format!("root `{}` produced no artifact", plan.root)),
            )
        })?;

        info!(
            compiled = stats.compiled,
            cache_hits = stats.cache_hits,
            open_slots = root_artifact.open_slots.len(),
            "Precompile build complete"
        );

        let BuildPlan { order, .. } = plan;
        Ok(BuildOutput {
            root: root_artifact,
            artifacts: built,
            order,
            stats,
        })
    }

    /// Resolves the values of one unit and fetches or compiles its artifact.
    fn build_unit(
        &self,
        session: &BuildSession,
        descriptor: &UnitDescriptor,
        built: &Built,
        bindings: &ExternalBindings,
    ) -> Result<(Arc<CompiledArtifact>, CacheOutcome), PrecompileError> {
        let unit = descriptor.name();

        let mut children = Built::new();
        for child in descriptor.children() {
            let artifact = built.get(child).ok_or_else(|| {
                PrecompileError::Internal(format!("child `{child}` of `{unit}` was not built"))
            })?;
            children.insert(child.clone(), Arc::clone(artifact));
        }

        let mut values: Bindings = Vec::with_capacity(descriptor.variables().len());
        for variable in descriptor.variables().iter() {
            let encoded = match resolve_value(unit, variable, bindings, &children)? {
                Some(value) => Some(
                    encode_value(&variable.kind(), &value)
                        .map_err(|e| e.in_slot(unit, variable.name()))?,
                ),
                None => None,
            };
            values.push((variable.name().to_string(), encoded));
        }

        let key = CacheKey {
            unit: unit.clone(),
            fingerprint: descriptor.fingerprint(),
            bindings: values.clone(),
            children: descriptor
                .children()
                .iter()
                .filter_map(|c| children.get(c).map(|a| (c.clone(), a.content_hash)))
                .collect(),
        };

        session
            .cache()
            .get_or_build(key, || self.compile_unit(descriptor, &children, &values))
    }

    /// Renders, compiles and patches one unit.
    fn compile_unit(
        &self,
        descriptor: &UnitDescriptor,
        children: &Built,
        values: &Bindings,
    ) -> Result<CompiledArtifact, PrecompileError> {
        let unit = descriptor.name();
        let declared: Vec<(&TemplateVariable, &Option<Vec<u8>>)> = descriptor
            .variables()
            .iter()
            .zip(values.iter().map(|(_, value)| value))
            .collect();

        let sentinels: HashMap<&str, Vec<u8>> = declared
            .iter()
            .map(|&(variable, value)| {
                let state = if value.is_some() {
                    SlotState::Bound
                } else {
                    SlotState::Open
                };
                let width = variable.kind().width();
                (variable.name(), sentinel(unit, variable.name(), width, state))
            })
            .collect();

        let embedded: HashMap<&UnitName, &[u8]> = children
            .iter()
            .map(|(name, artifact)| (name, artifact.bytecode.as_slice()))
            .collect();

        let rendered = render_template(unit, descriptor.source_template(), &sentinels, &embedded)?;
        debug!(unit = %unit, source_len = rendered.source.len(), "Rendered source");

        let output = self
            .compiler
            .compile(&rendered.source)
            .map_err(|d| PrecompileError::SourceCompileError {
                unit: unit.clone(),
                diagnostic: d.to_string(),
            })?;
        let mut bytecode = output.bytecode;

        // Locate everything on the unpatched bytecode, then patch.
        let mut variable_offsets = BTreeMap::new();
        let mut open_slots: Vec<OpenSlot> = Vec::new();
        let mut patches: Vec<(usize, &[u8])> = Vec::new();

        for &(variable, value) in &declared {
            let name = variable.name();
            let (offset, found_by) =
                locate_slot(unit, name, &bytecode, &sentinels[name], &output.symbols)?;
            debug!(unit = %unit, variable = name, offset, ?found_by, "Located slot");

            variable_offsets.insert(
                name.to_string(),
                VariableOffset {
                    offset,
                    kind: variable.kind(),
                    resolved: value.is_some(),
                },
            );
            match value {
                Some(encoded) => patches.push((offset, encoded.as_slice())),
                None => open_slots.push(OpenSlot {
                    unit: unit.clone(),
                    variable: name.to_string(),
                    offset,
                    kind: variable.kind(),
                }),
            }
        }

        let mut inherited: HashSet<(&UnitName, &str)> = HashSet::new();
        for child in &rendered.embedded_children {
            let Some(artifact) = children.get(child) else {
                continue;
            };
            for slot in &artifact.open_slots {
                if !inherited.insert((&slot.unit, slot.variable.as_str())) {
                    continue;
                }
                let pattern = sentinel(&slot.unit, &slot.variable, slot.width(), SlotState::Open);
                for offset in locate_embedded_slot(&slot.unit, &slot.variable, &bytecode, &pattern)? {
                    open_slots.push(OpenSlot {
                        offset,
                        ..slot.clone()
                    });
                }
            }
        }
        open_slots.sort_by_key(|slot| slot.offset);

        for (offset, encoded) in patches {
            if !patch(&mut bytecode, offset, encoded) {
                return Err(PrecompileError::Internal(format!(
                    "slot of `{unit}` at {offset} lies outside {} bytes",
                    bytecode.len()
                )));
            }
        }

        let hash = content_hash(&bytecode);
        let address = (descriptor.kind() == UnitKind::Signature && open_slots.is_empty())
            .then(|| derive_address(&hash));

        let artifact = CompiledArtifact {
            unit: unit.clone(),
            kind: descriptor.kind(),
            bytecode,
            variable_offsets,
            open_slots,
            content_hash: hash,
            address,
            rendered_source: rendered.source,
        };
        debug_assert!(artifact_invariants_hold(&artifact));

        info!(
            unit = %unit,
            content_hash = %artifact.content_hash,
            templated = artifact.is_template(),
            "Compiled unit"
        );
        Ok(artifact)
    }
}

/// Picks a variable's value: external binding, then child output, then
/// resolver. `None` leaves the slot open.
fn resolve_value(
    unit: &UnitName,
    variable: &TemplateVariable,
    bindings: &ExternalBindings,
    children: &Built,
) -> Result<Option<TemplateValue>, PrecompileError> {
    if let Some(value) = bindings.lookup(unit, variable.name()) {
        return Ok(Some(value.clone()));
    }

    let child_artifact = |child: &str| {
        children
            .iter()
            .find(|(name, _)| name.as_str() == child)
            .map(|(_, artifact)| artifact)
            .ok_or_else(|| PrecompileError::UnknownUnit {
                name: child.to_string(),
                referenced_by: Some(unit.clone()),
            })
    };

    match variable.source() {
        VariableSource::Open => Ok(None),
        // A templated or stateful child has no address yet.
        VariableSource::ChildAddress(child) => {
            Ok(child_artifact(child)?.address.map(TemplateValue::from))
        }
        // A templated child's hash covers its sentinels, not a deployable program.
        VariableSource::ChildContentHash(child) => {
            let artifact = child_artifact(child)?;
            Ok((!artifact.is_template()).then(|| TemplateValue::from(artifact.content_hash)))
        }
        VariableSource::Resolver(resolver) => {
            let context = ResolveContext {
                unit,
                variable: variable.name(),
                external: bindings,
                children,
            };
            resolver(&context)
                .map(Some)
                .map_err(|message| PrecompileError::ResolverError {
                    unit: unit.clone(),
                    variable: variable.name().to_string(),
                    message,
                })
        }
    }
}

impl<C: CompilerAdapter> PrecompileApi for PrecompileEngine<C> {
    fn plan(&self, graph: &UnitGraph, root: &str) -> Result<BuildPlan, PrecompileError> {
        resolve(graph, root, self.config.limits())
    }

    fn build(
        &self,
        graph: &UnitGraph,
        root: &str,
        bindings: &ExternalBindings,
    ) -> Result<BuildOutput, BuildFailure> {
        let session = BuildSession::new();
        self.build_in_session(&session, graph, root, bindings)
    }
}

// =============================================================================
// TESTS
// =============================================================================
