//! Kahn's Topological Sort Algorithm
//!
//! Groups the units of a [`BuildPlan`] into levels. Units of one level have no
//! dependencies on each other and can be compiled concurrently.
//! O(V + E).

use super::dependency_resolver::BuildPlan;
use crate::domain::graph::UnitGraph;
use crate::domain::value_objects::UnitName;
use crate::errors::PrecompileError;
use std::collections::HashMap;

/// Units that can be built concurrently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLevel {
    /// Level sequence number (0 = leaves).
    pub index: usize,
    /// Units of this level, in resolver order.
    pub units: Vec<UnitName>,
}

impl BuildLevel {
    /// Creates a level.
    #[must_use]
    pub fn new(index: usize, units: Vec<UnitName>) -> Self {
        Self { index, units }
    }

    /// Number of units in the level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the level is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Level schedule for a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildSchedule {
    /// Levels in build order.
    pub levels: Vec<BuildLevel>,
    /// Total units scheduled.
    pub total_units: usize,
    /// Largest level.
    pub max_parallelism: usize,
}

impl BuildSchedule {
    /// Creates a schedule from levels.
    #[must_use]
    pub fn new(levels: Vec<BuildLevel>) -> Self {
        let total = levels.iter().map(BuildLevel::len).sum();
        let max_par = levels.iter().map(BuildLevel::len).max().unwrap_or(0);

        Self {
            levels,
            total_units: total,
            max_parallelism: max_par,
        }
    }

    /// Create a sequential schedule (one unit per level).
    #[must_use]
    pub fn sequential(order: &[UnitName]) -> Self {
        let levels = order
            .iter()
            .enumerate()
            .map(|(i, name)| BuildLevel::new(i, vec![name.clone()]))
            .collect();
        Self::new(levels)
    }

    /// Units in schedule order.
    #[must_use]
    pub fn flatten(&self) -> Vec<UnitName> {
        self.levels
            .iter()
            .flat_map(|l| l.units.iter().cloned())
            .collect()
    }
}

/// Perform Kahn's topological sort over the child -> parent edges of a plan.
///
/// Ties inside a level are broken by resolver order, so two calls on an
/// unchanged plan produce the same schedule.
///
/// # Errors
///
/// `Internal` if the plan and graph disagree (a resolved plan is acyclic).
pub fn kahns_level_schedule(
    plan: &BuildPlan,
    graph: &UnitGraph,
) -> Result<BuildSchedule, PrecompileError> {
    if plan.is_empty() {
        return Ok(BuildSchedule::new(vec![]));
    }

    let position: HashMap<&UnitName, usize> =
        plan.order.iter().enumerate().map(|(i, u)| (u, i)).collect();

    // 1. In-degree = number of children
    let mut in_degree: HashMap<&UnitName, usize> = HashMap::with_capacity(plan.len());
    for name in &plan.order {
        let unit = graph.unit(name).ok_or_else(|| PrecompileError::UnknownUnit {
            name: name.to_string(),
            referenced_by: None,
        })?;
        in_degree.insert(name, unit.children().len());
    }

    // 2. Leaves first, in resolver order
    let mut queue: Vec<&UnitName> = plan
        .order
        .iter()
        .filter(|name| in_degree.get(name) == Some(&0))
        .collect();

    let mut levels: Vec<BuildLevel> = Vec::new();
    let mut scheduled_count = 0;

    while !queue.is_empty() {
        let current: Vec<&UnitName> = std::mem::take(&mut queue);
        scheduled_count += current.len();

        let mut next: Vec<&UnitName> = Vec::new();
        for node in &current {
            for parent in plan.dependents_of(node) {
                let Some(degree) = in_degree.get_mut(parent) else {
                    continue;
                };
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    next.push(parent);
                }
            }
        }

        levels.push(BuildLevel::new(
            levels.len(),
            current.into_iter().cloned().collect(),
        ));

        // Sort next level for determinism
        next.sort_by_key(|name| position.get(name).copied().unwrap_or(usize::MAX));
        queue = next;
    }

    if scheduled_count < plan.len() {
        return Err(PrecompileError::Internal(format!(
            "level schedule left {} of {} units unscheduled",
            plan.len() - scheduled_count,
            plan.len()
        )));
    }

    Ok(BuildSchedule::new(levels))
}
