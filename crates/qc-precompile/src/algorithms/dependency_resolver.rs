//! Dependency Resolver
//!
//! Depth-first post-order over child references. A unit is emitted once all
//! of its children have been emitted; ties follow child declaration order.
//! O(V + E), detects cycles while walking.

use crate::domain::graph::UnitGraph;
use crate::domain::value_objects::UnitName;
use crate::errors::PrecompileError;
use std::collections::HashMap;

/// Traversal limits applied while resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveLimits {
    /// Maximum distinct units reachable from the root.
    pub max_units: usize,
    /// Maximum nesting depth of child references (root is depth 0).
    pub max_depth: usize,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self {
            max_units: 1024,
            max_depth: 64,
        }
    }
}

/// Build order for one root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildPlan {
    /// Root unit; always the last entry of `order`.
    pub root: UnitName,
    /// Units in build order, children first.
    pub order: Vec<UnitName>,
    /// Parents of each unit, in build order.
    pub dependents: HashMap<UnitName, Vec<UnitName>>,
}

impl BuildPlan {
    /// Number of units in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the plan is empty (never the case for a resolved plan).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `unit` in the build order.
    #[must_use]
    pub fn position(&self, unit: &UnitName) -> Option<usize> {
        self.order.iter().position(|u| u == unit)
    }

    /// Units that list `unit` as a child.
    #[must_use]
    pub fn dependents_of(&self, unit: &UnitName) -> &[UnitName] {
        self.dependents.get(unit).map_or(&[], Vec::as_slice)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Resolve the build order of everything reachable from `root`.
///
/// # Errors
///
/// - `UnknownUnit` if the root or a referenced child is not in the graph
/// - `CyclicDependency` naming the cycle (first and last entries equal)
/// - `DepthExceeded` / `GraphTooLarge` when a limit is crossed
pub fn resolve(
    graph: &UnitGraph,
    root: &str,
    limits: ResolveLimits,
) -> Result<BuildPlan, PrecompileError> {
    let root_unit = graph.get(root).ok_or_else(|| PrecompileError::UnknownUnit {
        name: root.to_string(),
        referenced_by: None,
    })?;

    let mut marks: HashMap<UnitName, Mark> = HashMap::new();
    let mut order: Vec<UnitName> = Vec::new();
    // (unit, index of the next child to visit)
    let mut stack: Vec<(UnitName, usize)> = vec![(root_unit.name().clone(), 0)];
    marks.insert(root_unit.name().clone(), Mark::OnStack);

    while let Some((current, next_child)) = stack.last_mut() {
        let Some(unit) = graph.unit(current) else {
            return Err(PrecompileError::Internal(format!(
                "unit `{current}` vanished from graph"
            )));
        };

        let Some(child) = unit.children().get(*next_child) else {
            // All children emitted
            let done = current.clone();
            stack.pop();
            marks.insert(done.clone(), Mark::Done);
            order.push(done);
            continue;
        };
        *next_child += 1;

        match marks.get(child) {
            Some(Mark::Done) => continue,
            Some(Mark::OnStack) => {
                let start = stack.iter().position(|(u, _)| u == child).unwrap_or(0);
                let mut cycle: Vec<UnitName> =
                    stack[start..].iter().map(|(u, _)| u.clone()).collect();
                cycle.push(child.clone());
                return Err(PrecompileError::CyclicDependency { cycle });
            }
            None => {}
        }

        if !graph.contains(child.as_str()) {
            return Err(PrecompileError::UnknownUnit {
                name: child.to_string(),
                referenced_by: Some(unit.name().clone()),
            });
        }

        let depth = stack.len();
        if depth > limits.max_depth {
            return Err(PrecompileError::DepthExceeded {
                unit: child.clone(),
                depth,
                max: limits.max_depth,
            });
        }

        if marks.len() + 1 > limits.max_units {
            return Err(PrecompileError::GraphTooLarge {
                size: marks.len() + 1,
                max: limits.max_units,
            });
        }

        marks.insert(child.clone(), Mark::OnStack);
        stack.push((child.clone(), 0));
    }

    let mut dependents: HashMap<UnitName, Vec<UnitName>> = HashMap::new();
    for name in &order {
        if let Some(unit) = graph.unit(name) {
            for child in unit.children() {
                dependents.entry(child.clone()).or_default().push(name.clone());
            }
        }
    }

    Ok(BuildPlan {
        root: root_unit.name().clone(),
        order,
        dependents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::UnitDescriptor;
    use crate::domain::invariants::invariant_children_first;
    use proptest::prelude::*;

    fn unit(name: &str, children: &[&str]) -> UnitDescriptor {
        children
            .iter()
            .fold(UnitDescriptor::stateful(name), |b, c| b.child(*c))
            .build()
            .unwrap()
    }

    fn graph(units: Vec<UnitDescriptor>) -> UnitGraph {
        let mut graph = UnitGraph::new();
        for u in units {
            graph.add(u).unwrap();
        }
        graph
    }

    fn names(plan: &BuildPlan) -> Vec<&str> {
        plan.order.iter().map(UnitName::as_str).collect()
    }

    /// Test: R -> [A, B], A -> [C], B -> [C]
    /// Expected: C emitted once, before A and B
    #[test]
    fn test_shared_child_emitted_once() {
        let g = graph(vec![
            unit("C", &[]),
            unit("A", &["C"]),
            unit("B", &["C"]),
            unit("R", &["A", "B"]),
        ]);
        let plan = resolve(&g, "R", ResolveLimits::default()).unwrap();

        assert_eq!(names(&plan), vec!["C", "A", "B", "R"]);
        assert_eq!(plan.root.as_str(), "R");
        let c = UnitName::new("C").unwrap();
        let parents: Vec<_> = plan.dependents_of(&c).iter().map(UnitName::as_str).collect();
        assert_eq!(parents, vec!["A", "B"]);
        assert!(plan.dependents_of(&plan.root).is_empty());
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let g = graph(vec![
            unit("X", &[]),
            unit("Y", &[]),
            unit("R1", &["Y", "X"]),
            unit("R2", &["X", "Y"]),
        ]);
        let p1 = resolve(&g, "R1", ResolveLimits::default()).unwrap();
        let p2 = resolve(&g, "R2", ResolveLimits::default()).unwrap();
        assert_eq!(names(&p1), vec!["Y", "X", "R1"]);
        assert_eq!(names(&p2), vec!["X", "Y", "R2"]);
    }

    #[test]
    fn test_only_reachable_units() {
        let g = graph(vec![unit("C", &[]), unit("Other", &[]), unit("R", &["C"])]);
        let plan = resolve(&g, "R", ResolveLimits::default()).unwrap();
        assert_eq!(names(&plan), vec!["C", "R"]);
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let g = graph(vec![
            unit("R", &["A"]),
            unit("A", &["B"]),
            unit("B", &["A"]),
        ]);
        let err = resolve(&g, "R", ResolveLimits::default()).unwrap_err();
        match err {
            PrecompileError::CyclicDependency { cycle } => {
                let cycle: Vec<_> = cycle.iter().map(UnitName::as_str).collect();
                assert_eq!(cycle, vec!["A", "B", "A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let g = graph(vec![unit("A", &["A"])]);
        assert!(matches!(
            resolve(&g, "A", ResolveLimits::default()),
            Err(PrecompileError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_units() {
        let g = graph(vec![unit("R", &["Missing"])]);
        let err = resolve(&g, "R", ResolveLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            PrecompileError::UnknownUnit { ref name, referenced_by: Some(ref p) }
                if name == "Missing" && p.as_str() == "R"
        ));

        assert!(matches!(
            resolve(&g, "Nope", ResolveLimits::default()),
            Err(PrecompileError::UnknownUnit { referenced_by: None, .. })
        ));
    }

    #[test]
    fn test_limits() {
        let g = graph(vec![
            unit("D", &[]),
            unit("C", &["D"]),
            unit("B", &["C"]),
            unit("A", &["B"]),
        ]);

        let shallow = ResolveLimits {
            max_units: 100,
            max_depth: 2,
        };
        assert!(matches!(
            resolve(&g, "A", shallow),
            Err(PrecompileError::DepthExceeded { depth: 3, max: 2, .. })
        ));

        let small = ResolveLimits {
            max_units: 3,
            max_depth: 100,
        };
        assert!(matches!(
            resolve(&g, "A", small),
            Err(PrecompileError::GraphTooLarge { size: 4, max: 3 })
        ));

        let exact = ResolveLimits {
            max_units: 4,
            max_depth: 3,
        };
        assert_eq!(resolve(&g, "A", exact).unwrap().len(), 4);
    }

    /// Random DAG: unit `U{i}` may only reference `U{j}` with `j < i`, and
    /// the root references every unit.
    fn random_dag(edges: &[Vec<bool>]) -> UnitGraph {
        let n = edges.len();
        let mut units = Vec::with_capacity(n + 1);
        for (i, row) in edges.iter().enumerate() {
            let mut builder = UnitDescriptor::signature(format!("U{i}"));
            for (j, present) in row.iter().enumerate().take(i) {
                if *present {
                    builder = builder.child(format!("U{j}"));
                }
            }
            units.push(builder.build().unwrap());
        }
        let root = (0..n)
            .rev()
            .fold(UnitDescriptor::stateful("Root"), |b, i| b.child(format!("U{i}")))
            .build()
            .unwrap();
        units.push(root);
        graph(units)
    }

    proptest! {
        #[test]
        fn prop_children_before_parents(
            edges in (1usize..16).prop_flat_map(|n| {
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n)
            })
        ) {
            let g = random_dag(&edges);
            let plan = resolve(&g, "Root", ResolveLimits::default()).unwrap();

            prop_assert_eq!(plan.len(), edges.len() + 1);
            prop_assert!(invariant_children_first(&plan.order, &g));
            prop_assert_eq!(plan.order.last().map(UnitName::as_str), Some("Root"));

            let again = resolve(&g, "Root", ResolveLimits::default()).unwrap();
            prop_assert_eq!(plan.order, again.order);
        }
    }
}
