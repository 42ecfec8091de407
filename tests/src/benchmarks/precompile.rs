//! # Benchmark Fixture Graphs
//!
//! Brutal conditions:
//! - Deep chains close to the nesting limit
//! - Wide fan-in where every parent shares the same leaves
//! - Layered DAGs where every unit binds a child address

use qc_precompile::prelude::*;

/// A signature leaf with one open 32-byte slot and a marker comment.
pub fn leaf(name: &str) -> UnitDescriptor {
    UnitDescriptor::signature(name)
        .source(format!(
            "#pragma version 8 // {name}\npushbytes TMPL_seed\nsha256\npop\npushint 1\nreturn"
        ))
        .variable(TemplateVariable::bytes("seed", 32))
        .build()
        .expect("leaf descriptor")
}

/// A stateful unit embedding `children` and binding the first child's hash.
pub fn node(name: &str, children: &[String]) -> UnitDescriptor {
    let mut source = format!("#pragma version 8 // {name}");
    let mut builder = UnitDescriptor::stateful(name);
    for child in children {
        source.push_str(&format!("\npushbytes CHILD_{child}\npop"));
        builder = builder.child(child.clone());
    }
    if let Some(first) = children.first() {
        source.push_str("\npushbytes TMPL_first\nlog");
        builder = builder.variable(TemplateVariable::bytes("first", 32).from_child_hash(first.clone()));
    }
    source.push_str("\npushint 1\nreturn");
    builder.source(source).build().expect("node descriptor")
}

/// `U0 <- U1 <- ... <- U{depth}`: each unit embeds the previous one.
///
/// The root is `U{depth}`.
pub fn chain(depth: usize) -> UnitGraph {
    let mut graph = UnitGraph::new();
    graph.add(leaf("U0")).expect("unique");
    for i in 1..=depth {
        graph
            .add(node(&format!("U{i}"), &[format!("U{}", i - 1)]))
            .expect("unique");
    }
    graph
}

/// `layers` levels of `width` units; every unit embeds every unit of the
/// level below. The root `Root` embeds the top level.
pub fn layered(layers: usize, width: usize) -> UnitGraph {
    let mut graph = UnitGraph::new();
    let mut below: Vec<String> = (0..width).map(|i| format!("L0_{i}")).collect();
    for name in &below {
        graph.add(leaf(name)).expect("unique");
    }
    for layer in 1..layers {
        let current: Vec<String> = (0..width).map(|i| format!("L{layer}_{i}")).collect();
        for name in &current {
            graph.add(node(name, &below)).expect("unique");
        }
        below = current;
    }
    graph.add(node("Root", &below)).expect("unique");
    graph
}

/// Seed bindings for every leaf of a generated graph.
pub fn seeds(byte: u8) -> ExternalBindings {
    ExternalBindings::new().with("seed", [byte; 32])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        assert_eq!(chain(5).len(), 6);
        assert_eq!(layered(3, 4).len(), 13);

        let engine = PrecompileEngine::new(LineAssembler::new());
        let plan = engine.plan(&layered(3, 4), "Root").unwrap();
        assert_eq!(plan.len(), 13);
        assert_eq!(plan.order.last().map(UnitName::as_str), Some("Root"));
    }
}
