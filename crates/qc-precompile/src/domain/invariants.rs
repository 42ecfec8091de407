//! Domain invariants for precompilation
//!
//! Checked by the engine in debug builds and by the test suite.

use super::entities::{CompiledArtifact, UnitKind};
use super::graph::UnitGraph;
use super::services::{content_hash, derive_address, sentinel, SlotState};
use super::value_objects::UnitName;
use std::collections::HashSet;

/// INVARIANT-1: Children First
/// Every child appears strictly before every unit that references it.
pub fn invariant_children_first(order: &[UnitName], graph: &UnitGraph) -> bool {
    let mut emitted: HashSet<&UnitName> = HashSet::new();

    for name in order {
        let Some(unit) = graph.unit(name) else {
            return false;
        };
        if unit.children().iter().any(|child| !emitted.contains(child)) {
            return false;
        }
        if !emitted.insert(name) {
            // Emitted twice
            return false;
        }
    }

    true
}

/// INVARIANT-2: Content Identity
/// The content hash is derived from the bytecode alone, and the address
/// (if any) from the content hash alone.
pub fn invariant_content_identity(artifact: &CompiledArtifact) -> bool {
    if artifact.content_hash != content_hash(&artifact.bytecode) {
        return false;
    }
    match artifact.address {
        Some(address) => address == derive_address(&artifact.content_hash),
        None => true,
    }
}

/// INVARIANT-3: Address Presence
/// Exactly the signature programs without open slots carry an address.
pub fn invariant_address_presence(artifact: &CompiledArtifact) -> bool {
    let expected = artifact.kind == UnitKind::Signature && !artifact.is_template();
    artifact.address.is_some() == expected
}

/// INVARIANT-4: Slots In Bounds
/// Every recorded offset addresses a full slot inside the bytecode.
pub fn invariant_slots_in_bounds(artifact: &CompiledArtifact) -> bool {
    let len = artifact.bytecode.len();
    let fits = |offset: usize, width: usize| offset.checked_add(width).is_some_and(|end| end <= len);

    artifact
        .variable_offsets
        .values()
        .all(|slot| fits(slot.offset, slot.width()))
        && artifact
            .open_slots
            .iter()
            .all(|slot| fits(slot.offset, slot.width()))
}

/// INVARIANT-5: Open Slots Hold Sentinels
/// Nothing has been patched into a slot reported as open.
pub fn invariant_open_slots_unpatched(artifact: &CompiledArtifact) -> bool {
    artifact.open_slots.iter().all(|slot| {
        let expected = sentinel(&slot.unit, &slot.variable, slot.width(), SlotState::Open);
        artifact
            .bytecode
            .get(slot.offset..slot.offset + slot.width())
            .is_some_and(|bytes| bytes == expected.as_slice())
    })
}

/// All artifact invariants at once.
pub fn artifact_invariants_hold(artifact: &CompiledArtifact) -> bool {
    invariant_slots_in_bounds(artifact)
        && invariant_content_identity(artifact)
        && invariant_address_presence(artifact)
        && invariant_open_slots_unpatched(artifact)
}
