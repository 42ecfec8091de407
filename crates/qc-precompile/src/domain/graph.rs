//! # Unit Graph
//!
//! Arena of unit descriptors keyed by name. Child references are names, so a
//! graph can describe cycles; the dependency resolver rejects them.

use crate::domain::entities::UnitDescriptor;
use crate::domain::value_objects::UnitName;
use crate::errors::PrecompileError;
use std::collections::HashMap;
use std::sync::Arc;

/// All descriptors of one build session.
#[derive(Clone, Debug, Default)]
pub struct UnitGraph {
    units: HashMap<UnitName, Arc<UnitDescriptor>>,
    /// Names in insertion order.
    order: Vec<UnitName>,
}

impl UnitGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// `DuplicateUnit` if a unit of the same name is already present.
    pub fn add(&mut self, unit: UnitDescriptor) -> Result<(), PrecompileError> {
        let name = unit.name().clone();
        if self.units.contains_key(&name) {
            return Err(PrecompileError::DuplicateUnit(name));
        }
        self.order.push(name.clone());
        self.units.insert(name, Arc::new(unit));
        Ok(())
    }

    /// Builder-style [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn with(mut self, unit: UnitDescriptor) -> Result<Self, PrecompileError> {
        self.add(unit)?;
        Ok(self)
    }

    /// Looks up a unit by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<UnitDescriptor>> {
        let name = UnitName::new(name)?;
        self.units.get(&name)
    }

    /// Looks up a unit by typed name.
    #[must_use]
    pub fn unit(&self, name: &UnitName) -> Option<&Arc<UnitDescriptor>> {
        self.units.get(name)
    }

    /// Returns true if `name` is in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the graph holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &UnitName> {
        self.order.iter()
    }
}
