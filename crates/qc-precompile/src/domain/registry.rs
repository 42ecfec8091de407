//! # Template Variable Registry
//!
//! Explicit, per-unit registry of template variables. A registry is owned by
//! exactly one unit descriptor; there is no process-wide state.

use crate::domain::entities::{Resolver, ResolveContext, TemplateVariable, VariableSource};
use crate::domain::value_objects::{is_identifier, TemplateValue, UnitName, ValueKind};
use crate::errors::PrecompileError;
use std::sync::Arc;

/// Ordered set of template variables declared by one unit.
#[derive(Clone, Debug)]
pub struct TemplateRegistry {
    unit: UnitName,
    variables: Vec<TemplateVariable>,
}

impl TemplateRegistry {
    /// Creates an empty registry for `unit`.
    #[must_use]
    pub fn new(unit: UnitName) -> Self {
        Self {
            unit,
            variables: Vec::new(),
        }
    }

    /// The unit that owns this registry.
    #[must_use]
    pub fn unit(&self) -> &UnitName {
        &self.unit
    }

    /// Declares a variable with an optional resolver.
    ///
    /// # Errors
    ///
    /// - `DuplicateName` if `name` is already declared on this unit
    /// - `InvalidName` if `name` is not an identifier
    /// - `InvalidWidth` if the width is out of range for the kind
    pub fn register<F>(
        &mut self,
        name: &str,
        kind: ValueKind,
        resolver: Option<F>,
    ) -> Result<&TemplateVariable, PrecompileError>
    where
        F: Fn(&ResolveContext<'_>) -> Result<TemplateValue, String> + Send + Sync + 'static,
    {
        let source = match resolver {
            Some(f) => VariableSource::Resolver(Arc::new(f) as Resolver),
            None => VariableSource::Open,
        };
        self.insert(TemplateVariable::new(name, kind, source))
    }

    /// Adds a fully formed variable declaration.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn insert(&mut self, variable: TemplateVariable) -> Result<&TemplateVariable, PrecompileError> {
        if !is_identifier(variable.name()) {
            return Err(PrecompileError::InvalidName(variable.name().to_string()));
        }
        if self.contains(variable.name()) {
            return Err(PrecompileError::DuplicateName {
                unit: self.unit.clone(),
                name: variable.name().to_string(),
            });
        }
        if !variable.kind().has_valid_width() {
            return Err(PrecompileError::InvalidWidth {
                unit: self.unit.clone(),
                variable: variable.name().to_string(),
                width: variable.kind().width(),
            });
        }
        self.variables.push(variable);
        let last = self.variables.len() - 1;
        Ok(&self.variables[last])
    }

    /// Returns true if `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Looks up a declaration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TemplateVariable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    /// Declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TemplateVariable> {
        self.variables.iter()
    }

    /// Number of declared variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
