//! # Domain Entities
//!
//! Unit descriptors, template variable declarations and compiled artifacts.
//! Descriptors are immutable once built; artifacts are read-only once created.

use crate::domain::registry::TemplateRegistry;
use crate::domain::services::{content_hash, derive_address, encode_value, patch};
use crate::domain::value_objects::{
    Address, ExternalBindings, Hash, TemplateValue, UnitName, ValueKind,
};
use crate::errors::PrecompileError;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sha2::{Digest, Sha512_256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// UNIT KIND
// =============================================================================

/// What a unit compiles to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Signature program; identified by its content address.
    Signature,
    /// Stateful program; its on-chain id is assigned at deployment.
    StatefulProgram,
}

impl UnitKind {
    const fn tag(self) -> u8 {
        match self {
            Self::Signature => 0x01,
            Self::StatefulProgram => 0x02,
        }
    }
}

// =============================================================================
// VARIABLE SOURCES
// =============================================================================

/// A resolver callable. Must be a pure function of its context.
pub type Resolver =
    Arc<dyn Fn(&ResolveContext<'_>) -> Result<TemplateValue, String> + Send + Sync>;

/// Where a variable's value comes from when no external binding is given.
#[derive(Clone)]
pub enum VariableSource {
    /// Only an external binding can fill the slot; otherwise it stays open.
    Open,
    /// Computed by a resolver callable.
    Resolver(Resolver),
    /// The content address of a child signature program.
    ChildAddress(String),
    /// The content hash of a child's bytecode.
    ChildContentHash(String),
}

impl VariableSource {
    /// The child this source depends on, if any.
    #[must_use]
    pub fn child(&self) -> Option<&str> {
        match self {
            Self::ChildAddress(child) | Self::ChildContentHash(child) => Some(child),
            Self::Open | Self::Resolver(_) => None,
        }
    }

    fn tag(&self) -> String {
        match self {
            Self::Open => "open".to_string(),
            Self::Resolver(_) => "resolver".to_string(),
            Self::ChildAddress(child) => format!("address:{child}"),
            Self::ChildContentHash(child) => format!("hash:{child}"),
        }
    }
}

impl fmt::Debug for VariableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
            Self::ChildAddress(child) => f.debug_tuple("ChildAddress").field(child).finish(),
            Self::ChildContentHash(child) => {
                f.debug_tuple("ChildContentHash").field(child).finish()
            }
        }
    }
}

/// Read-only view handed to resolver callables.
pub struct ResolveContext<'a> {
    pub(crate) unit: &'a UnitName,
    pub(crate) variable: &'a str,
    pub(crate) external: &'a ExternalBindings,
    pub(crate) children: &'a BTreeMap<UnitName, Arc<CompiledArtifact>>,
}

impl<'a> ResolveContext<'a> {
    /// Unit being built.
    #[must_use]
    pub fn unit(&self) -> &'a UnitName {
        self.unit
    }

    /// Variable being resolved.
    #[must_use]
    pub fn variable(&self) -> &'a str {
        self.variable
    }

    /// Bindings supplied by the caller of the build.
    #[must_use]
    pub fn external(&self) -> &'a ExternalBindings {
        self.external
    }

    /// Artifact of an already-built child of this unit.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&'a CompiledArtifact> {
        self.children
            .iter()
            .find(|(child, _)| child.as_str() == name)
            .map(|(_, artifact)| artifact.as_ref())
    }
}

// =============================================================================
// TEMPLATE VARIABLE
// =============================================================================

/// Declaration of a named, fixed-width slot in a unit's source.
#[derive(Clone, Debug)]
pub struct TemplateVariable {
    name: String,
    kind: ValueKind,
    source: VariableSource,
}

impl TemplateVariable {
    /// Creates a declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind, source: VariableSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
        }
    }

    /// An open byte-string slot of `width` bytes.
    #[must_use]
    pub fn bytes(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::bytes(width), VariableSource::Open)
    }

    /// An open u64 slot.
    #[must_use]
    pub fn uint(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::uint(), VariableSource::Open)
    }

    /// Attaches a resolver callable.
    #[must_use]
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<TemplateValue, String> + Send + Sync + 'static,
    {
        self.source = VariableSource::Resolver(Arc::new(resolver));
        self
    }

    /// Binds the slot to the content address of `child`.
    #[must_use]
    pub fn from_child_address(mut self, child: impl Into<String>) -> Self {
        self.source = VariableSource::ChildAddress(child.into());
        self
    }

    /// Binds the slot to the content hash of `child`.
    #[must_use]
    pub fn from_child_hash(mut self, child: impl Into<String>) -> Self {
        self.source = VariableSource::ChildContentHash(child.into());
        self
    }

    /// Variable name, unique within its unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and width.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Value source.
    #[must_use]
    pub fn source(&self) -> &VariableSource {
        &self.source
    }
}

// =============================================================================
// UNIT DESCRIPTOR
// =============================================================================

/// Compile-time representation of one program definition.
#[derive(Clone, Debug)]
pub struct UnitDescriptor {
    name: UnitName,
    kind: UnitKind,
    source_template: String,
    variables: TemplateRegistry,
    children: Vec<UnitName>,
    fingerprint: Hash,
}

impl UnitDescriptor {
    /// Starts a signature program descriptor.
    #[must_use]
    pub fn signature(name: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(name, UnitKind::Signature)
    }

    /// Starts a stateful program descriptor.
    #[must_use]
    pub fn stateful(name: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(name, UnitKind::StatefulProgram)
    }

    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &UnitName {
        &self.name
    }

    /// Unit kind.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Source text with `TMPL_` / `CHILD_` placeholders.
    #[must_use]
    pub fn source_template(&self) -> &str {
        &self.source_template
    }

    /// Declared variables.
    #[must_use]
    pub fn variables(&self) -> &TemplateRegistry {
        &self.variables
    }

    /// Child units in declaration order.
    #[must_use]
    pub fn children(&self) -> &[UnitName] {
        &self.children
    }

    /// Returns true if `name` is a declared child.
    #[must_use]
    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.as_str() == name)
    }

    /// Digest of everything that shapes this unit's rendered source except
    /// bound values and child outputs.
    #[must_use]
    pub fn fingerprint(&self) -> Hash {
        self.fingerprint
    }

    fn compute_fingerprint(&self) -> Hash {
        let mut hasher = Sha512_256::new();
        hasher.update([self.kind.tag()]);
        hasher.update(self.name.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update((self.source_template.len() as u64).to_be_bytes());
        hasher.update(self.source_template.as_bytes());
        for var in self.variables.iter() {
            hasher.update(var.name().as_bytes());
            hasher.update([0u8]);
            hasher.update(var.kind().to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(var.source().tag().as_bytes());
            hasher.update([0u8]);
        }
        for child in &self.children {
            hasher.update(child.as_str().as_bytes());
            hasher.update([0u8]);
        }
        Hash::new(hasher.finalize().into())
    }
}

/// Builder for [`UnitDescriptor`].
#[derive(Debug)]
pub struct UnitBuilder {
    name: String,
    kind: UnitKind,
    source: String,
    variables: Vec<TemplateVariable>,
    children: Vec<String>,
}

impl UnitBuilder {
    fn new(name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            source: String::new(),
            variables: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the source template.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Declares a variable.
    #[must_use]
    pub fn variable(mut self, variable: TemplateVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Declares a child unit. Repeated names are kept once.
    #[must_use]
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.children.push(name.into());
        self
    }

    /// Validates and freezes the descriptor.
    ///
    /// # Errors
    ///
    /// - `InvalidName` for a bad unit, child or variable name
    /// - `DuplicateName` / `InvalidWidth` from the variable registry
    /// - `UnknownUnit` if a variable is bound to a child that is not declared
    pub fn build(self) -> Result<UnitDescriptor, PrecompileError> {
        let name = UnitName::new(self.name.clone())
            .ok_or_else(|| PrecompileError::InvalidName(self.name.clone()))?;

        let mut children: Vec<UnitName> = Vec::with_capacity(self.children.len());
        for child in self.children {
            let child =
                UnitName::new(child.clone()).ok_or(PrecompileError::InvalidName(child))?;
            if !children.contains(&child) {
                children.push(child);
            }
        }

        let mut variables = TemplateRegistry::new(name.clone());
        for variable in self.variables {
            if let Some(child) = variable.source().child() {
                if !children.iter().any(|c| c.as_str() == child) {
                    return Err(PrecompileError::UnknownUnit {
                        name: child.to_string(),
                        referenced_by: Some(name),
                    });
                }
            }
            variables.insert(variable)?;
        }

        let mut descriptor = UnitDescriptor {
            name,
            kind: self.kind,
            source_template: self.source,
            variables,
            children,
            fingerprint: Hash::ZERO,
        };
        descriptor.fingerprint = descriptor.compute_fingerprint();
        Ok(descriptor)
    }
}

// =============================================================================
// COMPILED ARTIFACT
// =============================================================================

/// Location of a declared variable in a unit's own bytecode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOffset {
    /// Byte offset of the slot.
    pub offset: usize,
    /// Kind and width of the slot.
    pub kind: ValueKind,
    /// True if a value was patched in at build time.
    pub resolved: bool,
}

impl VariableOffset {
    /// Slot width in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.kind.width()
    }
}

/// A slot still carrying its sentinel, to be patched later.
///
/// Slots of embedded children are reported in the embedding artifact's
/// offsets, attributed to the child unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    /// Unit that declared the variable.
    pub unit: UnitName,
    /// Variable name.
    pub variable: String,
    /// Byte offset within the artifact's bytecode.
    pub offset: usize,
    /// Kind and width of the slot.
    pub kind: ValueKind,
}

impl OpenSlot {
    /// Slot width in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.kind.width()
    }
}

/// Compiled, fully or partially patched output of a unit.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    /// Unit this artifact was built from.
    pub unit: UnitName,
    /// Unit kind.
    pub kind: UnitKind,
    /// Final bytecode with every bound value patched in.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub bytecode: Vec<u8>,
    /// Offsets of every declared variable.
    pub variable_offsets: BTreeMap<String, VariableOffset>,
    /// Slots left open, including those of embedded children.
    pub open_slots: Vec<OpenSlot>,
    /// Content hash of `bytecode`.
    pub content_hash: Hash,
    /// Content address; present for signature programs with no open slots.
    pub address: Option<Address>,
    /// Source handed to the compiler adapter.
    pub rendered_source: String,
}

impl CompiledArtifact {
    /// Returns true if some slot still awaits a value.
    #[must_use]
    pub fn is_template(&self) -> bool {
        !self.open_slots.is_empty()
    }

    /// Offset record of a declared variable.
    #[must_use]
    pub fn offset_of(&self, variable: &str) -> Option<&VariableOffset> {
        self.variable_offsets.get(variable)
    }

    /// The bytes currently occupying a declared variable's slot.
    #[must_use]
    pub fn slot_bytes(&self, variable: &str) -> Option<&[u8]> {
        let slot = self.variable_offsets.get(variable)?;
        self.bytecode.get(slot.offset..slot.offset + slot.width())
    }

    /// Splits the bytecode into pages of at most `page_size` bytes.
    #[must_use]
    pub fn pages(&self, page_size: usize) -> Vec<&[u8]> {
        if page_size == 0 || self.bytecode.is_empty() {
            return vec![self.bytecode.as_slice()];
        }
        self.bytecode.chunks(page_size).collect()
    }

    /// Patches every open slot with a caller-supplied value.
    ///
    /// Values are looked up like external bindings (`"<unit>.<variable>"`
    /// first, then `"<variable>"`); unused values are ignored.
    ///
    /// # Errors
    ///
    /// - `MissingValue` if an open slot has no value
    /// - `WidthMismatch` / `KindMismatch` if a value does not fit its slot
    pub fn populate(&self, values: &ExternalBindings) -> Result<PopulatedProgram, PrecompileError> {
        let mut bytecode = self.bytecode.clone();
        for slot in &self.open_slots {
            let value = values.lookup(&slot.unit, &slot.variable).ok_or_else(|| {
                PrecompileError::MissingValue {
                    unit: slot.unit.clone(),
                    variable: slot.variable.clone(),
                }
            })?;
            let encoded =
                encode_value(&slot.kind, value).map_err(|e| e.in_slot(&slot.unit, &slot.variable))?;
            if !patch(&mut bytecode, slot.offset, &encoded) {
                return Err(PrecompileError::Internal(format!(
                    "open slot `{}.{}` at {} lies outside {} bytes",
                    slot.unit,
                    slot.variable,
                    slot.offset,
                    bytecode.len()
                )));
            }
        }

        let hash = content_hash(&bytecode);
        let address = (self.kind == UnitKind::Signature).then(|| derive_address(&hash));
        Ok(PopulatedProgram {
            bytecode,
            content_hash: hash,
            address,
        })
    }
}

/// Result of [`CompiledArtifact::populate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulatedProgram {
    /// Bytecode with every open slot filled.
    pub bytecode: Vec<u8>,
    /// Content hash of the populated bytecode.
    pub content_hash: Hash,
    /// Content address, for signature programs.
    pub address: Option<Address>,
}

// =============================================================================
// TESTS
// =============================================================================
