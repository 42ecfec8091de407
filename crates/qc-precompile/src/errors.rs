//! # Error Types
//!
//! All error types for precompilation. Every build-time failure names the
//! offending unit, and the variable where one is involved.

use crate::domain::value_objects::UnitName;
use thiserror::Error;

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors that can occur while declaring or building units.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// A unit references itself, directly or transitively.
    #[error("cyclic dependency: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Units along the cycle, first unit repeated at the end.
        cycle: Vec<UnitName>,
    },

    /// A variable name was declared twice on one unit.
    #[error("duplicate template variable `{name}` on unit `{unit}`")]
    DuplicateName {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Duplicated variable name.
        name: String,
    },

    /// A declared variable could not be located in the compiled program.
    #[error("template variable `{variable}` of unit `{unit}` not found in program")]
    TemplateNotFound {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
    },

    /// A variable's sentinel occurs more than once in the compiled program.
    #[error("template variable `{variable}` of unit `{unit}` is ambiguous: {occurrences} occurrences")]
    AmbiguousTemplate {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
        /// Number of matches found.
        occurrences: usize,
    },

    /// A value's encoded width differs from the declared width.
    #[error("width mismatch for `{unit}.{variable}`: declared {expected} bytes, value needs {actual}")]
    WidthMismatch {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
        /// Declared width in bytes.
        expected: usize,
        /// Bytes the value needs.
        actual: usize,
    },

    /// A variable's resolver failed.
    #[error("resolver for `{unit}.{variable}` failed: {message}")]
    ResolverError {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
        /// Message returned by the resolver.
        message: String,
    },

    /// The compiler adapter rejected the rendered source.
    #[error("compilation of `{unit}` failed: {diagnostic}")]
    SourceCompileError {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Compiler diagnostic.
        diagnostic: String,
    },

    /// A unit name that is not part of the graph.
    #[error("unknown unit `{name}`{}", referenced_by_suffix(.referenced_by))]
    UnknownUnit {
        /// Unknown unit name.
        name: String,
        /// Unit whose child list names it, if any.
        referenced_by: Option<UnitName>,
    },

    /// Two descriptors with the same name were added to one graph.
    #[error("duplicate unit `{0}`")]
    DuplicateUnit(UnitName),

    /// A unit or variable name that is not an identifier.
    #[error("invalid name `{0}`: expected [A-Za-z0-9_]+")]
    InvalidName(String),

    /// A declared width outside the allowed range for its kind.
    #[error("invalid width for `{unit}.{variable}`: {width}")]
    InvalidWidth {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
        /// Rejected width in bytes.
        width: usize,
    },

    /// The template references an undeclared variable or child.
    #[error("undeclared placeholder `{placeholder}` in unit `{unit}`")]
    UndeclaredPlaceholder {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Placeholder token as written in the source.
        placeholder: String,
    },

    /// A bytes value for an integer variable, or the other way round.
    #[error("kind mismatch for `{unit}.{variable}`: expected {expected}, got {actual}")]
    KindMismatch {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
        /// Kind the variable declares.
        expected: &'static str,
        /// Kind of the supplied value.
        actual: &'static str,
    },

    /// A value required to populate an open slot was not supplied.
    #[error("missing value for open slot `{unit}.{variable}`")]
    MissingValue {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Template variable involved.
        variable: String,
    },

    /// Too many units reachable from the root.
    #[error("build graph too large: {size} > {max} units")]
    GraphTooLarge {
        /// Units reachable from the root.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Child references nest deeper than allowed.
    #[error("nesting depth exceeded at `{unit}`: {depth} > {max}")]
    DepthExceeded {
        /// Unit the error is attributed to.
        unit: UnitName,
        /// Nesting depth reached.
        depth: usize,
        /// Configured limit.
        max: usize,
    },

    /// Internal error (should not happen in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PrecompileError {
    /// The unit this error is attributed to, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitName> {
        match self {
            Self::DuplicateName { unit, .. }
            | Self::TemplateNotFound { unit, .. }
            | Self::AmbiguousTemplate { unit, .. }
            | Self::WidthMismatch { unit, .. }
            | Self::ResolverError { unit, .. }
            | Self::SourceCompileError { unit, .. }
            | Self::InvalidWidth { unit, .. }
            | Self::UndeclaredPlaceholder { unit, .. }
            | Self::KindMismatch { unit, .. }
            | Self::MissingValue { unit, .. }
            | Self::DepthExceeded { unit, .. } => Some(unit),
            Self::DuplicateUnit(unit) => Some(unit),
            Self::UnknownUnit { referenced_by, .. } => referenced_by.as_ref(),
            Self::CyclicDependency { cycle } => cycle.first(),
            Self::InvalidName(_) | Self::GraphTooLarge { .. } | Self::Internal(_) => None,
        }
    }
}

fn format_cycle(cycle: &[UnitName]) -> String {
    cycle
        .iter()
        .map(UnitName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn referenced_by_suffix(referenced_by: &Option<UnitName>) -> String {
    referenced_by
        .as_ref()
        .map(|parent| format!(" (referenced by `{parent}`)"))
        .unwrap_or_default()
}

// =============================================================================
// VALUE ENCODING ERRORS
// =============================================================================

/// Context-free failure encoding a value for a slot.
///
/// The engine attaches unit and variable names when converting this into a
/// [`PrecompileError`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    /// Bytes for an integer slot or an integer for a bytes slot.
    #[error("expected {expected}, got {actual}")]
    KindMismatch {
        /// Kind the slot declares.
        expected: &'static str,
        /// Kind of the supplied value.
        actual: &'static str,
    },

    /// Encoded length differs from the slot width.
    #[error("expected {expected} bytes, got {actual}")]
    WidthMismatch {
        /// Slot width in bytes.
        expected: usize,
        /// Bytes the value needs.
        actual: usize,
    },
}

impl ValueError {
    /// Attaches the unit and variable the value was meant for.
    #[must_use]
    pub fn in_slot(self, unit: &UnitName, variable: &str) -> PrecompileError {
        match self {
            Self::KindMismatch { expected, actual } => PrecompileError::KindMismatch {
                unit: unit.clone(),
                variable: variable.to_string(),
                expected,
                actual,
            },
            Self::WidthMismatch { expected, actual } => PrecompileError::WidthMismatch {
                unit: unit.clone(),
                variable: variable.to_string(),
                expected,
                actual,
            },
        }
    }
}

// =============================================================================
// BUILD FAILURE REPORT
// =============================================================================

/// One failed unit within a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    /// The unit the error is attributed to; `None` for graph-level errors
    /// without a unit (such as an invalid root name).
    pub unit: Option<UnitName>,
    /// What went wrong.
    pub error: PrecompileError,
}

impl UnitFailure {
    /// Wraps an error, attributing it to the unit it names.
    #[must_use]
    pub fn new(error: PrecompileError) -> Self {
        Self {
            unit: error.unit().cloned(),
            error,
        }
    }
}

/// Structured report of a failed build.
///
/// Failures of independent subtrees are all collected; units that were not
/// attempted because a descendant failed are listed in `skipped`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("build of `{root}` failed: {} unit(s) failed, {} skipped", .failures.len(), .skipped.len())]
pub struct BuildFailure {
    /// Root requested by the caller.
    pub root: String,
    /// Failures in build order.
    pub failures: Vec<UnitFailure>,
    /// Units not attempted because a child failed or the build stopped early.
    pub skipped: Vec<UnitName>,
}

impl BuildFailure {
    /// A failure with a single error and nothing skipped.
    #[must_use]
    pub fn single(root: impl Into<String>, error: PrecompileError) -> Self {
        Self {
            root: root.into(),
            failures: vec![UnitFailure::new(error)],
            skipped: Vec::new(),
        }
    }

    /// Iterates the collected errors.
    pub fn errors(&self) -> impl Iterator<Item = &PrecompileError> {
        self.failures.iter().map(|f| &f.error)
    }

    /// The first failure in build order.
    #[must_use]
    pub fn first(&self) -> Option<&PrecompileError> {
        self.failures.first().map(|f| &f.error)
    }

    /// Returns the error recorded for `unit`, if that unit failed.
    #[must_use]
    pub fn error_for(&self, unit: &str) -> Option<&PrecompileError> {
        self.failures
            .iter()
            .find(|f| f.unit.as_ref().is_some_and(|u| u.as_str() == unit))
            .map(|f| &f.error)
    }

    /// Returns true if `unit` was skipped.
    #[must_use]
    pub fn was_skipped(&self, unit: &str) -> bool {
        self.skipped.iter().any(|u| u.as_str() == unit)
    }
}

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Errors from encoding or decoding the persisted artifact form.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON (de)serialization failed.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary (de)serialization failed.
    #[error("binary codec error: {0}")]
    Binary(#[from] bincode::Error),

    /// Decoded artifact whose hash, address or slots disagree with its bytecode.
    #[error("decoded artifact `{0}` is inconsistent with its bytecode")]
    Inconsistent(UnitName),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> UnitName {
        UnitName::new(s).unwrap()
    }

    #[test]
    fn test_cycle_display() {
        let err = PrecompileError::CyclicDependency {
            cycle: vec![name("A"), name("B"), name("A")],
        };
        assert_eq!(err.to_string(), "cyclic dependency: A -> B -> A");
        assert_eq!(err.unit(), Some(&name("A")));
    }

    #[test]
    fn test_unknown_unit_display() {
        let err = PrecompileError::UnknownUnit {
            name: "Missing".to_string(),
            referenced_by: Some(name("Parent")),
        };
        assert_eq!(
            err.to_string(),
            "unknown unit `Missing` (referenced by `Parent`)"
        );

        let err = PrecompileError::UnknownUnit {
            name: "Root".to_string(),
            referenced_by: None,
        };
        assert_eq!(err.to_string(), "unknown unit `Root`");
    }

    #[test]
    fn test_value_error_in_slot() {
        let err = ValueError::WidthMismatch {
            expected: 32,
            actual: 31,
        }
        .in_slot(&name("C"), "hash32");
        assert!(matches!(
            err,
            PrecompileError::WidthMismatch {
                expected: 32,
                actual: 31,
                ..
            }
        ));
        assert!(err.to_string().contains("C.hash32"));
    }

    #[test]
    fn test_build_failure_display() {
        let failure = BuildFailure::single(
            "R",
            PrecompileError::SourceCompileError {
                unit: name("C"),
                diagnostic: "boom".to_string(),
            },
        );
        assert_eq!(
            failure.to_string(),
            "build of `R` failed: 1 unit(s) failed, 0 skipped"
        );
        assert!(failure.error_for("C").is_some());
        assert!(failure.error_for("R").is_none());
        assert!(!failure.was_skipped("R"));

        let graph_level = BuildFailure::single("bad root", PrecompileError::InvalidName("bad root".into()));
        assert_eq!(graph_level.failures[0].unit, None);
    }
}
