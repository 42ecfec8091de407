//! # Driven Ports (SPI - Outbound)
//!
//! The precompile engine depends on exactly one external collaborator: a
//! compiler that turns rendered source text into bytecode.
//!
//! - Dependencies point INWARD (adapters implement these traits)
//! - The engine never inspects source syntax beyond placeholder tokens

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// COMPILER ADAPTER
// =============================================================================

/// Named constants reported by a compiler, mapped to their byte offset.
pub type SymbolTable = BTreeMap<String, usize>;

/// Successful compiler output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    /// Emitted bytecode.
    pub bytecode: Vec<u8>,
    /// Optional symbol table; may be empty.
    pub symbols: SymbolTable,
}

impl CompilerOutput {
    /// Output without symbols.
    #[must_use]
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self {
            bytecode,
            symbols: SymbolTable::new(),
        }
    }

    /// Adds a symbol.
    #[must_use]
    pub fn with_symbol(mut self, name: impl Into<String>, offset: usize) -> Self {
        self.symbols.insert(name.into(), offset);
        self
    }
}

/// Diagnostic returned by a compiler that rejected its input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}{message}", .line.map(|l| format!("line {l}: ")).unwrap_or_default())]
pub struct CompileDiagnostic {
    /// Human-readable message.
    pub message: String,
    /// 1-based source line, if known.
    pub line: Option<usize>,
}

impl CompileDiagnostic {
    /// A diagnostic without position.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// A diagnostic at a 1-based line.
    #[must_use]
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Language-to-bytecode compiler.
///
/// ## Implementation Notes
///
/// Implementations must be deterministic: the same source yields the same
/// bytecode. Hex literals (`0x..`) in the source must be emitted verbatim
/// so sentinels can be located in the output.
pub trait CompilerAdapter: Send + Sync {
    /// Compiles rendered source text.
    ///
    /// # Errors
    ///
    /// Returns the compiler's diagnostic on invalid source.
    fn compile(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic>;
}

impl<T: CompilerAdapter + ?Sized> CompilerAdapter for Arc<T> {
    fn compile(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic> {
        (**self).compile(source)
    }
}

impl<T: CompilerAdapter + ?Sized> CompilerAdapter for &T {
    fn compile(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic> {
        (**self).compile(source)
    }
}

// =============================================================================
// TESTS
// =============================================================================
