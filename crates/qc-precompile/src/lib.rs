//! # QC-Precompile - Contract Precompilation Engine
//!
//! **Architecture:** Hexagonal (domain / algorithms / ports / adapters / application)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Builds a program together with every program it embeds, children first.
//! Each unit's source template is rendered with placeholder sentinels,
//! compiled through a pluggable compiler adapter, and patched at the
//! located slot offsets. Child bytecode, content hashes and content
//! addresses flow into parents as compile-time constants.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Children First | `domain/invariants.rs` - `invariant_children_first()` |
//! | INVARIANT-2 | Content Identity | `domain/invariants.rs` - `invariant_content_identity()` |
//! | INVARIANT-3 | Address Presence | `domain/invariants.rs` - `invariant_address_presence()` |
//! | INVARIANT-4 | Slots In Bounds | `domain/invariants.rs` - `invariant_slots_in_bounds()` |
//! | INVARIANT-5 | Open Slots Hold Sentinels | `domain/invariants.rs` - `invariant_open_slots_unpatched()` |
//!
//! ## Build Pipeline
//!
//! | Stage | Location | Purpose |
//! |-------|----------|---------|
//! | Resolve | `algorithms/dependency_resolver.rs` | DFS post-order, cycle detection, limits |
//! | Schedule | `algorithms/kahns.rs` | Independent levels for parallel builds |
//! | Render | `algorithms/template_renderer.rs` | `TMPL_*` sentinels, `CHILD_*` bytecode |
//! | Compile | `ports/outbound.rs` | `CompilerAdapter` port |
//! | Locate | `algorithms/offset_locator.rs` | Symbol table or unique sentinel scan |
//! | Cache | `application/cache.rs` | At most one compile per key |
//! | Persist | `codec.rs` | JSON and bincode artifact forms |
//!
//! ## Safety Limits
//!
//! | Limit | Default | Purpose |
//! |-------|---------|---------|
//! | `max_units` | 1024 | Bound the reachable graph |
//! | `max_depth` | 64 | Bound child nesting |
//! | `page_size` | 2048 | Chunked program submission |
//!
//! ## Usage Example
//!
//! ```
//! use qc_precompile::prelude::*;
//!
//! let graph = UnitGraph::new()
//!     .with(
//!         UnitDescriptor::signature("C")
//!             .source("pushbytes TMPL_hash32\nsha256\nreturn")
//!             .variable(TemplateVariable::bytes("hash32", 32))
//!             .build()?,
//!     )?
//!     .with(
//!         UnitDescriptor::stateful("R")
//!             .source("pushbytes CHILD_C\npop\npushbytes TMPL_c_addr\nlog\nreturn")
//!             .child("C")
//!             .variable(TemplateVariable::bytes("c_addr", 32).from_child_address("C"))
//!             .build()?,
//!     )?;
//!
//! let engine = PrecompileEngine::new(LineAssembler::new());
//! let bindings = ExternalBindings::new().with("C.hash32", [7u8; 32]);
//! let output = engine.build(&graph, "R", &bindings)?;
//!
//! let child = output.artifact("C").expect("built");
//! assert!(child.address.is_some());
//! assert!(output.unresolved().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod codec;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        CompiledArtifact, OpenSlot, PopulatedProgram, ResolveContext, TemplateVariable,
        UnitBuilder, UnitDescriptor, UnitKind, VariableOffset, VariableSource,
    };
    pub use crate::domain::graph::UnitGraph;
    pub use crate::domain::registry::TemplateRegistry;

    // Value objects
    pub use crate::domain::value_objects::{
        Address, ExternalBindings, Hash, TemplateValue, UnitName, ValueKind, U256,
    };

    // Domain services
    pub use crate::domain::services::{content_hash, derive_address, program_address};

    // Algorithms
    pub use crate::algorithms::{BuildPlan, BuildSchedule, ResolveLimits};

    // Ports
    pub use crate::ports::inbound::{BuildOutput, BuildStats, PrecompileApi};
    pub use crate::ports::outbound::{
        CompileDiagnostic, CompilerAdapter, CompilerOutput, SymbolTable,
    };

    // Adapters
    pub use crate::adapters::{CountingCompiler, LineAssembler};

    // Application
    pub use crate::application::{BuildSession, CacheStats, PrecompileEngine};

    // Configuration
    pub use crate::config::{ConfigError, PrecompileConfig};

    // Errors
    pub use crate::errors::{BuildFailure, CodecError, PrecompileError, UnitFailure};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
