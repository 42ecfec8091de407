//! # Domain Layer (Inner Hexagon)
//!
//! Pure model of precompilation: names, values, descriptors, artifacts and
//! the hash/sentinel functions over them.
//! NO I/O, NO compiler access, NO shared mutable state.
//!
//! Dependencies point INWARD only (algorithms, adapters and the engine
//! depend on this, not vice versa).

pub mod entities;
pub mod graph;
pub mod invariants;
pub mod registry;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use graph::UnitGraph;
pub use invariants::*;
pub use registry::TemplateRegistry;
pub use services::*;
pub use value_objects::*;
