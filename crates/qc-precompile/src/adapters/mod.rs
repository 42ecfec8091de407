//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound compiler port.
//!
//! - `LineAssembler`: deterministic reference assembler
//! - `CountingCompiler`: call-recording decorator over any adapter

pub mod assembler;
pub mod counting;

pub use assembler::*;
pub use counting::*;
