//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for precompilation.
//! These are the interfaces between the engine and the outside world.
//!
//! - **Driving Ports (Inbound)**: `PrecompileApi`
//! - **Driven Ports (Outbound)**: `CompilerAdapter`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
