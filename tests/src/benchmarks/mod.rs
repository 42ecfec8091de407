//! # Precompile Benchmarks
//!
//! Graph generators used by `benches/precompile_benchmarks.rs` and by the
//! integration tests that need large graphs.

pub mod precompile;
