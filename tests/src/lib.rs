//! # Quantum-Chain Precompile Test Suite
//!
//! Unified test crate for `qc-precompile`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Fixture graphs shared with the criterion benches
//! │   └── precompile.rs
//! │
//! └── integration/      # End-to-end build flows
//!     ├── flows.rs
//!     └── deployment.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;
