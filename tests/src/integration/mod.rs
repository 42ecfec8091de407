//! # Integration Tests
//!
//! End-to-end flows through the public `qc-precompile` API.

pub mod deployment;
pub mod flows;
