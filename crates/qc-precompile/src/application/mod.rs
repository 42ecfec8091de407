//! # Application Layer
//!
//! The precompile engine and the session-scoped artifact cache it builds
//! through.

pub mod cache;
pub mod service;

pub use cache::{ArtifactCache, BuildSession, CacheKey, CacheOutcome, CacheStats};
pub use service::PrecompileEngine;
