//! Algorithms module for precompilation
//!
//! Contains:
//! - Dependency resolver (DFS post-order, cycle detection)
//! - Kahn's level schedule
//! - Template renderer
//! - Offset locator

pub mod dependency_resolver;
pub mod kahns;
pub mod offset_locator;
pub mod template_renderer;

pub use dependency_resolver::{resolve, BuildPlan, ResolveLimits};
pub use kahns::{kahns_level_schedule, BuildLevel, BuildSchedule};
pub use offset_locator::{locate_embedded_slot, locate_slot, OffsetSource};
pub use template_renderer::{render_template, scan_placeholders, Placeholder, RenderedSource};
