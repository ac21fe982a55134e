//! Dependency data model
//!
//! Every extractor emits [`NetworkDependency`] facts; the scanner folds them into a
//! [`DependencySet`], which renderers and the review prompt consume read-only.

pub mod dependency;
pub mod set;

pub use dependency::{Confidence, NetworkDependency, DEFAULT_PROTOCOL};
pub use set::DependencySet;
