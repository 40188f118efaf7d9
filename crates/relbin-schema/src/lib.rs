//! Shared types for relbin: the package descriptor and the platform target
//! used to pick a release asset.

pub mod descriptor;
pub mod platform;

// Re-exports
pub use descriptor::*;
pub use platform::*;
