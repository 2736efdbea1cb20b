//! State and configuration storage module.
//!
//! Handles the persisted lighting frame and the user configuration file.

pub mod lighting;
pub mod profiles;

// Re-export commonly used items
pub use lighting::{FileLightingStore, LightingStore, MemoryLightingStore};
pub use profiles::*;
