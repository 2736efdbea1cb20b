//! USBXpress protocol implementation for Asetek coolers.
//!
//! This module contains the wire constants, frame builders, profile
//! processing and response parsing. Nothing here performs I/O.

pub mod commands;
pub mod lighting;
pub mod profile;
pub mod status;

pub use commands::*;
pub use lighting::*;
pub use profile::{MAX_PROFILE_POINTS, autofill, clamp, normalize, prepare};
pub use status::*;
