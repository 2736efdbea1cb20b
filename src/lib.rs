//! Asetek Rust Devices Library
//!
//! A Rust driver for fifth generation Asetek liquid coolers (NZXT Kraken
//! X31/X41/X61) behind a Silicon Labs USBXpress bridge.
//!
//! # Features
//!
//! - Read device status (liquid temperature, fan and pump RPM, firmware)
//! - Control fan and pump speeds
//! - Apply pre-defined or custom fan speed profiles
//! - Set lighting mode and colors
//!
//! # Example
//!
//! ```no_run
//! use asetek_rust_devices::config::{DriverOptions, SpeedProfile};
//! use asetek_rust_devices::device::{AsetekCooler, UsbTransport};
//! use asetek_rust_devices::protocol::{AnimationSpeed, Channel, LightingMode};
//! use asetek_rust_devices::storage::FileLightingStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = UsbTransport::find_first()?;
//!     let store = FileLightingStore::in_data_dir()?;
//!     let mut cooler = AsetekCooler::new(transport, store, DriverOptions::default())?;
//!
//!     cooler.connect()?;
//!
//!     // Read current status
//!     let status = cooler.get_status()?;
//!     println!("{}", status);
//!
//!     // Set fixed speeds
//!     cooler.set_fixed_speed(Channel::Pump, 80)?;
//!
//!     // Or use a profile
//!     cooler.set_speed_profile(Channel::Fan, &SpeedProfile::Silent.to_points())?;
//!
//!     cooler.set_color(
//!         Channel::Sync,
//!         LightingMode::Fixed,
//!         &[[0, 128, 255]],
//!         &AnimationSpeed::Normal,
//!     )?;
//!
//!     cooler.disconnect();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
pub mod storage;
pub mod utils;

// Re-exports for convenience
pub use device::{AsetekCooler, UsbTransport};
pub use error::{AsetekError, Result, TransportError};
pub use protocol::Channel;
