//! Device abstraction layer for Asetek coolers.
//!
//! Provides device discovery, the USBXpress transaction life cycle and the
//! high-level cooler interface.

pub mod asetek;
pub mod transaction;
pub mod transport;
pub mod usb;

pub use asetek::AsetekCooler;
pub use transaction::{ChannelState, TransactionManager};
pub use transport::Transport;
pub use usb::{DeviceSummary, UsbTransport};
