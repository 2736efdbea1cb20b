//! Custom error types for Asetek cooler devices.
//!
//! Transport failures are kept in their own enum so that mock and real
//! transports report the same way; the driver wraps them into the kind of
//! operation that failed.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a [`Transport`](crate::device::Transport) implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// USB enumeration, open or claim error.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    /// A control or bulk transfer completed with an error status.
    #[error("Transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),

    /// The transfer did not complete in time.
    #[error("Timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// No matching device on the bus.
    #[error("Asetek cooler not found. Check USB connection and permissions.")]
    DeviceNotFound,

    /// The transport has not been opened (or was already closed).
    #[error("Transport is not open")]
    NotOpen,

    /// Fewer bytes were accepted than submitted.
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Anything else (used by alternative backends).
    #[error("{0}")]
    Other(String),
}

/// Main error type for Asetek driver operations.
#[derive(Error, Debug)]
pub enum AsetekError {
    /// The USBXpress channel could not be opened, even after one close/retry.
    #[error("Failed to connect to device: {0}")]
    ConnectFailed(#[source] TransportError),

    /// A command frame could not be written.
    #[error("Failed to write frame [{frame}]: {source}")]
    WriteFailed {
        frame: String,
        #[source]
        source: TransportError,
    },

    /// The device response could not be read.
    #[error("Failed to read response: {0}")]
    ReadFailed(#[source] TransportError),

    /// Other transport failure (flush, release, attach).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Speed profile has invalid content.
    #[error("Invalid speed profile: {0}")]
    InvalidProfile(String),

    /// Speed profile has more points than the device table holds.
    #[error("Too many profile points ({points}); the device supports at most {max}")]
    ProfileTooLarge { points: usize, max: usize },

    /// A profile handed to the encoder was not normalized to the table size.
    #[error("Malformed profile: {points} points, expected exactly {expected}")]
    MalformedProfile { points: usize, expected: usize },

    /// Lighting mode name not understood by the device.
    #[error("Unsupported lighting mode '{0}'. Use: fixed, alternating, blinking or off")]
    UnsupportedMode(String),

    /// The channel cannot be used for the requested operation.
    #[error("Channel {channel} does not support {operation}")]
    UnsupportedChannel {
        channel: String,
        operation: &'static str,
    },

    /// Status response too short to decode.
    #[error("Truncated status frame: {length} bytes, expected at least {minimum}")]
    TruncatedFrame { length: usize, minimum: usize },

    /// A write was attempted outside `begin_transaction`.
    #[error("No transaction in progress. Call begin_transaction() first.")]
    NotInTransaction,

    /// Persistent state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic invalid input error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Asetek operations.
pub type Result<T> = std::result::Result<T, AsetekError>;
