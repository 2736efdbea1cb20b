//! USB transport abstraction.
//!
//! The driver only needs the handful of primitives the USBXpress bridge
//! exposes, so they are collected behind one trait. [`UsbTransport`] is the
//! nusb implementation; tests use a scripted mock.
//!
//! [`UsbTransport`]: super::usb::UsbTransport

use std::time::Duration;

use crate::error::TransportError;

/// Transport capability required by the transaction manager.
///
/// Implementations are used from a single thread; every call blocks until
/// completion or until its timeout expires.
pub trait Transport {
    /// Attach to the device (claim the interface).
    fn open(&mut self) -> Result<(), TransportError>;

    /// Detach from the device.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Issue a data-less OUT control request.
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
    ) -> Result<(), TransportError>;

    /// Write `data` to a bulk OUT endpoint, returning the bytes accepted.
    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Read up to `length` bytes from a bulk IN endpoint.
    fn bulk_read(
        &mut self,
        endpoint: u8,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Release buffers held by the transport between transactions.
    fn release_buffers(&mut self) -> Result<(), TransportError>;
}
