//! nusb backed [`Transport`] for the USBXpress bridge.
//!
//! Control requests use nusb's blocking calls. Bulk transfers are futures
//! in nusb, so they run on a private current-thread tokio runtime where
//! `tokio::time::timeout` bounds them; a transfer that times out is dropped,
//! which cancels it.

use std::future::Future;
use std::time::Duration;

use nusb::transfer::{Control, ControlType, Recipient, RequestBuffer};
use tracing::debug;

use super::transport::Transport;
use crate::error::TransportError;
use crate::protocol::{ASETEK_VID, IO_TIMEOUT_MS, KRAKEN_X_PID};

/// Interface carrying the bulk endpoints.
const INTERFACE: u8 = 0;

/// A cooler found on the bus.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub bus_number: u8,
    pub device_address: u8,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl std::fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bus {:03} address {:03}: {}",
            self.bus_number,
            self.device_address,
            self.product.as_deref().unwrap_or("Asetek cooler")
        )?;
        if let Some(serial) = &self.serial_number {
            write!(f, " (serial {})", serial)?;
        }
        Ok(())
    }
}

/// Handle for USB transfers to an Asetek cooler.
pub struct UsbTransport {
    info: nusb::DeviceInfo,
    interface: Option<nusb::Interface>,
    runtime: tokio::runtime::Runtime,
}

impl UsbTransport {
    fn matches(info: &nusb::DeviceInfo) -> bool {
        info.vendor_id() == ASETEK_VID && info.product_id() == KRAKEN_X_PID
    }

    /// List all connected coolers.
    pub fn list_devices() -> Result<Vec<DeviceSummary>, TransportError> {
        let devices = nusb::list_devices()?
            .filter(Self::matches)
            .map(|info| DeviceSummary {
                bus_number: info.bus_number(),
                device_address: info.device_address(),
                product: info.product_string().map(String::from),
                serial_number: info.serial_number().map(String::from),
            })
            .collect();

        Ok(devices)
    }

    /// Use the first cooler found.
    pub fn find_first() -> Result<Self, TransportError> {
        let info = nusb::list_devices()?
            .find(Self::matches)
            .ok_or(TransportError::DeviceNotFound)?;
        Self::from_info(info)
    }

    /// Use the cooler at a specific bus/address.
    pub fn find_at(bus_number: u8, device_address: u8) -> Result<Self, TransportError> {
        let info = nusb::list_devices()?
            .filter(Self::matches)
            .find(|d| d.bus_number() == bus_number && d.device_address() == device_address)
            .ok_or(TransportError::DeviceNotFound)?;
        Self::from_info(info)
    }

    pub fn from_info(info: nusb::DeviceInfo) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to start I/O runtime: {}", e)))?;

        Ok(Self {
            info,
            interface: None,
            runtime,
        })
    }

    fn interface(&self) -> Result<&nusb::Interface, TransportError> {
        self.interface.as_ref().ok_or(TransportError::NotOpen)
    }

    fn block_on_timeout<F: Future>(
        &self,
        future: F,
        timeout: Duration,
    ) -> Result<F::Output, TransportError> {
        self.runtime
            .block_on(tokio::time::timeout(timeout, future))
            .map_err(|_| TransportError::Timeout(timeout))
    }
}

/// Split a raw bmRequestType into nusb's control type and recipient.
fn split_request_type(request_type: u8) -> Result<(ControlType, Recipient), TransportError> {
    if request_type & 0x80 != 0 {
        return Err(TransportError::Other(format!(
            "request type {:#04x} is device-to-host",
            request_type
        )));
    }

    let control_type = match (request_type >> 5) & 0x03 {
        0 => ControlType::Standard,
        1 => ControlType::Class,
        2 => ControlType::Vendor,
        _ => {
            return Err(TransportError::Other(format!(
                "reserved request type {:#04x}",
                request_type
            )));
        }
    };

    let recipient = match request_type & 0x1F {
        0 => Recipient::Device,
        1 => Recipient::Interface,
        2 => Recipient::Endpoint,
        3 => Recipient::Other,
        _ => {
            return Err(TransportError::Other(format!(
                "unknown recipient in request type {:#04x}",
                request_type
            )));
        }
    };

    Ok((control_type, recipient))
}

impl Transport for UsbTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.interface.is_some() {
            return Ok(());
        }

        let device = self.info.open()?;
        let interface = device.detach_and_claim_interface(INTERFACE)?;
        debug!(
            "claimed interface {} on bus {:03} address {:03}",
            INTERFACE,
            self.info.bus_number(),
            self.info.device_address()
        );
        self.interface = Some(interface);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the interface releases the claim.
        self.interface = None;
        Ok(())
    }

    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
    ) -> Result<(), TransportError> {
        let (control_type, recipient) = split_request_type(request_type)?;
        let control = Control {
            control_type,
            recipient,
            request,
            value,
            index: 0,
        };

        self.interface()?.control_out_blocking(
            control,
            &[],
            Duration::from_millis(IO_TIMEOUT_MS),
        )?;
        Ok(())
    }

    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        let transfer = self.interface()?.bulk_out(endpoint, data.to_vec());
        let completion = self.block_on_timeout(transfer, timeout)?;
        let response = completion.into_result()?;
        Ok(response.actual_length())
    }

    fn bulk_read(
        &mut self,
        endpoint: u8,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let transfer = self
            .interface()?
            .bulk_in(endpoint, RequestBuffer::new(length));
        let completion = self.block_on_timeout(transfer, timeout)?;
        Ok(completion.into_result()?)
    }

    fn release_buffers(&mut self) -> Result<(), TransportError> {
        // nusb owns no buffers between transfers; nothing is pending once a
        // transfer future has completed or been dropped.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_vendor_device_out() {
        let (control_type, recipient) = split_request_type(0x40).unwrap();
        assert!(matches!(control_type, ControlType::Vendor));
        assert!(matches!(recipient, Recipient::Device));
    }

    #[test]
    fn test_split_rejects_device_to_host() {
        assert!(split_request_type(0xC0).is_err());
        assert!(split_request_type(0x60).is_err());
    }
}
