//! USBXpress transaction life cycle.
//!
//! The bridge is a serial channel: it must be opened (clear to send) before
//! use and closed (not clear to send) afterwards, and every command is a
//! transaction of flush → write → read. The device never answers unless
//! something was written first.

use tracing::{debug, info, warn};

use crate::config::DriverOptions;
use crate::device::transport::Transport;
use crate::error::{AsetekError, Result, TransportError};
use crate::protocol::{
    READ_ENDPOINT, READ_LENGTH, USBXPRESS_CLEAR_TO_SEND, USBXPRESS_FLUSH_BUFFERS,
    USBXPRESS_NOT_CLEAR_TO_SEND, USBXPRESS_REQUEST, USBXPRESS_REQUEST_TYPE, WRITE_ENDPOINT,
    WRITE_LENGTH, hex_frame,
};

/// State of the USBXpress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
    InTransaction,
}

/// Owns the transport and serializes every transaction against it.
pub struct TransactionManager<T: Transport> {
    transport: T,
    options: DriverOptions,
    state: ChannelState,
    last_frame: Option<Vec<u8>>,
}

impl<T: Transport> TransactionManager<T> {
    pub fn new(transport: T, options: DriverOptions) -> Self {
        Self {
            transport,
            options,
            state: ChannelState::Closed,
            last_frame: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// The last raw response read from the device.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attach the transport and open the channel.
    ///
    /// A bridge left in a stuck state refuses the first attempt; it is
    /// closed and the whole open step (attach, clear to send) is retried
    /// exactly once. A second failure is returned as `ConnectFailed`.
    pub fn connect(&mut self) -> Result<()> {
        if let Err(err) = self.open_step() {
            warn!("failed to open right away, will close first: {}", err);
            self.close_step();

            if let Err(err) = self.open_step() {
                if let Err(close_err) = self.transport.close() {
                    debug!("detach after failed connect failed: {}", close_err);
                }
                return Err(AsetekError::ConnectFailed(err));
            }
        }

        self.state = ChannelState::Open;
        info!("USBXpress channel open");
        Ok(())
    }

    /// Close the channel and detach the transport.
    ///
    /// Best effort: failures are logged and never returned, so they cannot
    /// mask the outcome of the operation that preceded them.
    pub fn disconnect(&mut self) {
        if let Err(err) = self.usbxpress_close() {
            warn!("failed to close USBXpress channel: {}", err);
        }
        if let Err(err) = self.transport.close() {
            warn!("failed to release transport: {}", err);
        }
        self.state = ChannelState::Closed;
        info!("USBXpress channel closed");
    }

    /// Open the channel once and release transport buffers.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.usbxpress_open()?;
        self.transport.release_buffers()?;
        Ok(())
    }

    /// Flush the bridge buffers; must precede every write.
    ///
    /// Dry runs only enter the transaction state.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.options.dry_run {
            self.control(USBXPRESS_FLUSH_BUFFERS)?;
        }
        self.state = ChannelState::InTransaction;
        Ok(())
    }

    /// Write a command frame, zero-padded to the write length.
    ///
    /// In dry-run mode the frame is validated and logged but not sent.
    pub fn write(&mut self, frame: &[u8]) -> Result<()> {
        if self.state != ChannelState::InTransaction {
            return Err(AsetekError::NotInTransaction);
        }

        if frame.is_empty() || frame.len() > WRITE_LENGTH {
            return Err(AsetekError::InvalidInput(format!(
                "frame length {} outside 1-{} bytes",
                frame.len(),
                WRITE_LENGTH
            )));
        }

        let mut buf = [0u8; WRITE_LENGTH];
        buf[..frame.len()].copy_from_slice(frame);

        debug!(
            "write {} (and {} padding bytes)",
            hex_frame(frame),
            WRITE_LENGTH - frame.len()
        );

        if self.options.dry_run {
            info!("dry run, frame not sent");
            return Ok(());
        }

        let written = self
            .transport
            .bulk_write(WRITE_ENDPOINT, &buf, self.options.write_timeout)
            .map_err(|source| AsetekError::WriteFailed {
                frame: hex_frame(frame),
                source,
            })?;

        if written != buf.len() {
            return Err(AsetekError::WriteFailed {
                frame: hex_frame(frame),
                source: TransportError::ShortWrite {
                    written,
                    expected: buf.len(),
                },
            });
        }

        Ok(())
    }

    /// Read the device response and close the transaction.
    ///
    /// Transport buffers are released whether or not the read succeeded.
    /// Dry runs read nothing and return an empty frame.
    pub fn end_transaction_and_read(&mut self) -> Result<Vec<u8>> {
        if self.state != ChannelState::InTransaction {
            return Err(AsetekError::NotInTransaction);
        }
        self.state = ChannelState::Open;

        if self.options.dry_run {
            // Nothing was written, so the device has nothing to say.
            debug!("dry run, no response read");
            return Ok(Vec::new());
        }

        let msg = self
            .transport
            .bulk_read(READ_ENDPOINT, READ_LENGTH, self.options.read_timeout);

        if let Err(err) = self.transport.release_buffers() {
            warn!("failed to release transport buffers: {}", err);
        }

        let msg = msg.map_err(AsetekError::ReadFailed)?;
        debug!("received {}", hex_frame(&msg));
        self.last_frame = Some(msg.clone());
        Ok(msg)
    }

    /// Leave a transaction without reading, after a failed write.
    pub fn abort_transaction(&mut self) {
        if self.state == ChannelState::InTransaction {
            self.state = ChannelState::Open;
        }
    }

    /// Full flush → write → read transaction.
    pub fn transact(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.begin_transaction()?;
        if let Err(err) = self.write(frame) {
            self.abort_transaction();
            return Err(err);
        }
        self.end_transaction_and_read()
    }

    /// Solicit a status response.
    ///
    /// The device has no read-only status request: a response only follows
    /// a write in the same transaction. `replay` must be a command that is
    /// harmless to repeat.
    pub fn exchange_status(&mut self, replay: &[u8]) -> Result<Vec<u8>> {
        self.transact(replay)
    }

    /// Attach, then clear to send.
    fn open_step(&mut self) -> std::result::Result<(), TransportError> {
        self.transport.open()?;
        self.usbxpress_open()
    }

    /// Undo a failed open step before retrying it.
    fn close_step(&mut self) {
        if let Err(err) = self.usbxpress_close() {
            debug!("close before retry failed: {}", err);
        }
        if let Err(err) = self.transport.close() {
            debug!("detach before retry failed: {}", err);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Err(AsetekError::Transport(TransportError::NotOpen));
        }
        Ok(())
    }

    fn usbxpress_open(&mut self) -> std::result::Result<(), TransportError> {
        self.control(USBXPRESS_CLEAR_TO_SEND)
    }

    fn usbxpress_close(&mut self) -> std::result::Result<(), TransportError> {
        self.control(USBXPRESS_NOT_CLEAR_TO_SEND)
    }

    fn control(&mut self, value: u16) -> std::result::Result<(), TransportError> {
        self.transport
            .control_transfer(USBXPRESS_REQUEST_TYPE, USBXPRESS_REQUEST, value)
    }
}
