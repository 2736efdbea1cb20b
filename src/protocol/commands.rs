//! Command definitions and builders for fifth generation Asetek coolers.
//!
//! The cooler sits behind a Silicon Labs USBXpress bridge: control requests
//! manage the serial channel, bulk transfers carry the command frames.

use tracing::warn;

use crate::error::{AsetekError, Result};
use crate::protocol::profile::MAX_PROFILE_POINTS;

// =============================================================================
// Constants
// =============================================================================

/// Asetek Vendor ID.
pub const ASETEK_VID: u16 = 0x2433;

/// NZXT Kraken X31/X41/X61 Product ID.
pub const KRAKEN_X_PID: u16 = 0xB200;

/// Bulk IN endpoint for device responses.
pub const READ_ENDPOINT: u8 = 0x82;

/// Bulk OUT endpoint for command frames.
pub const WRITE_ENDPOINT: u8 = 0x02;

/// Length of a device response.
pub const READ_LENGTH: usize = 32;

/// Frames are zero-padded to this length before being written.
pub const WRITE_LENGTH: usize = 32;

/// I/O budget for every transport call, in milliseconds.
pub const IO_TIMEOUT_MS: u64 = 2000;

/// Above this temperature the cooler must run at full duty.
pub const CRITICAL_TEMPERATURE: u8 = 60;

// =============================================================================
// USBXpress control requests
// =============================================================================

/// bmRequestType: vendor, device recipient, host-to-device.
pub const USBXPRESS_REQUEST_TYPE: u8 = 0x40;

/// bRequest used for every USBXpress channel operation.
pub const USBXPRESS_REQUEST: u8 = 0x02;

/// wValue: open the bridge.
pub const USBXPRESS_OPEN: u16 = 0x0000;

/// wValue: flush the bridge buffers (starts a transaction).
pub const USBXPRESS_FLUSH_BUFFERS: u16 = 0x0001;

/// wValue: clear to send (opens the serial channel).
pub const USBXPRESS_CLEAR_TO_SEND: u16 = 0x0002;

/// wValue: not clear to send (closes the serial channel).
pub const USBXPRESS_NOT_CLEAR_TO_SEND: u16 = 0x0004;

// =============================================================================
// Message types
// =============================================================================

/// Lighting (color change) command.
pub const CMD_LIGHTING: u8 = 0x10;

/// Fan variable speed (profile) command.
pub const CMD_FAN_PROFILE: u8 = 0x11;

/// Fan fixed speed command.
pub const CMD_FAN_FIXED: u8 = 0x12;

/// Pump fixed speed command.
pub const CMD_PUMP_FIXED: u8 = 0x13;

// =============================================================================
// Channels
// =============================================================================

/// Device channel identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Radiator fans - 30% to 100%.
    Fan,
    /// Pump - 50% to 100%, fixed speed only.
    Pump,
    /// All lighting zones.
    Sync,
    /// Pump head logo.
    Logo,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Fan, Channel::Pump, Channel::Sync, Channel::Logo];

    /// Message type for a fixed duty command, if the channel has one.
    pub const fn fixed_speed_type(&self) -> Option<u8> {
        match self {
            Channel::Fan => Some(CMD_FAN_FIXED),
            Channel::Pump => Some(CMD_PUMP_FIXED),
            Channel::Sync | Channel::Logo => None,
        }
    }

    /// Message type for a temperature profile command, if the channel has one.
    pub const fn profile_type(&self) -> Option<u8> {
        match self {
            Channel::Fan => Some(CMD_FAN_PROFILE),
            _ => None,
        }
    }

    /// Message type for a lighting command, if the channel has one.
    pub const fn lighting_type(&self) -> Option<u8> {
        match self {
            Channel::Sync | Channel::Logo => Some(CMD_LIGHTING),
            _ => None,
        }
    }

    /// Get the minimum duty cycle for this channel.
    pub const fn min_duty(&self) -> u8 {
        match self {
            Channel::Fan => 30,
            Channel::Pump => 50,
            Channel::Sync | Channel::Logo => 0,
        }
    }

    /// Get the maximum duty cycle for this channel.
    pub const fn max_duty(&self) -> u8 {
        100
    }

    /// Clip a requested duty into this channel's bounds.
    pub fn clamp_duty(&self, duty: i32) -> u8 {
        duty.clamp(self.min_duty() as i32, self.max_duty() as i32) as u8
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Channel::Fan => "fan",
            Channel::Pump => "pump",
            Channel::Sync => "sync",
            Channel::Logo => "logo",
        }
    }

    pub(crate) fn unsupported(&self, operation: &'static str) -> AsetekError {
        AsetekError::UnsupportedChannel {
            channel: self.name().to_string(),
            operation,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Command Builders
// =============================================================================

/// Build a fixed speed command.
///
/// Out-of-range requests are clamped into the channel bounds, never
/// rejected; a warning is logged when that happens.
///
/// # Returns
/// `[message_type, duty]`
pub fn encode_fixed_speed(channel: Channel, speed: i32) -> Result<[u8; 2]> {
    let mtype = channel
        .fixed_speed_type()
        .ok_or_else(|| channel.unsupported("fixed speed"))?;

    let duty = channel.clamp_duty(speed);
    if duty as i32 != speed {
        warn!(
            "{} duty {}% out of range {}-{}%, clamped to {}%",
            channel,
            speed,
            channel.min_duty(),
            channel.max_duty(),
            duty
        );
    }

    Ok([mtype, duty])
}

/// Length of an encoded profile command.
pub const PROFILE_FRAME_LENGTH: usize = 2 + 2 * MAX_PROFILE_POINTS;

/// Build a speed profile command.
///
/// The device expects exactly [`MAX_PROFILE_POINTS`] points: all
/// temperatures first, then all duties.
///
/// # Returns
/// `[message_type, 0x00, t0..t5, d0..d5]`
pub fn encode_profile(channel: Channel, profile: &[(u8, u8)]) -> Result<[u8; PROFILE_FRAME_LENGTH]> {
    let mtype = channel
        .profile_type()
        .ok_or_else(|| channel.unsupported("speed profiles"))?;

    if profile.len() != MAX_PROFILE_POINTS {
        return Err(AsetekError::MalformedProfile {
            points: profile.len(),
            expected: MAX_PROFILE_POINTS,
        });
    }

    let mut buf = [0u8; PROFILE_FRAME_LENGTH];
    buf[0] = mtype;
    for (i, &(temp, duty)) in profile.iter().enumerate() {
        buf[2 + i] = temp;
        buf[2 + MAX_PROFILE_POINTS + i] = duty;
    }

    Ok(buf)
}

/// Format bytes as space separated hex, the way frames are logged.
pub fn hex_frame(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
