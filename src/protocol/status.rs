//! Device status parsing for fifth generation Asetek coolers.
//!
//! Parses the raw 32-byte response into labelled measurements.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{AsetekError, Result};

// =============================================================================
// Response Parsing Offsets
// =============================================================================

/// Offset for fan RPM (big-endian u16).
const OFFSET_FAN_RPM: usize = 0;
/// Offset for pump RPM (big-endian u16).
const OFFSET_PUMP_RPM: usize = 8;
/// Offset for liquid temperature integer part.
const OFFSET_TEMP_INT: usize = 10;
/// Offset for liquid temperature tenths.
const OFFSET_TEMP_DEC: usize = 14;
/// Firmware version bytes.
const OFFSET_FIRMWARE: std::ops::Range<usize> = 0x17..0x1B;

/// Shortest frame that still reaches the firmware version.
pub const MIN_STATUS_LENGTH: usize = 27;

pub const LABEL_LIQUID_TEMP: &str = "Liquid temperature";
pub const LABEL_FAN_SPEED: &str = "Fan speed";
pub const LABEL_PUMP_SPEED: &str = "Pump speed";
pub const LABEL_FIRMWARE: &str = "Firmware version";

// =============================================================================
// Status Structures
// =============================================================================

/// A measured value.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusValue::Number(v) if v.fract() == 0.0 => write!(f, "{}", v),
            StatusValue::Number(v) => write!(f, "{:.1}", v),
            StatusValue::Text(s) => f.write_str(s),
        }
    }
}

/// One (label, value, unit) line of a status report.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub label: &'static str,
    pub value: StatusValue,
    pub unit: &'static str,
}

/// Decoded device status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
}

impl StatusReport {
    /// Decode a status response.
    ///
    /// # Errors
    /// Returns `TruncatedFrame` if the buffer cannot reach the firmware field.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_STATUS_LENGTH {
            return Err(AsetekError::TruncatedFrame {
                length: buf.len(),
                minimum: MIN_STATUS_LENGTH,
            });
        }

        let liquid_temp =
            buf[OFFSET_TEMP_INT] as f64 + buf[OFFSET_TEMP_DEC] as f64 / 10.0;
        let fan_rpm = BigEndian::read_u16(&buf[OFFSET_FAN_RPM..]);
        let pump_rpm = BigEndian::read_u16(&buf[OFFSET_PUMP_RPM..]);
        let firmware = buf[OFFSET_FIRMWARE]
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(".");

        Ok(StatusReport {
            entries: vec![
                StatusEntry {
                    label: LABEL_LIQUID_TEMP,
                    value: StatusValue::Number(liquid_temp),
                    unit: "°C",
                },
                StatusEntry {
                    label: LABEL_FAN_SPEED,
                    value: StatusValue::Number(fan_rpm as f64),
                    unit: "rpm",
                },
                StatusEntry {
                    label: LABEL_PUMP_SPEED,
                    value: StatusValue::Number(pump_rpm as f64),
                    unit: "rpm",
                },
                StatusEntry {
                    label: LABEL_FIRMWARE,
                    value: StatusValue::Text(firmware),
                    unit: "",
                },
            ],
        })
    }

    /// Look up a value by label.
    pub fn get(&self, label: &str) -> Option<&StatusValue> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.value)
    }

    /// Numeric value for `label`, if present and numeric.
    pub fn number(&self, label: &str) -> Option<f64> {
        match self.get(label)? {
            StatusValue::Number(v) => Some(*v),
            StatusValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{:<20} {:>10}  {}",
                entry.label,
                entry.value.to_string(),
                entry.unit
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status() {
        let mut buf = [0u8; 32];
        // Fan RPM: 3000
        buf[0] = 0x0B;
        buf[1] = 0xB8;
        // Pump RPM: 1000
        buf[8] = 0x03;
        buf[9] = 0xE8;
        // Temperature: 31.4°C
        buf[10] = 31;
        buf[14] = 4;
        // Firmware 2.10.0.5
        buf[0x17..0x1B].copy_from_slice(&[2, 10, 0, 5]);

        let status = StatusReport::decode(&buf).unwrap();
        assert_eq!(status.number(LABEL_FAN_SPEED), Some(3000.0));
        assert_eq!(status.number(LABEL_PUMP_SPEED), Some(1000.0));
        let temp = status.number(LABEL_LIQUID_TEMP).unwrap();
        assert!((temp - 31.4).abs() < 1e-9);
        assert_eq!(
            status.get(LABEL_FIRMWARE),
            Some(&StatusValue::Text("2.10.0.5".into()))
        );
    }

    #[test]
    fn test_entry_order_and_units() {
        let status = StatusReport::decode(&[0u8; 32]).unwrap();
        let labels: Vec<_> = status.entries.iter().map(|e| (e.label, e.unit)).collect();
        assert_eq!(
            labels,
            vec![
                (LABEL_LIQUID_TEMP, "°C"),
                (LABEL_FAN_SPEED, "rpm"),
                (LABEL_PUMP_SPEED, "rpm"),
                (LABEL_FIRMWARE, ""),
            ]
        );
    }

    #[test]
    fn test_minimum_length() {
        assert!(StatusReport::decode(&[0u8; MIN_STATUS_LENGTH]).is_ok());
        let err = StatusReport::decode(&[0u8; 26]).unwrap_err();
        assert!(matches!(
            err,
            AsetekError::TruncatedFrame {
                length: 26,
                minimum: 27
            }
        ));
    }

    #[test]
    fn test_display() {
        let mut buf = [0u8; 32];
        buf[10] = 28;
        buf[14] = 5;
        let text = StatusReport::decode(&buf).unwrap().to_string();
        assert!(text.contains("Liquid temperature"));
        assert!(text.contains("28.5"));
        assert!(text.contains("0.0.0.0"));
    }
}
