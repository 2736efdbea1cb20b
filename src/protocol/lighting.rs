//! Lighting command encoding.
//!
//! The lighting frame is the only command the driver keeps around: the
//! device has no read-only status request, so the last lighting frame is
//! replayed whenever a status read needs a write in front of it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AsetekError, Result};
use crate::protocol::commands::CMD_LIGHTING;

/// Length of a lighting frame.
pub const LIGHTING_FRAME_LENGTH: usize = 19;

/// Number of colors a lighting frame carries.
pub const MAX_COLORS: usize = 2;

/// High temperature alert color (red).
const ALERT_COLOR: [u8; 3] = [0xFF, 0x00, 0x00];

/// High temperature alert threshold in °C.
const ALERT_THRESHOLD: u8 = 0x37;

/// Trailing constant bytes of every lighting frame.
const LIGHTING_TRAILER: [u8; 3] = [0x01, 0x00, 0x01];

/// Speed used when the requested one cannot be encoded.
const FALLBACK_SPEED: u8 = 1;

/// An RGB color.
pub type Rgb = [u8; 3];

// =============================================================================
// Modes and speeds
// =============================================================================

/// Lighting modes understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingMode {
    /// Solid first color.
    Fixed,
    /// Alternate between both colors.
    Alternating,
    /// Blink the first color.
    Blinking,
    /// LEDs off.
    Off,
}

impl LightingMode {
    pub fn name(&self) -> &'static str {
        match self {
            LightingMode::Fixed => "fixed",
            LightingMode::Alternating => "alternating",
            LightingMode::Blinking => "blinking",
            LightingMode::Off => "off",
        }
    }
}

impl std::str::FromStr for LightingMode {
    type Err = AsetekError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(LightingMode::Fixed),
            "alternating" => Ok(LightingMode::Alternating),
            "blinking" => Ok(LightingMode::Blinking),
            "off" => Ok(LightingMode::Off),
            _ => Err(AsetekError::UnsupportedMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for LightingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Animation speed: a named level or a raw device value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnimationSpeed {
    Fastest,
    Faster,
    #[default]
    Normal,
    Slower,
    Slowest,
    /// Raw value; only 1-255 can be encoded.
    Value(i64),
    /// Unrecognized input, kept for the warning.
    Unknown(String),
}

impl AnimationSpeed {
    /// Parse a level name or an integer. Never fails; bad input is
    /// coerced when the frame is encoded.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "fastest" => AnimationSpeed::Fastest,
            "faster" => AnimationSpeed::Faster,
            "normal" => AnimationSpeed::Normal,
            "slower" => AnimationSpeed::Slower,
            "slowest" => AnimationSpeed::Slowest,
            other => match other.parse::<i64>() {
                Ok(value) => AnimationSpeed::Value(value),
                Err(_) => AnimationSpeed::Unknown(s.to_string()),
            },
        }
    }

    /// Device byte for this speed, falling back to 1 with a warning.
    pub fn to_byte(&self) -> u8 {
        match self {
            AnimationSpeed::Fastest => 1,
            AnimationSpeed::Faster => 2,
            AnimationSpeed::Normal => 3,
            AnimationSpeed::Slower => 4,
            AnimationSpeed::Slowest => 5,
            AnimationSpeed::Value(v) => match u8::try_from(*v) {
                Ok(b) if b >= 1 => b,
                _ => {
                    warn!("invalid animation speed {}, using {}", v, FALLBACK_SPEED);
                    FALLBACK_SPEED
                }
            },
            AnimationSpeed::Unknown(s) => {
                warn!("unknown animation speed '{}', using {}", s, FALLBACK_SPEED);
                FALLBACK_SPEED
            }
        }
    }
}

impl From<i64> for AnimationSpeed {
    fn from(value: i64) -> Self {
        AnimationSpeed::Value(value)
    }
}

// =============================================================================
// Frame
// =============================================================================

/// An encoded lighting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct LightingFrame([u8; LIGHTING_FRAME_LENGTH]);

impl LightingFrame {
    /// All LEDs off; the state assumed before anything was ever applied.
    pub fn off() -> Self {
        encode_lighting(LightingMode::Off, &[], &AnimationSpeed::Fastest)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the LEDs are on in this frame.
    pub fn is_on(&self) -> bool {
        self.0[13] != 0
    }
}

impl Default for LightingFrame {
    fn default() -> Self {
        Self::off()
    }
}

impl TryFrom<Vec<u8>> for LightingFrame {
    type Error = String;

    fn try_from(bytes: Vec<u8>) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; LIGHTING_FRAME_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            format!(
                "lighting frame has {} bytes, expected {}",
                b.len(),
                LIGHTING_FRAME_LENGTH
            )
        })?;
        if arr[0] != CMD_LIGHTING {
            return Err(format!("lighting frame starts with {:#04x}", arr[0]));
        }
        Ok(Self(arr))
    }
}

impl From<LightingFrame> for Vec<u8> {
    fn from(frame: LightingFrame) -> Self {
        frame.0.to_vec()
    }
}

/// Build a lighting command.
///
/// Layout:
/// `[0x10, c1 r g b, c2 r g b, ff 00 00 37, speed, speed, on, alt, blink, 01 00 01]`
///
/// Extra colors are dropped with a warning; mode `off` zeroes both colors.
pub fn encode_lighting(mode: LightingMode, colors: &[Rgb], speed: &AnimationSpeed) -> LightingFrame {
    if colors.len() > MAX_COLORS {
        warn!(
            "too many colors ({}), only the first {} are used",
            colors.len(),
            MAX_COLORS
        );
    }

    let mut slots = [[0u8; 3]; MAX_COLORS];
    if mode != LightingMode::Off {
        for (slot, color) in slots.iter_mut().zip(colors) {
            *slot = *color;
        }
    }

    let speed = speed.to_byte();

    let mut buf = [0u8; LIGHTING_FRAME_LENGTH];
    buf[0] = CMD_LIGHTING;
    buf[1..4].copy_from_slice(&slots[0]);
    buf[4..7].copy_from_slice(&slots[1]);
    buf[7..10].copy_from_slice(&ALERT_COLOR);
    buf[10] = ALERT_THRESHOLD;
    buf[11] = speed;
    buf[12] = speed;
    buf[13] = (mode != LightingMode::Off) as u8;
    buf[14] = (mode == LightingMode::Alternating) as u8;
    buf[15] = (mode == LightingMode::Blinking) as u8;
    buf[16..19].copy_from_slice(&LIGHTING_TRAILER);

    LightingFrame(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_frame_layout() {
        let frame = encode_lighting(
            LightingMode::Fixed,
            &[[0x11, 0x22, 0x33]],
            &AnimationSpeed::Normal,
        );
        assert_eq!(
            frame.as_bytes(),
            &[
                0x10, 0x11, 0x22, 0x33, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00, 0x37, 3, 3, 1, 0, 0,
                0x01, 0x00, 0x01
            ]
        );
    }

    #[test]
    fn test_mode_flags() {
        let colors = [[1, 2, 3], [4, 5, 6]];
        let alt = encode_lighting(LightingMode::Alternating, &colors, &AnimationSpeed::Fastest);
        assert_eq!(&alt.as_bytes()[13..16], &[1, 1, 0]);
        assert_eq!(&alt.as_bytes()[4..7], &[4, 5, 6]);

        let blink = encode_lighting(LightingMode::Blinking, &colors, &AnimationSpeed::Fastest);
        assert_eq!(&blink.as_bytes()[13..16], &[1, 0, 1]);
    }

    #[test]
    fn test_off_ignores_colors() {
        let cases: [Vec<Rgb>; 3] = [vec![], vec![[255, 255, 255]], vec![[9, 9, 9], [8, 8, 8]]];
        for colors in cases {
            let frame = encode_lighting(LightingMode::Off, &colors, &AnimationSpeed::Slowest);
            assert!(!frame.is_on());
            assert_eq!(frame.as_bytes()[13], 0);
            assert!(frame.as_bytes()[1..7].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_extra_colors_truncated() {
        let frame = encode_lighting(
            LightingMode::Alternating,
            &[[1, 1, 1], [2, 2, 2], [3, 3, 3]],
            &AnimationSpeed::Normal,
        );
        assert_eq!(&frame.as_bytes()[1..7], &[1, 1, 1, 2, 2, 2]);
        assert_eq!(frame.as_bytes()[7], 0xff);
    }

    #[test]
    fn test_speed_coercion() {
        assert_eq!(AnimationSpeed::parse("fastest").to_byte(), 1);
        assert_eq!(AnimationSpeed::parse("SLOWEST").to_byte(), 5);
        assert_eq!(AnimationSpeed::parse("200").to_byte(), 200);
        assert_eq!(AnimationSpeed::parse("0").to_byte(), 1);
        assert_eq!(AnimationSpeed::parse("256").to_byte(), 1);
        assert_eq!(AnimationSpeed::parse("-3").to_byte(), 1);
        assert_eq!(AnimationSpeed::parse("ludicrous").to_byte(), 1);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Fixed".parse::<LightingMode>().unwrap(), LightingMode::Fixed);
        assert_eq!("off".parse::<LightingMode>().unwrap(), LightingMode::Off);
        assert!(matches!(
            "rainbow".parse::<LightingMode>(),
            Err(AsetekError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_frame_serde() {
        let frame = encode_lighting(LightingMode::Fixed, &[[0, 128, 255]], &AnimationSpeed::Normal);
        let json = serde_json::to_string(&frame).unwrap();
        let back: LightingFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);

        assert!(serde_json::from_str::<LightingFrame>("[16, 0, 0]").is_err());
    }
}
