//! Parsing utilities for CLI arguments and configuration values.

use crate::config::SpeedProfile;
use crate::error::{AsetekError, Result};
use crate::protocol::{Channel, LightingMode, Rgb};

// =============================================================================
// Color Parsing
// =============================================================================

/// Parse a hex color string into RGB components.
///
/// Accepts formats: `#RRGGBB` or `RRGGBB`
///
/// # Example
/// ```
/// use asetek_rust_devices::utils::parsing::parse_hex_color;
///
/// assert_eq!(parse_hex_color("#FF5500").unwrap(), [255, 85, 0]);
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Rgb> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(AsetekError::InvalidInput(format!("Invalid color hex: {}", hex)));
    }

    let mut rgb = [0u8; 3];
    for (i, component) in rgb.iter_mut().enumerate() {
        *component = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| AsetekError::InvalidInput(format!("Invalid color hex: {}", hex)))?;
    }
    Ok(rgb)
}

/// Parse a lighting mode name.
pub fn parse_lighting_mode(name: &str) -> Result<LightingMode> {
    name.parse()
}

// =============================================================================
// Speed Profile Parsing
// =============================================================================

/// Parse `temp:duty` pairs separated by commas, e.g. `20:30,40:50,55:80`.
///
/// Values are kept as entered; range checks happen when the profile is
/// normalized.
pub fn parse_profile_points(input: &str) -> Result<Vec<(i32, i32)>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (temp, duty) = pair.split_once(':').ok_or_else(|| {
                AsetekError::InvalidInput(format!("Invalid point '{}'. Use temp:duty", pair))
            })?;
            let temp = temp.trim().parse().map_err(|_| {
                AsetekError::InvalidInput(format!("Invalid temperature in '{}'", pair))
            })?;
            let duty = duty
                .trim()
                .parse()
                .map_err(|_| AsetekError::InvalidInput(format!("Invalid duty in '{}'", pair)))?;
            Ok((temp, duty))
        })
        .collect()
}

/// Parse a speed profile: a preset name, `fixed:XX`, or custom points.
///
/// # Example
/// ```
/// use asetek_rust_devices::utils::parsing::parse_speed_profile;
/// use asetek_rust_devices::config::SpeedProfile;
///
/// let profile = parse_speed_profile("silent").unwrap();
/// assert!(matches!(profile, SpeedProfile::Silent));
///
/// let fixed = parse_speed_profile("fixed:75").unwrap();
/// assert!(matches!(fixed, SpeedProfile::Fixed(75)));
///
/// let custom = parse_speed_profile("20:30,50:80").unwrap();
/// assert_eq!(custom, SpeedProfile::Custom(vec![(20, 30), (50, 80)]));
/// ```
pub fn parse_speed_profile(name: &str) -> Result<SpeedProfile> {
    let lower = name.trim().to_lowercase();

    if lower == "silent" {
        return Ok(SpeedProfile::Silent);
    }

    if lower == "performance" {
        return Ok(SpeedProfile::Performance);
    }

    if let Some(rest) = lower.strip_prefix("fixed:") {
        let duty: u8 = rest.parse().ok().filter(|d| *d <= 100).ok_or_else(|| {
            AsetekError::InvalidInput("Invalid duty value. Use 'fixed:XX' where XX is 0-100".into())
        })?;
        return Ok(SpeedProfile::Fixed(duty));
    }

    if lower.contains(':') {
        return parse_profile_points(&lower).map(SpeedProfile::Custom);
    }

    Err(AsetekError::InvalidInput(format!(
        "Unknown profile '{}'. Use: silent, performance, fixed:XX or temp:duty,...",
        name
    )))
}

// =============================================================================
// Channel Parsing
// =============================================================================

/// Parse a channel name: fan, pump, sync or logo.
pub fn parse_channel(name: &str) -> Result<Channel> {
    let lower = name.to_lowercase();
    Channel::ALL
        .into_iter()
        .find(|c| c.name() == lower)
        .ok_or_else(|| {
            AsetekError::InvalidInput(format!(
                "Unknown channel '{}'. Use: fan, pump, sync or logo",
                name
            ))
        })
}

// =============================================================================
// Tests
// =============================================================================
