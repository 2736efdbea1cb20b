//! Driver options and speed profile presets.

use std::time::Duration;

use crate::protocol::IO_TIMEOUT_MS;

// =============================================================================
// Driver Options
// =============================================================================

/// Runtime options for a driver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Validate and log frames without sending them.
    pub dry_run: bool,
    /// Timeout for bulk reads.
    pub read_timeout: Duration,
    /// Timeout for bulk writes.
    pub write_timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            read_timeout: Duration::from_millis(IO_TIMEOUT_MS),
            write_timeout: Duration::from_millis(IO_TIMEOUT_MS),
        }
    }
}

// =============================================================================
// Speed Profiles
// =============================================================================

/// Pre-defined fan speed profile.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeedProfile {
    /// Silent mode - low speeds, ramps up only at high temps.
    Silent,
    /// Performance mode - aggressive cooling curve.
    Performance,
    /// Flat duty below the critical temperature.
    ///
    /// Like every profile, it still ramps to 100% at the critical liquid
    /// temperature; use a fixed speed command for a duty that never changes.
    Fixed(u8),
    /// Custom temperature/duty points.
    Custom(Vec<(i32, i32)>),
}

impl SpeedProfile {
    /// Raw (temperature, duty) points for this profile.
    ///
    /// The points still go through normalization before being sent.
    pub fn to_points(&self) -> Vec<(i32, i32)> {
        match self {
            SpeedProfile::Silent => PROFILE_SILENT.to_vec(),
            SpeedProfile::Performance => PROFILE_PERFORMANCE.to_vec(),
            SpeedProfile::Fixed(duty) => vec![(0, *duty as i32)],
            SpeedProfile::Custom(points) => points.clone(),
        }
    }

    /// Get profile name for display.
    pub fn name(&self) -> &'static str {
        match self {
            SpeedProfile::Silent => "Silent",
            SpeedProfile::Performance => "Performance",
            SpeedProfile::Fixed(_) => "Fixed",
            SpeedProfile::Custom(_) => "Custom",
        }
    }
}

impl std::fmt::Display for SpeedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeedProfile::Fixed(duty) => write!(f, "Fixed ({}%)", duty),
            _ => write!(f, "{}", self.name()),
        }
    }
}

// =============================================================================
// Pre-defined Profile Curves
// =============================================================================

/// Silent profile - minimal noise, ramps at 45°C+.
pub const PROFILE_SILENT: [(i32, i32); 5] = [(25, 30), (35, 35), (45, 50), (50, 75), (55, 90)];

/// Performance profile - aggressive cooling.
pub const PROFILE_PERFORMANCE: [(i32, i32); 5] =
    [(25, 50), (30, 60), (40, 75), (45, 85), (50, 95)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Channel, MAX_PROFILE_POINTS, prepare};

    #[test]
    fn test_presets_fit_device_table() {
        for profile in [SpeedProfile::Silent, SpeedProfile::Performance] {
            let table = prepare(Channel::Fan, &profile.to_points()).unwrap();
            assert_eq!(table.len(), MAX_PROFILE_POINTS);
            assert_eq!(table[MAX_PROFILE_POINTS - 1], (60, 100));
        }
    }

    #[test]
    fn test_fixed_profile_keeps_critical_ramp() {
        let table = prepare(Channel::Fan, &SpeedProfile::Fixed(60).to_points()).unwrap();
        assert_eq!(table[0], (0, 60));
        assert!(table[1..].iter().all(|&point| point == (60, 100)));
    }

    #[test]
    fn test_default_options() {
        let options = DriverOptions::default();
        assert!(!options.dry_run);
        assert_eq!(options.read_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_display() {
        assert_eq!(SpeedProfile::Fixed(42).to_string(), "Fixed (42%)");
        assert_eq!(SpeedProfile::Silent.to_string(), "Silent");
    }
}
