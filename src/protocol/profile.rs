//! Temperature/duty profile processing.
//!
//! The firmware holds a fixed table of [`MAX_PROFILE_POINTS`] (temperature,
//! duty) pairs and treats it as a step function of liquid temperature. User
//! profiles are sparse and unordered, so they go through three pure passes:
//!
//! 1. [`normalize`] - sort, de-duplicate, make duties non-decreasing and end
//!    the curve at 100% no later than the critical temperature.
//! 2. [`autofill`] - fit the curve into exactly `max_points` slots.
//! 3. [`clamp`] - clip duties into the channel bounds.
//!
//! When the terminal point pushes a full six point curve to seven points,
//! `autofill` merges the adjacent pair of user points with the smallest duty
//! step (lowest temperature wins ties) into one point at the lower
//! temperature with the higher duty. The merged curve never asks for less
//! duty than the user did at any temperature.

use tracing::{debug, info};

use crate::error::{AsetekError, Result};
use crate::protocol::commands::{CRITICAL_TEMPERATURE, Channel};

/// Number of (temperature, duty) pairs in the device table.
pub const MAX_PROFILE_POINTS: usize = 6;

/// Full duty.
pub const MAX_DUTY: u8 = 100;

/// Sort and sanitize a raw profile.
///
/// Duplicate temperatures keep the last occurrence, duties above 100% are
/// capped, points at or above `critical_temp` are replaced by the terminal
/// `(critical_temp, 100)` and nothing follows the first 100% point.
///
/// # Errors
/// `InvalidProfile` for an empty profile or a negative temperature or duty.
pub fn normalize(profile: &[(i32, i32)], critical_temp: u8) -> Result<Vec<(u8, u8)>> {
    if profile.is_empty() {
        return Err(AsetekError::InvalidProfile(
            "Profile cannot be empty".into(),
        ));
    }

    if let Some((temp, duty)) = profile.iter().find(|(t, d)| *t < 0 || *d < 0) {
        return Err(AsetekError::InvalidProfile(format!(
            "Negative value in point ({}°C, {}%)",
            temp, duty
        )));
    }

    // Later inserts overwrite earlier ones, so the last duplicate wins.
    let by_temp: std::collections::BTreeMap<i32, i32> = profile.iter().copied().collect();

    let mut normalized = Vec::with_capacity(by_temp.len() + 1);
    let mut floor = 0u8;

    for (temp, duty) in by_temp {
        if temp >= critical_temp as i32 {
            break;
        }

        let duty = (duty.min(MAX_DUTY as i32) as u8).max(floor);
        floor = duty;
        normalized.push((temp as u8, duty));

        if duty == MAX_DUTY {
            return Ok(normalized);
        }
    }

    normalized.push((critical_temp, MAX_DUTY));
    Ok(normalized)
}

/// Fit a normalized profile into exactly `max_points` slots.
///
/// Short profiles are padded by repeating their last point. A profile one
/// point too long because of its 100% terminal has one pair of user points
/// merged (see the module docs).
///
/// # Errors
/// `InvalidProfile` when empty, `ProfileTooLarge` when the profile cannot be
/// represented.
pub fn autofill(profile: &[(u8, u8)], max_points: usize) -> Result<Vec<(u8, u8)>> {
    let Some(&last) = profile.last() else {
        return Err(AsetekError::InvalidProfile(
            "Profile cannot be empty".into(),
        ));
    };

    let len = profile.len();

    if len <= max_points {
        let missing = max_points - len;
        if missing > 0 {
            debug!(
                "filling {} missing points with ({}°C, {}%)",
                missing, last.0, last.1
            );
        }
        let mut filled = profile.to_vec();
        filled.resize(max_points, last);
        return Ok(filled);
    }

    if len == max_points + 1 && max_points >= 2 && last.1 == MAX_DUTY {
        return Ok(collapse_one(profile));
    }

    Err(AsetekError::ProfileTooLarge {
        points: len,
        max: max_points,
    })
}

/// Merge the two adjacent non-terminal points with the smallest duty step.
fn collapse_one(profile: &[(u8, u8)]) -> Vec<(u8, u8)> {
    let user = &profile[..profile.len() - 1];

    // min_by_key keeps the first minimum, i.e. the lowest temperature.
    let idx = (0..user.len() - 1)
        .min_by_key(|&i| user[i + 1].1.abs_diff(user[i].1))
        .unwrap_or(0);

    let merged = (user[idx].0, user[idx].1.max(user[idx + 1].1));
    debug!(
        "merging ({}°C, {}%) and ({}°C, {}%) into ({}°C, {}%)",
        user[idx].0, user[idx].1, user[idx + 1].0, user[idx + 1].1, merged.0, merged.1
    );

    let mut collapsed = Vec::with_capacity(profile.len() - 1);
    collapsed.extend_from_slice(&profile[..idx]);
    collapsed.push(merged);
    collapsed.extend_from_slice(&profile[idx + 2..]);
    collapsed
}

/// Clip every duty into `[min_duty, max_duty]`.
pub fn clamp(profile: &[(u8, u8)], min_duty: u8, max_duty: u8) -> Vec<(u8, u8)> {
    profile
        .iter()
        .map(|&(temp, duty)| (temp, duty.clamp(min_duty, max_duty)))
        .collect()
}

/// Turn a raw user profile into the device table for `channel`.
pub fn prepare(channel: Channel, profile: &[(i32, i32)]) -> Result<Vec<(u8, u8)>> {
    if channel.profile_type().is_none() {
        return Err(channel.unsupported("speed profiles"));
    }

    let normalized = normalize(profile, CRITICAL_TEMPERATURE)?;
    let filled = autofill(&normalized, MAX_PROFILE_POINTS)?;
    let table = clamp(&filled, channel.min_duty(), channel.max_duty());

    for (temp, duty) in &table {
        info!("setting {} PWM point: ({}°C, {}%)", channel, temp, duty);
    }

    Ok(table)
}
