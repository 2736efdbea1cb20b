pub mod parsing;

// Re-export commonly used items
pub use parsing::{
    parse_channel, parse_hex_color, parse_lighting_mode, parse_profile_points, parse_speed_profile,
};
