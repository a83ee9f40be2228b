//! Conversions between curtain location, reported position, and degrees.
//!
//! LOCATION counts Hall-1 ticks from the top endpoint (two per motor
//! revolution). POSITION is the percentage 0.0..=100.0 of the configured
//! maximum curtain length, 0 fully up and 100 fully down. Relative movement
//! commands are expressed in degrees of curtain-rod rotation.

use crate::config::GEAR_RATIO;

/// Hall-1 ticks corresponding to `deg` degrees of rod rotation.
pub const fn deg_to_location(deg: i32) -> i32 {
    GEAR_RATIO * 4 * deg / 360
}

/// Convert a position percentage into a location in ticks.
pub fn position100_to_location(position: f32, max_curtain_length: u16) -> i32 {
    if position > 100.0 {
        return max_curtain_length as i32;
    }
    (position * max_curtain_length as f32 / 100.0) as i32
}

/// Convert a location into the position percentage reported to the host.
///
/// While calibrating the location is not authoritative and 50.0 is reported
/// instead. Locations past either limit clamp to 0 / 100.
pub fn location_to_position100(location: i32, max_curtain_length: u16, calibrating: bool) -> f32 {
    if calibrating {
        return 50.0;
    }
    if location < 0 {
        // Past the top endpoint; do not report positions above fully-up.
        return 0.0;
    }
    if location > max_curtain_length as i32 {
        return 100.0;
    }
    100.0 * location as f32 / max_curtain_length as f32
}
