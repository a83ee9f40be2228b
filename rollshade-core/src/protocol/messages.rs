// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command words of the host protocol and their decoded form.
//!
//! Commands come in two shapes. Zero-parameter commands are matched on the
//! full 16-bit word `c1 << 8 | c2`. One-parameter commands are matched on
//! `c1` alone (or its high nibble, when the low nibble carries payload bits)
//! with `c2` as the parameter.

// ----- Commands also understood by the factory module -----

// One-parameter
pub const CMD_GO_TO: u8 = 0xDD;

// Zero-parameter
pub const CMD_UP: u16 = 0x0ADD;
pub const CMD_DOWN: u16 = 0x0AEE;
pub const CMD_UP_17: u16 = 0x0A0D;
pub const CMD_DOWN_17: u16 = 0x0A0E;
pub const CMD_STOP: u16 = 0x0ACC;

pub const CMD_OVERRIDE_UP_90: u16 = 0xFAD1;
pub const CMD_OVERRIDE_DOWN_90: u16 = 0xFAD2;
pub const CMD_OVERRIDE_UP_6: u16 = 0xFAD3;
pub const CMD_OVERRIDE_DOWN_6: u16 = 0xFAD4;
pub const CMD_SET_MAX_CURTAIN_LENGTH: u16 = 0xFAEE;
pub const CMD_SET_FULL_CURTAIN_LENGTH: u16 = 0xFACC;
pub const CMD_RESET_CURTAIN_LENGTH: u16 = 0xFA00;

pub const CMD_GET_STATUS: u16 = 0xCCCC;

// ----- Extended commands of this firmware -----

// One-parameter. GO_TO carries a 12-bit fixed-point position (4 fractional
// bits) split across the low nibble of c1 and all of c2; SET_LOCATION and
// GO_TO_LOCATION carry 12 bits of ticks with the least-significant bit
// omitted.
pub const CMD_EXT_GO_TO: u8 = 0x10;
pub const CMD_EXT_SET_SPEED: u8 = 0x20;
pub const CMD_EXT_SET_DEFAULT_SPEED: u8 = 0x30;
pub const CMD_EXT_SET_MINIMUM_VOLTAGE: u8 = 0x40;
pub const CMD_EXT_SET_LOCATION: u8 = 0x50;
pub const CMD_EXT_SET_AUTO_CAL: u8 = 0x60;
pub const CMD_EXT_GO_TO_LOCATION: u8 = 0x70;
pub const CMD_EXT_SET_SLOWDOWN_FACTOR: u8 = 0x80;
pub const CMD_EXT_SET_MIN_SLOWDOWN_SPEED: u8 = 0x90;

// Zero-parameter
pub const CMD_EXT_OVERRIDE_DOWN: u16 = 0xFADA;
pub const CMD_EXT_GET_LOCATION: u16 = 0xCCD0;
pub const CMD_EXT_GET_VERSION: u16 = 0xCCDC;
pub const CMD_EXT_GET_STATUS: u16 = 0xCCDE;
pub const CMD_EXT_GET_LIMITS: u16 = 0xCCDF;
pub const CMD_EXT_DEBUG: u16 = 0xCCD1;
pub const CMD_EXT_SENSOR_DEBUG: u16 = 0xCCD2;

/// A decoded host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Up until stall; forces endpoint calibration.
    Up,
    /// Down to the configured maximum curtain length.
    Down,
    Up17,
    Down17,
    Stop,
    OverrideUp90,
    OverrideDown90,
    OverrideUp6,
    OverrideDown6,
    /// Continuous move down ignoring limits, five rod revolutions per command.
    OverrideDown5Revs,
    SetMaxCurtainLength,
    SetFullCurtainLength,
    ResetCurtainLength,
    GetStatus,
    GetExtStatus,
    GetLocation,
    GetVersion,
    GetLimits,
    GetDebug,
    GetSensorDebug,
    /// Go to a position percentage 0..=100.
    GoToPercent(u8),
    /// Go to a position in 1/16 % steps (12-bit fixed point).
    GoToPercent16(u16),
    /// Overwrite the current location (ticks, LSB omitted on the wire).
    SetLocation(u16),
    /// Go to an absolute tick location (LSB omitted on the wire).
    GoToLocation(u16),
    /// Session speed; not persisted.
    SetSpeed(u8),
    /// Persisted default speed.
    SetDefaultSpeed(u8),
    SetMinimumVoltage(u8),
    SetAutoCalibration(bool),
    SetSlowdownFactor(u8),
    SetMinSlowdownSpeed(u8),
}

/// Decode a command byte pair. Unknown commands (and parameter values the
/// protocol treats as no-ops) decode to `None` and are silently ignored.
pub fn decode(c1: u8, c2: u8) -> Option<Request> {
    let word = (c1 as u16) << 8 | c2 as u16;
    let request = match word {
        CMD_UP => Request::Up,
        CMD_DOWN => Request::Down,
        CMD_UP_17 => Request::Up17,
        CMD_DOWN_17 => Request::Down17,
        CMD_STOP => Request::Stop,
        CMD_OVERRIDE_UP_90 => Request::OverrideUp90,
        CMD_OVERRIDE_DOWN_90 => Request::OverrideDown90,
        CMD_OVERRIDE_UP_6 => Request::OverrideUp6,
        CMD_OVERRIDE_DOWN_6 => Request::OverrideDown6,
        CMD_EXT_OVERRIDE_DOWN => Request::OverrideDown5Revs,
        CMD_SET_MAX_CURTAIN_LENGTH => Request::SetMaxCurtainLength,
        CMD_SET_FULL_CURTAIN_LENGTH => Request::SetFullCurtainLength,
        CMD_RESET_CURTAIN_LENGTH => Request::ResetCurtainLength,
        CMD_GET_STATUS => Request::GetStatus,
        CMD_EXT_GET_STATUS => Request::GetExtStatus,
        CMD_EXT_GET_LOCATION => Request::GetLocation,
        CMD_EXT_GET_VERSION => Request::GetVersion,
        CMD_EXT_GET_LIMITS => Request::GetLimits,
        CMD_EXT_DEBUG => Request::GetDebug,
        CMD_EXT_SENSOR_DEBUG => Request::GetSensorDebug,
        _ => return decode_with_parameter(c1, c2),
    };
    Some(request)
}

fn decode_with_parameter(c1: u8, c2: u8) -> Option<Request> {
    let twelve_bits = ((c1 as u16 & 0x0F) << 8) | c2 as u16;
    match c1 {
        CMD_GO_TO => Some(Request::GoToPercent(c2)),
        CMD_EXT_SET_SPEED if c2 > 1 => Some(Request::SetSpeed(c2)),
        CMD_EXT_SET_DEFAULT_SPEED if c2 > 0 => Some(Request::SetDefaultSpeed(c2)),
        CMD_EXT_SET_MINIMUM_VOLTAGE => Some(Request::SetMinimumVoltage(c2)),
        CMD_EXT_SET_AUTO_CAL => Some(Request::SetAutoCalibration(c2 != 0)),
        // A zero factor would divide the approach-speed computation by zero.
        CMD_EXT_SET_SLOWDOWN_FACTOR if c2 > 0 => Some(Request::SetSlowdownFactor(c2)),
        CMD_EXT_SET_MIN_SLOWDOWN_SPEED => Some(Request::SetMinSlowdownSpeed(c2)),
        _ => match c1 & 0xF0 {
            CMD_EXT_GO_TO => Some(Request::GoToPercent16(twelve_bits)),
            CMD_EXT_SET_LOCATION => Some(Request::SetLocation(twelve_bits)),
            CMD_EXT_GO_TO_LOCATION => Some(Request::GoToLocation(twelve_bits)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_parameter_words() {
        assert_eq!(decode(0x0A, 0xDD), Some(Request::Up));
        assert_eq!(decode(0x0A, 0xEE), Some(Request::Down));
        assert_eq!(decode(0x0A, 0xCC), Some(Request::Stop));
        assert_eq!(decode(0xFA, 0xDA), Some(Request::OverrideDown5Revs));
        assert_eq!(decode(0xFA, 0x00), Some(Request::ResetCurtainLength));
        assert_eq!(decode(0xCC, 0xCC), Some(Request::GetStatus));
        assert_eq!(decode(0xCC, 0xDE), Some(Request::GetExtStatus));
    }

    #[test]
    fn go_to_percent_takes_any_parameter() {
        assert_eq!(decode(0xDD, 50), Some(Request::GoToPercent(50)));
        assert_eq!(decode(0xDD, 0), Some(Request::GoToPercent(0)));
    }

    #[test]
    fn twelve_bit_payloads_span_both_bytes() {
        assert_eq!(decode(0x13, 0x21), Some(Request::GoToPercent16(0x321)));
        assert_eq!(decode(0x5F, 0xFF), Some(Request::SetLocation(0xFFF)));
        assert_eq!(decode(0x70, 0x10), Some(Request::GoToLocation(0x010)));
    }

    #[test]
    fn speed_no_op_values_are_dropped() {
        assert_eq!(decode(0x20, 0), None);
        assert_eq!(decode(0x20, 1), None);
        assert_eq!(decode(0x20, 2), Some(Request::SetSpeed(2)));
        assert_eq!(decode(0x30, 0), None);
        assert_eq!(decode(0x30, 25), Some(Request::SetDefaultSpeed(25)));
        assert_eq!(decode(0x80, 0), None);
        assert_eq!(decode(0x80, 8), Some(Request::SetSlowdownFactor(8)));
    }

    #[test]
    fn auto_calibration_flag_is_boolean() {
        assert_eq!(decode(0x60, 0), Some(Request::SetAutoCalibration(false)));
        assert_eq!(decode(0x60, 7), Some(Request::SetAutoCalibration(true)));
    }

    #[test]
    fn unknown_commands_decode_to_none() {
        assert_eq!(decode(0x0A, 0x42), None);
        assert_eq!(decode(0xCC, 0xCD), None);
        assert_eq!(decode(0xA0, 0x00), None);
        assert_eq!(decode(0xFF, 0xFF), None);
    }
}
