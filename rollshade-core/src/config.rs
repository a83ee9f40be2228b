//! Motion tunables and provisioning defaults.
//!
//! Timing constants are in milliseconds of the 1 ms stall tick; lengths are in
//! Hall-1 ticks (two per motor revolution, `2 * GEAR_RATIO` per curtain-rod
//! revolution).

/// Motor revolutions per curtain-rod revolution.
pub const GEAR_RATIO: i32 = 171;

/// Gate PWM duty cycle applied when the bridge is first energized; the
/// regulator adjusts it toward the target RPM from there.
pub const INITIAL_PWM: u8 = 60;

/// Target RPM used when no speed has been configured.
pub const DEFAULT_TARGET_SPEED: u8 = 18;

/// No Hall-1 edge for this long while driving means the rotor has stalled.
pub const HALL_TIMEOUT_MS: u32 = 300;

/// Longer stall allowance while decelerating toward the target, where the
/// rotor legitimately turns slowly enough to starve the edge stream.
pub const HALL_TIMEOUT_WHILE_STOPPING_MS: u32 = 600;

/// Stall detection is suppressed for this long after energizing, giving the
/// motor time to gather speed from `INITIAL_PWM`.
pub const MOVEMENT_GRACE_PERIOD_MS: u32 = 2000;

/// De-energized settling time after an upward stall, letting curtain tension
/// unwind before the top position is latched as location 0.
pub const ENDPOINT_CALIBRATION_PERIOD_MS: u32 = 2000;

/// Bridge settle time between de-energizing and re-energizing.
pub const MOTOR_SETTLE_MS: u32 = 10;

/// Factory curtain length: 13 rod revolutions in Hall-1 ticks.
pub const DEFAULT_FULL_CURTAIN_LENGTH: u16 = (13 * 2 * GEAR_RATIO) as u16;

/// Minimum battery voltage in sixteenths of a volt; 0 disables the check.
pub const DEFAULT_MINIMUM_VOLTAGE: u16 = 0;

/// Auto-calibration (roll up until stall at power-on) ships enabled.
pub const DEFAULT_AUTO_CALIBRATION: bool = true;

/// Scales how far from the target deceleration begins; larger starts earlier.
pub const DEFAULT_SLOWDOWN_FACTOR: u8 = 8;

/// RPM floor while approaching the target.
pub const DEFAULT_MIN_SLOWDOWN_SPEED: u8 = 3;

/// Reported in the version reply.
pub const VERSION_MAJOR: u8 = 0;
pub const VERSION_MINOR: u8 = 1;

/// Battery level byte of the status reply.
// TODO: derive from the battery voltage divider once the gauge curve is characterized
pub const BATTERY_LEVEL: u8 = 0x12;
