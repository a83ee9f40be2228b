//! Motion controller: state machine, location tracking, stall detection, and
//! command dispatch.
//!
//! All mutable motor state lives in a single [`Motor`] value (one physical
//! motor per board). The firmware shares it between the main loop and the
//! interrupt handlers behind a critical-section mutex and feeds it from three
//! clocks: the Hall edge stream ([`Motor::hall_edge`]), the 1 ms stall tick
//! ([`Motor::stall_tick`]) and the 10 ms regulator tick ([`Motor::regulate`]).
//! Host commands are parsed in the main loop ([`Motor::handle_command`]),
//! which defers actuation through a one-slot mailbox because energizing the
//! bridge involves a settle delay that must not run in interrupt context.

use crate::bridge::{Direction, HBridge};
use crate::config::{
    BATTERY_LEVEL, DEFAULT_MIN_SLOWDOWN_SPEED, DEFAULT_SLOWDOWN_FACTOR,
    ENDPOINT_CALIBRATION_PERIOD_MS, HALL_TIMEOUT_MS, HALL_TIMEOUT_WHILE_STOPPING_MS, INITIAL_PWM,
    MOVEMENT_GRACE_PERIOD_MS, VERSION_MAJOR, VERSION_MINOR,
};
use crate::hall::{HallDecoder, HallSensor};
use crate::position::{deg_to_location, location_to_position100, position100_to_location};
use crate::power::PowerMonitor;
use crate::protocol::messages::{self, Request};
use crate::protocol::reply::{
    Reply, REPLY_DEBUG, REPLY_EXT_STATUS, REPLY_LIMITS, REPLY_LOCATION, REPLY_SENSOR_DEBUG,
    REPLY_STATUS, REPLY_VERSION,
};
use crate::regulator;
use crate::settings::{Setting, SettingsBackend, SettingsStore};

/// Target location sentinel: drive up until the motor stalls, which forces
/// endpoint calibration.
pub const TARGET_UP_UNTIL_STALL: i32 = -1;

/// Motion state reported in the extended status reply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Stopped = 0,
    Moving = 1,
    /// Decelerating toward the target.
    Stopping = 2,
    /// De-energized after an upward stall, waiting for curtain tension to
    /// settle before latching the top position.
    CalibratingEndPoint = 3,
    /// Stalled while descending; only a stop command recovers.
    Error = 4,
}

/// Deferred command mailbox payload. A newer command overwrites an
/// unexecuted older one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Stop,
}

/// State-machine events. Every transition that touches the bridge funnels
/// through [`Motor::apply`] so no observer ever sees a half-switched output
/// stage.
enum Event {
    Stalled { now_ms: u32 },
    CalibrationSettled,
    TargetReached,
    StopRequested,
}

/// Counters surfaced by the debug commands.
#[derive(Default)]
struct Diagnostics {
    dir_error: u32,
    sensor_ticks_while_stopped: u32,
    sensor_ticks_while_calibrating_endpoint: u32,
    saved_hall_1_ticks: u32,
    saved_hall_2_ticks: u32,
}

/// The motor controller singleton.
pub struct Motor<B: HBridge> {
    bridge: B,
    hall: HallDecoder,

    status: Status,
    direction: Option<Direction>,

    /// Curtain location in Hall-1 ticks from the top endpoint. Transiently
    /// negative (rod nudged past top) or beyond the maximum length (override
    /// commands) is allowed.
    location: i32,
    target_location: i32,
    /// While true, limits are not enforced and the reported position is
    /// pinned to 50%.
    calibrating: bool,

    target_speed: u8,
    curr_pwm: u8,

    movement_started_at: u32,
    endpoint_calibration_started_at: u32,

    deferred: Option<Command>,

    // Runtime image of the persisted settings.
    max_curtain_length: u16,
    full_curtain_length: u16,
    minimum_voltage: u16,
    default_speed: u8,
    auto_calibration: bool,

    slowdown_factor: u8,
    min_slowdown_speed: u8,

    diag: Diagnostics,
}

impl<B: HBridge> Motor<B> {
    /// Build the controller from the persisted settings and put the bridge
    /// into a known-safe state.
    ///
    /// The curtain is assumed to hang at the bottom position until proven
    /// otherwise; with auto-calibration enabled an upward run to the stall
    /// point is deferred so the top endpoint is re-learned on every power-up.
    pub fn new<E: SettingsBackend>(
        bridge: B,
        settings: &mut SettingsStore<E>,
    ) -> Result<Self, E::Error> {
        let max_curtain_length = settings.read(Setting::MaxCurtainLength)?;
        let full_curtain_length = settings.read(Setting::FullCurtainLength)?;
        let minimum_voltage = settings.read(Setting::MinimumVoltage)?;
        let default_speed = settings.read(Setting::DefaultSpeed)? as u8;
        let auto_calibration = settings.read(Setting::AutoCalibration)? != 0;

        let mut motor = Self {
            bridge,
            hall: HallDecoder::new(),
            status: Status::Stopped,
            direction: None,
            location: max_curtain_length as i32,
            target_location: 0,
            calibrating: false,
            target_speed: 0,
            curr_pwm: 0,
            movement_started_at: 0,
            endpoint_calibration_started_at: 0,
            deferred: None,
            max_curtain_length,
            full_curtain_length,
            minimum_voltage,
            default_speed,
            auto_calibration,
            slowdown_factor: DEFAULT_SLOWDOWN_FACTOR,
            min_slowdown_speed: DEFAULT_MIN_SLOWDOWN_SPEED,
            diag: Diagnostics::default(),
        };
        motor.bridge.release();

        if motor.auto_calibration {
            motor.calibrating = true;
            motor.deferred = Some(Command::Up);
        }
        Ok(motor)
    }

    // ================================
    // Interrupt-context entry points
    // ================================

    /// Decode one Hall sensor edge and track the curtain location.
    ///
    /// Runs in the edge ISR: non-blocking, no flash access. May stop the
    /// motor when the target location is reached.
    pub fn hall_edge(&mut self, sensor: HallSensor, level: bool) {
        // Edges arriving outside a commanded move are tension/backlash
        // movement; count them for the sensor debug command.
        match self.status {
            Status::Stopped => self.diag.sensor_ticks_while_stopped += 1,
            Status::CalibratingEndPoint => {
                self.diag.sensor_ticks_while_calibrating_endpoint += 1
            }
            _ => {}
        }

        let Some(sense) = self.hall.feed(sensor, level) else {
            return;
        };

        // An edge whose sense contradicts the commanded direction is noise
        // (or a slipping coupling); drop it. With no commanded direction the
        // rod is moving passively and must still be tracked.
        if self.direction == Some(sense.reversed()) {
            self.diag.dir_error += 1;
            return;
        }
        self.track(sense);
    }

    /// 1 ms tick: stall detection and endpoint-calibration timing.
    pub fn stall_tick(&mut self, now_ms: u32) {
        match self.status {
            Status::Moving | Status::Stopping => {
                self.hall.bump_idle();
                if now_ms.wrapping_sub(self.movement_started_at) > MOVEMENT_GRACE_PERIOD_MS
                    && self.hall.idle_ms() > HALL_TIMEOUT_MS
                {
                    if self.status == Status::Stopping
                        && self.hall.idle_ms() < HALL_TIMEOUT_WHILE_STOPPING_MS
                    {
                        // Decelerating near the target the rotor legitimately
                        // turns this slowly; give it longer to produce an edge.
                    } else {
                        self.apply(Event::Stalled { now_ms });
                    }
                }
            }
            Status::CalibratingEndPoint => {
                if now_ms.wrapping_sub(self.endpoint_calibration_started_at)
                    > ENDPOINT_CALIBRATION_PERIOD_MS
                {
                    // Tension has settled; this is the top position.
                    self.apply(Event::CalibrationSettled);
                }
            }
            _ => {}
        }
    }

    /// 10 ms tick: nudge the PWM duty toward the target RPM.
    pub fn regulate(&mut self) {
        if !matches!(self.status, Status::Moving | Status::Stopping) {
            return;
        }
        let next = regulator::next_duty(self.curr_pwm, self.hall.rpm(), self.target_speed);
        if next != self.curr_pwm {
            self.curr_pwm = next;
            if let Some(dir) = self.direction {
                self.bridge.set_duty(dir, next);
            }
        }
    }

    // ================================
    // Main-loop entry points
    // ================================

    /// Execute the deferred command mailbox.
    ///
    /// A pending stop is applied immediately. For a movement command the
    /// bridge is released and the requested direction returned; the caller
    /// waits out the mechanical settle delay outside any critical section and
    /// then calls [`Motor::energize`]. Commands that cannot start (battery
    /// below the configured minimum) are discarded.
    pub fn start_deferred<P: PowerMonitor>(&mut self, power: &mut P) -> Option<Direction> {
        match self.deferred.take()? {
            Command::Stop => {
                self.apply(Event::StopRequested);
                None
            }
            Command::Up => self.prepare_start(power, Direction::Up),
            Command::Down => self.prepare_start(power, Direction::Down),
        }
    }

    /// Energize the bridge after the settle delay that follows
    /// [`Motor::start_deferred`].
    pub fn energize(&mut self, dir: Direction, now_ms: u32) {
        self.movement_started_at = now_ms;
        self.target_speed = self.default_speed;
        self.curr_pwm = INITIAL_PWM;
        self.status = Status::Moving;
        self.direction = Some(dir);
        self.bridge.energize(dir, INITIAL_PWM);
    }

    fn prepare_start<P: PowerMonitor>(&mut self, power: &mut P, dir: Direction) -> Option<Direction> {
        if !self.voltage_ok(power) {
            return None;
        }
        // Reset all motion state before re-energizing.
        self.halt();
        Some(dir)
    }

    fn voltage_ok<P: PowerMonitor>(&self, power: &mut P) -> bool {
        self.minimum_voltage == 0 || power.voltage() >= self.minimum_voltage
    }

    /// Dispatch a decoded host command pair.
    ///
    /// Query commands return a framed reply; motion and configuration
    /// commands return `None` and leave the transmit path untouched. Unknown
    /// commands are ignored. Storage errors from persisting a setting
    /// propagate to the caller.
    pub fn handle_command<E: SettingsBackend, P: PowerMonitor>(
        &mut self,
        settings: &mut SettingsStore<E>,
        power: &mut P,
        c1: u8,
        c2: u8,
    ) -> Result<Option<Reply>, E::Error> {
        let Some(request) = messages::decode(c1, c2) else {
            return Ok(None);
        };

        let reply = match request {
            Request::Up => {
                self.target_location = TARGET_UP_UNTIL_STALL;
                self.defer(Command::Up);
                None
            }
            Request::Down => {
                self.target_location = self.max_curtain_length as i32;
                self.defer(Command::Down);
                None
            }
            Request::Up17 => {
                self.target_location = (self.location - deg_to_location(17)).max(0);
                self.defer(Command::Up);
                None
            }
            Request::Down17 => {
                self.target_location =
                    (self.location + deg_to_location(17)).min(self.max_curtain_length as i32);
                self.defer(Command::Down);
                None
            }
            Request::Stop => {
                self.defer(Command::Stop);
                None
            }
            Request::OverrideUp90 => self.defer_relative(-deg_to_location(90)),
            Request::OverrideDown90 => self.defer_relative(deg_to_location(90)),
            Request::OverrideUp6 => self.defer_relative(-deg_to_location(6)),
            Request::OverrideDown6 => self.defer_relative(deg_to_location(6)),
            Request::OverrideDown5Revs => self.defer_relative(deg_to_location(360 * 5)),
            Request::SetMaxCurtainLength => {
                self.write_setting(settings, Setting::MaxCurtainLength, self.location as u16)?;
                self.max_curtain_length = self.location as u16;
                None
            }
            Request::SetFullCurtainLength => {
                self.write_setting(settings, Setting::FullCurtainLength, self.location as u16)?;
                self.full_curtain_length = self.location as u16;
                // The user limit is reset alongside the factory limit.
                self.write_setting(settings, Setting::MaxCurtainLength, self.location as u16)?;
                self.max_curtain_length = self.location as u16;
                None
            }
            Request::ResetCurtainLength => {
                self.write_setting(settings, Setting::MaxCurtainLength, self.full_curtain_length)?;
                self.max_curtain_length = self.full_curtain_length;
                // Movement is unrestricted until calibration completes.
                self.calibrating = true;
                None
            }
            Request::GoToPercent(percent) => {
                self.go_to_percent(percent as f32);
                None
            }
            Request::GoToPercent16(fixed) => {
                self.go_to_percent(fixed as f32 / 16.0);
                None
            }
            Request::SetLocation(raw) => {
                // The wire format drops the least-significant bit.
                self.location = (raw << 1) as i32;
                self.calibrating = false;
                None
            }
            Request::GoToLocation(raw) => {
                self.go_to_location((raw << 1) as i32);
                None
            }
            Request::SetSpeed(rpm) => {
                self.default_speed = rpm;
                if self.target_speed != 0 {
                    // Retarget the move in progress.
                    self.target_speed = rpm;
                }
                None
            }
            Request::SetDefaultSpeed(rpm) => {
                self.write_setting(settings, Setting::DefaultSpeed, rpm as u16)?;
                self.default_speed = rpm;
                None
            }
            Request::SetMinimumVoltage(sixteenths) => {
                self.write_setting(settings, Setting::MinimumVoltage, sixteenths as u16)?;
                self.minimum_voltage = sixteenths as u16;
                None
            }
            Request::SetAutoCalibration(enabled) => {
                self.write_setting(settings, Setting::AutoCalibration, enabled as u16)?;
                self.auto_calibration = enabled;
                None
            }
            Request::SetSlowdownFactor(factor) => {
                self.slowdown_factor = factor;
                None
            }
            Request::SetMinSlowdownSpeed(rpm) => {
                self.min_slowdown_speed = rpm;
                None
            }
            Request::GetStatus => Some(Reply::build(
                REPLY_STATUS,
                &[
                    BATTERY_LEVEL,
                    power.voltage().min(u8::MAX as u16) as u8,
                    self.hall.rpm() as u8,
                    self.position100() as u8,
                ],
            )),
            Request::GetExtStatus => {
                let position256 = (self.position100() * 256.0) as i32 as u16;
                Some(Reply::build(
                    REPLY_EXT_STATUS,
                    &[
                        self.status as u8,
                        power.motor_current(),
                        self.hall.rpm() as u8,
                        (position256 >> 8) as u8,
                        position256 as u8,
                    ],
                ))
            }
            Request::GetLocation => {
                let location = self.location as i16 as u16;
                let target = self.target_location as i16 as u16;
                Some(Reply::build(
                    REPLY_LOCATION,
                    &[
                        (location >> 8) as u8,
                        location as u8,
                        (target >> 8) as u8,
                        target as u8,
                    ],
                ))
            }
            Request::GetVersion => Some(Reply::build(
                REPLY_VERSION,
                &[
                    VERSION_MAJOR,
                    VERSION_MINOR,
                    self.minimum_voltage.min(u8::MAX as u16) as u8,
                    self.default_speed,
                ],
            )),
            Request::GetLimits => Some(Reply::build(
                REPLY_LIMITS,
                &[
                    self.calibrating as u8,
                    (self.max_curtain_length >> 8) as u8,
                    self.max_curtain_length as u8,
                    (self.full_curtain_length >> 8) as u8,
                    self.full_curtain_length as u8,
                ],
            )),
            Request::GetDebug => Some(Reply::build(
                REPLY_DEBUG,
                &[
                    0,
                    self.diag.dir_error as u8,
                    self.diag.sensor_ticks_while_calibrating_endpoint as u8,
                    self.diag.sensor_ticks_while_stopped as u8,
                    0,
                ],
            )),
            Request::GetSensorDebug => Some(Reply::build(
                REPLY_SENSOR_DEBUG,
                &[
                    (self.diag.saved_hall_1_ticks >> 8) as u8,
                    self.diag.saved_hall_1_ticks as u8,
                    (self.diag.saved_hall_2_ticks >> 8) as u8,
                    self.diag.saved_hall_2_ticks as u8,
                    0,
                ],
            )),
        };
        Ok(reply)
    }

    // ================================
    // Accessors
    // ================================

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    #[inline]
    pub fn location(&self) -> i32 {
        self.location
    }

    #[inline]
    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    /// Reported curtain position, 0.0 fully up to 100.0 fully down.
    pub fn position100(&self) -> f32 {
        location_to_position100(self.location, self.max_curtain_length, self.calibrating)
    }

    /// Current curtain-rod RPM.
    #[inline]
    pub fn rpm(&self) -> u32 {
        self.hall.rpm()
    }

    // ================================
    // Internals
    // ================================

    fn defer(&mut self, command: Command) {
        self.deferred = Some(command);
    }

    /// Queue a relative move of `delta` ticks without clamping to the soft
    /// limits.
    fn defer_relative(&mut self, delta: i32) -> Option<Reply> {
        self.target_location = self.location + delta;
        self.defer(if delta < 0 { Command::Up } else { Command::Down });
        None
    }

    fn go_to_percent(&mut self, percent: f32) {
        if self.calibrating {
            // Position is meaningless until the endpoint is known.
            return;
        }
        self.go_to_location(position100_to_location(percent, self.max_curtain_length));
    }

    fn go_to_location(&mut self, target: i32) {
        self.target_location = target;
        self.defer(if target < self.location {
            Command::Up
        } else {
            Command::Down
        });
    }

    /// Persist a setting. Flash writes must not be interrupted by motor
    /// switching, so anything but Stopped silently drops the write; the
    /// caller still updates its runtime image.
    fn write_setting<E: SettingsBackend>(
        &self,
        settings: &mut SettingsStore<E>,
        setting: Setting,
        value: u16,
    ) -> Result<(), E::Error> {
        if self.status == Status::Stopped {
            settings.write(setting, value)?;
        }
        Ok(())
    }

    /// Track one accepted Hall edge in the sensed direction.
    ///
    /// Ignored while calibrating: the rod is rolling up against the hard stop
    /// and location is re-latched to 0 afterwards anyway.
    fn track(&mut self, sense: Direction) {
        if self.calibrating {
            return;
        }

        match sense {
            Direction::Up => {
                self.location -= 1;
                if self.direction == Some(Direction::Up)
                    && self.target_location != TARGET_UP_UNTIL_STALL
                    && self.location - 1 <= self.target_location
                {
                    // Stop just before the target.
                    self.apply(Event::TargetReached);
                    return;
                }
            }
            Direction::Down => {
                self.location += 1;
                if self.direction == Some(Direction::Down)
                    && self.location + 1 >= self.target_location
                {
                    self.apply(Event::TargetReached);
                    return;
                }
            }
        }

        // Approaching the target: shed speed so the final stop lands within
        // a tick. target_speed is only ever lowered here.
        if self.direction.is_some() {
            let distance = (self.target_location - self.location).abs();
            if distance < self.target_speed as i32 * self.slowdown_factor as i32 / 8 {
                self.status = Status::Stopping;
                let new_speed = (distance * 8 / self.slowdown_factor as i32)
                    .max(self.min_slowdown_speed as i32);
                if new_speed < self.target_speed as i32 {
                    self.target_speed = new_speed as u8;
                }
            }
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::TargetReached | Event::StopRequested => self.halt(),
            Event::CalibrationSettled => {
                self.status = Status::Stopped;
                // Limits are enforced from now on.
                self.calibrating = false;
                self.location = 0;
            }
            Event::Stalled { now_ms } => {
                if self.status == Status::Stopped {
                    return;
                }
                let stalled_status = self.status;
                let stalled_direction = self.direction;
                self.halt();

                match (stalled_status, stalled_direction) {
                    (Status::Moving, Some(Direction::Up)) => {
                        // An abrupt stall going up means the top hard stop:
                        // wait out the curtain tension, then latch location 0.
                        self.status = Status::CalibratingEndPoint;
                        self.diag.sensor_ticks_while_calibrating_endpoint = 0;
                        self.endpoint_calibration_started_at = now_ms;
                    }
                    (Status::Moving, _) => {
                        // Gravity assists a descent; a stall here is a jam.
                        self.status = Status::Error;
                    }
                    // Stalling while decelerating is just the stop arriving
                    // a little early.
                    _ => {}
                }
            }
        }
    }

    /// De-energize and reset all motion state. Callable from any context;
    /// `status` becomes Stopped only after the outputs are inactive, so an
    /// observer that reads Stopped sees a dead bridge.
    fn halt(&mut self) {
        self.bridge.release();

        self.status = Status::Stopped;
        self.direction = None;
        self.curr_pwm = 0;
        self.target_speed = 0;

        self.diag.sensor_ticks_while_stopped = 0;
        self.diag.saved_hall_1_ticks = self.hall.hall_1_ticks();
        self.diag.saved_hall_2_ticks = self.hall.hall_2_ticks();

        self.hall.reset_motion();
    }
}
