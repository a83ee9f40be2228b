//! Analog sampling seam for battery voltage and motor current.

/// Measurements the command processor reports and the motion controller
/// consults before energizing.
pub trait PowerMonitor {
    /// Battery voltage in sixteenths of a volt, the unit of the persisted
    /// minimum-voltage setting.
    fn voltage(&mut self) -> u16;

    /// Motor current byte as reported in the extended status reply.
    fn motor_current(&mut self) -> u8;
}
