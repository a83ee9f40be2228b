pub mod adc;
pub mod led;
pub mod pins;
pub mod pwm;
pub mod usart;

pub use adc::{Adc, PowerSense};
pub use led::StatusLeds;
pub use pins::BoardPins;
pub use pwm::MotorPwm;
pub use usart::Usart;
