//! Board status indication.
//!
//! The controller has two indicator LEDs, both driven active-high: green is
//! the ready light, red latches while the motion controller sits in the
//! Error state (stalled during a descent) and clears once a stop command
//! recovers it.

use embedded_hal::digital::v2::OutputPin;
use rollshade_core::Status;

pub struct StatusLeds<G: OutputPin, R: OutputPin> {
    green: G,
    red: R,
    error_lit: bool,
}

impl<G: OutputPin, R: OutputPin> StatusLeds<G, R> {
    /// Both LEDs start dark; call [`ready`](Self::ready) once bring-up
    /// finishes.
    pub fn new(mut green: G, mut red: R) -> Self {
        let _ = green.set_low();
        let _ = red.set_low();
        Self {
            green,
            red,
            error_lit: false,
        }
    }

    /// Bring-up finished, light the ready indicator.
    pub fn ready(&mut self) {
        let _ = self.green.set_high();
    }

    /// Unrecoverable bring-up failure: ready out, error on.
    pub fn fault(&mut self) {
        let _ = self.green.set_low();
        let _ = self.red.set_high();
        self.error_lit = true;
    }

    /// Reflect the motion controller state on the error LED. Called from the
    /// main loop; only touches the pin when the state actually changes.
    pub fn show(&mut self, status: Option<Status>) {
        let error = status == Some(Status::Error);
        if error != self.error_lit {
            if error {
                let _ = self.red.set_high();
            } else {
                let _ = self.red.set_low();
            }
            self.error_lit = error;
        }
    }
}
