//! H-bridge output stage: TIM1 low-side PWM plus two high-side gate GPIOs.
//!
//! Up movement runs the LOW2 PWM against the HIGH1 gate; down movement runs
//! LOW1 against HIGH2. The gate GPIOs must have pull-downs so the bridge
//! cannot shoot through while the MCU is in reset.

use rollshade_core::{Direction, HBridge};
use stm32f7xx_hal::gpio::{gpioc, Output, PushPull};

use crate::hw::MotorPwm;

pub struct MotorBridge {
    pwm: MotorPwm,
    high_1_gate: gpioc::PC0<Output<PushPull>>,
    high_2_gate: gpioc::PC1<Output<PushPull>>,
}

impl MotorBridge {
    pub fn new(
        pwm: MotorPwm,
        high_1_gate: gpioc::PC0<Output<PushPull>>,
        high_2_gate: gpioc::PC1<Output<PushPull>>,
    ) -> Self {
        let mut bridge = Self {
            pwm,
            high_1_gate,
            high_2_gate,
        };
        bridge.release();
        bridge
    }
}

impl HBridge for MotorBridge {
    fn energize(&mut self, dir: Direction, duty: u8) {
        match dir {
            Direction::Up => {
                self.pwm.set_compare_up(duty);
                self.pwm.enable_up();
                self.high_1_gate.set_high();
            }
            Direction::Down => {
                self.pwm.set_compare_down(duty);
                self.pwm.enable_down();
                self.high_2_gate.set_high();
            }
        }
    }

    fn set_duty(&mut self, dir: Direction, duty: u8) {
        match dir {
            Direction::Up => self.pwm.set_compare_up(duty),
            Direction::Down => self.pwm.set_compare_down(duty),
        }
    }

    fn release(&mut self) {
        // All mosfets off before anything else
        self.pwm.disable_both();
        self.high_1_gate.set_low();
        self.high_2_gate.set_low();
        self.pwm.set_compare_down(0);
        self.pwm.set_compare_up(0);
    }
}
