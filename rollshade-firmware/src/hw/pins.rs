// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin map of the rollshade controller board.
//!
//! | Function | Pin | Notes |
//! | -------- | --- | ----- |
//! | TIM1_CH1 (LOW1 PWM, down) | PA8 | AF1 |
//! | TIM1_CH4 (LOW2 PWM, up) | PA11 | AF1 |
//! | HIGH1 gate (up) | PC0 | push-pull |
//! | HIGH2 gate (down) | PC1 | push-pull |
//! | HALL1 | PB8 | EXTI, both edges |
//! | HALL2 | PB9 | EXTI, both edges |
//! | Battery sense | PA3 | ADC1 IN3 |
//! | Motor current sense | PA4 | ADC1 IN4 |
//! | Host/debug USART1 | PA9/PA10 | AF7 |
//! | Ready LED (green) | PB12 | active-high |
//! | Error LED (red) | PB13 | active-high |

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, gpioc, Alternate, Analog, Floating, Input, Output, PushPull},
    pac,
};

pub struct BoardPins {
    pub leds: Leds,
    pub usart1: Usart1Pins,
    pub motor: MotorPins,
    pub hall: HallPins,
    pub sense: SensePins,
}

pub struct Leds {
    pub green: gpiob::PB12<Output<PushPull>>,
    pub red: gpiob::PB13<Output<PushPull>>,
}

pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

pub struct MotorPins {
    pub low_1_pwm: gpioa::PA8<Alternate<1>>,
    pub low_2_pwm: gpioa::PA11<Alternate<1>>,
    pub high_1_gate: gpioc::PC0<Output<PushPull>>,
    pub high_2_gate: gpioc::PC1<Output<PushPull>>,
}

pub struct HallPins {
    pub hall_1: gpiob::PB8<Input<Floating>>,
    pub hall_2: gpiob::PB9<Input<Floating>>,
}

pub struct SensePins {
    pub battery: gpioa::PA3<Analog>,
    pub current: gpioa::PA4<Analog>,
}

impl BoardPins {
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB, gpioc: pac::GPIOC) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpioc = gpioc.split();

        Self {
            leds: Leds {
                green: gpiob.pb12.into_push_pull_output(),
                red: gpiob.pb13.into_push_pull_output(),
            },

            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            motor: MotorPins {
                low_1_pwm: gpioa.pa8.into_alternate::<1>(),
                low_2_pwm: gpioa.pa11.into_alternate::<1>(),
                high_1_gate: gpioc.pc0.into_push_pull_output(),
                high_2_gate: gpioc.pc1.into_push_pull_output(),
            },

            hall: HallPins {
                hall_1: gpiob.pb8.into_floating_input(),
                hall_2: gpiob.pb9.into_floating_input(),
            },

            sense: SensePins {
                battery: gpioa.pa3.into_analog(),
                current: gpioa.pa4.into_analog(),
            },
        }
    }
}
