// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Rollshade Firmware
//!
//! Board crate for the rollshade motorized roller-blind controller, targeting
//! an STM32F7 MCU. The motion logic lives in `rollshade-core`; this crate
//! supplies the H-bridge output stage, the Hall/tick/regulator interrupt
//! plumbing, the flash-backed settings store, and the host UART link.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | MCU-level wrappers around USART, TIM1 PWM, ADC, LEDs |
//! | [`bridge`] | `HBridge` implementation over TIM1 compares + gate GPIOs |
//! | [`eeprom`] | Flash-emulated settings backend |
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//!
//! © 2025–2026 Christopher Liu

#![no_std]

pub mod bridge;
pub mod eeprom;
pub mod hw;
