// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Rollshade Motion Core
//!
//! Hardware-independent motion-control core for the rollshade motorized
//! roller-blind controller. The firmware crate wires this core to the real
//! H-bridge, Hall sensors, ADC, and host UART; everything in here runs just as
//! well on the host, which is where the test suite lives.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hall`] | Quadrature decoding of the two Hall sensors, RPM measurement |
//! | [`motor`] | Motion state machine, stall detection, deferred command execution |
//! | [`regulator`] | 10 ms duty-cycle regulator step |
//! | [`position`] | Location / position-percent / degree conversions |
//! | [`bridge`] | H-bridge trait the firmware implements |
//! | [`power`] | Battery voltage / motor current sampling trait |
//! | [`settings`] | Persisted settings over a pluggable backend |
//! | [`protocol`] | Host frame parsing, command decoding, response framing |
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod bridge;
pub mod config;
pub mod hall;
pub mod motor;
pub mod position;
pub mod power;
pub mod protocol;
pub mod regulator;
pub mod settings;

pub use bridge::{Direction, HBridge};
pub use motor::{Command, Motor, Status};
pub use power::PowerMonitor;
pub use settings::{Setting, SettingsBackend, SettingsStore};
