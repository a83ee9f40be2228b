// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Binary command protocol between the host (radio module or wired
//! controller) and the motor core.

pub mod messages;
pub mod parser;
pub mod reply;

pub use messages::Request;
pub use parser::Parser;
pub use reply::Reply;
