// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART abstraction for the host link and the debug console.
//!
//! The host side sends six-byte command frames and receives framed replies;
//! both ride the same USART as the plain-text debug output, which the host
//! tooling filters on the leading `00 FF` reply header.
//!
//! Note: when using `writeln!`, include `\r` in the format string so line
//! endings render correctly on a terminal.

use core::fmt;
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{Instance, Pins, Rx, Serial, Tx},
};

pub struct Usart<U: Instance> {
    tx: Tx<U>,
    rx: Rx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, rx) = serial.split();
        Self { tx, rx }
    }

    /// Non-blocking read of one received byte.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        self.rx.read().ok()
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        let _ = block!(self.tx.write(byte));
    }

    /// Transmit a complete buffer, blocking until it has drained.
    pub fn write_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
        let _ = block!(self.tx.flush());
    }

    pub fn write_str(&mut self, s: &str) {
        for &byte in s.as_bytes() {
            self.write_byte(byte);
        }
    }

    /// Write a string with a CRLF terminator.
    #[inline]
    pub fn println(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }
}

// `write!` / `writeln!` support for the debug output.
impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}
