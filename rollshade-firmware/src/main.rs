// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Board bring-up and the three-clock interrupt plumbing.
//!
//! - Hall edges arrive over EXTI lines 8/9 and feed the quadrature decoder.
//! - SysTick runs the 1 ms stall tick.
//! - TIM3 runs the 10 ms speed regulator tick.
//! - The main loop parses host frames, dispatches commands, and executes the
//!   deferred-command mailbox (the only place allowed to block on the bridge
//!   settle delay).

#![no_main]
#![no_std]

use core::cell::RefCell;
use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::interrupt::{free, Mutex};
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception};
use panic_halt as _;

use hal::{
    pac,
    pac::interrupt,
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use rollshade_core::config::{MOTOR_SETTLE_MS, VERSION_MAJOR, VERSION_MINOR};
use rollshade_core::hall::HallSensor;
use rollshade_core::protocol::Parser;
use rollshade_core::{Motor, SettingsStore};

use rollshade_firmware::{
    bridge::MotorBridge,
    eeprom::FlashEeprom,
    hw::{Adc, BoardPins, MotorPwm, PowerSense, StatusLeds, Usart},
};

/// Milliseconds since boot, advanced by SysTick.
static MILLIS: AtomicU32 = AtomicU32::new(0);

/// The motor controller singleton, shared between the main loop and the
/// interrupt handlers.
static MOTOR: Mutex<RefCell<Option<Motor<MotorBridge>>>> = Mutex::new(RefCell::new(None));

#[inline]
fn now_ms() -> u32 {
    MILLIS.load(Ordering::Relaxed)
}

/// Busy-wait on the SysTick counter; main-loop context only.
fn wait_ms(ms: u32) {
    let start = now_ms();
    while now_ms().wrapping_sub(start) < ms {}
}

/// Run a closure against the motor inside a critical section.
fn with_motor<R>(f: impl FnOnce(&mut Motor<MotorBridge>) -> R) -> Option<R> {
    free(|cs| MOTOR.borrow(cs).borrow_mut().as_mut().map(f))
}

#[entry]
fn main() -> ! {
    // ================================
    // Peripherals + Clocks
    // ================================
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();

    // ================================
    // Board Pins + LEDs
    // ================================
    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOC);
    let mut leds = StatusLeds::new(pins.leds.green, pins.leds.red);

    // ================================
    // USART1: host link + debug console
    // ================================
    let serial = Serial::new(
        dp.USART1,
        (pins.usart1.tx, pins.usart1.rx),
        &clocks,
        Config {
            baud_rate: 115_200.bps(),
            ..Default::default()
        },
    );
    let mut usart = Usart::new(serial);

    writeln!(usart, "rollshade {}.{} booting\r", VERSION_MAJOR, VERSION_MINOR).ok();

    // ================================
    // Settings + Bridge + Motor
    // ================================
    let mut settings = SettingsStore::new(FlashEeprom::new(dp.FLASH));
    let bridge = MotorBridge::new(
        MotorPwm::tim1(dp.TIM1),
        pins.motor.high_1_gate,
        pins.motor.high_2_gate,
    );

    let motor = match Motor::new(bridge, &mut settings) {
        Ok(motor) => motor,
        Err(_) => {
            // Settings flash is unusable; refuse to run the motor.
            usart.println("E: settings store failed, halting");
            leds.fault();
            loop {
                cortex_m::asm::wfi();
            }
        }
    };
    free(|cs| MOTOR.borrow(cs).replace(Some(motor)));

    let mut power = PowerSense::new(Adc::adc1(dp.ADC1));

    // ================================
    // Hall edge interrupts: EXTI 8/9 on port B, both edges
    // ================================
    {
        let rcc_raw = unsafe { &*pac::RCC::ptr() };
        rcc_raw.apb2enr.modify(|_, w| w.syscfgen().set_bit());
        dp.SYSCFG
            .exticr3
            .modify(|_, w| unsafe { w.exti8().bits(1).exti9().bits(1) });
        dp.EXTI.imr.modify(|_, w| w.mr8().set_bit().mr9().set_bit());
        dp.EXTI.rtsr.modify(|_, w| w.tr8().set_bit().tr9().set_bit());
        dp.EXTI.ftsr.modify(|_, w| w.tr8().set_bit().tr9().set_bit());
    }

    // ================================
    // TIM3: 10 ms regulator tick
    // ================================
    {
        let rcc_raw = unsafe { &*pac::RCC::ptr() };
        rcc_raw.apb1enr.modify(|_, w| w.tim3en().set_bit());
        dp.TIM3.psc.write(|w| w.psc().bits(15_999)); // 16 MHz / 16000 = 1 kHz
        dp.TIM3.arr.write(|w| w.arr().bits(9));
        dp.TIM3.dier.modify(|_, w| w.uie().set_bit());
        dp.TIM3.cr1.modify(|_, w| w.cen().set_bit());
    }

    // ================================
    // SysTick: 1 ms stall tick
    // ================================
    let mut syst = cp.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(clocks.sysclk().raw() / 1000 - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::EXTI9_5);
        pac::NVIC::unmask(pac::Interrupt::TIM3);
    }

    leds.ready();
    usart.println("motor core ready");

    // ================================
    // Main loop
    // ================================
    let mut parser = Parser::new();
    loop {
        // Host frames
        if let Some(byte) = usart.read() {
            if let Some((c1, c2)) = parser.push(byte) {
                let result =
                    with_motor(|motor| motor.handle_command(&mut settings, &mut power, c1, c2));
                match result {
                    Some(Ok(Some(reply))) => usart.write_all(reply.as_bytes()),
                    Some(Err(_)) => usart.println("E: settings write failed"),
                    _ => {}
                }
            }
        }

        // Deferred motion commands: release inside the lock, settle outside
        // it, then energize. Blocking here is fine; the ISRs keep running.
        let pending = with_motor(|motor| motor.start_deferred(&mut power)).flatten();
        if let Some(dir) = pending {
            wait_ms(MOTOR_SETTLE_MS);
            let now = now_ms();
            with_motor(|motor| motor.energize(dir, now));
        }

        // Error indication
        leds.show(with_motor(|motor| motor.status()));
    }
}

/// 1 ms stall tick.
#[exception]
fn SysTick() {
    let now = MILLIS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    free(|cs| {
        if let Some(motor) = MOTOR.borrow(cs).borrow_mut().as_mut() {
            motor.stall_tick(now);
        }
    });
}

/// 10 ms regulator tick.
#[interrupt]
fn TIM3() {
    let tim = unsafe { &*pac::TIM3::ptr() };
    tim.sr.modify(|_, w| w.uif().clear_bit());
    free(|cs| {
        if let Some(motor) = MOTOR.borrow(cs).borrow_mut().as_mut() {
            motor.regulate();
        }
    });
}

/// Hall sensor edges. The pending flag is cleared before the level is
/// sampled so a fast follow-up edge re-enters the handler.
#[interrupt]
fn EXTI9_5() {
    let exti = unsafe { &*pac::EXTI::ptr() };
    let gpiob = unsafe { &*pac::GPIOB::ptr() };

    let pending = exti.pr.read();
    if pending.pr8().bit_is_set() {
        exti.pr.write(|w| w.pr8().set_bit());
        let level = gpiob.idr.read().idr8().bit_is_set();
        free(|cs| {
            if let Some(motor) = MOTOR.borrow(cs).borrow_mut().as_mut() {
                motor.hall_edge(HallSensor::Hall1, level);
            }
        });
    }
    if pending.pr9().bit_is_set() {
        exti.pr.write(|w| w.pr9().set_bit());
        let level = gpiob.idr.read().idr9().bit_is_set();
        free(|cs| {
            if let Some(motor) = MOTOR.borrow(cs).borrow_mut().as_mut() {
                motor.hall_edge(HallSensor::Hall2, level);
            }
        });
    }
}
