//! Basic ADC support using direct PAC register access, plus the analog
//! sampling seam the motion core consults.

use rollshade_core::PowerMonitor;
use stm32f7xx_hal::pac;

/// ADC1 channel wired to the battery voltage divider.
const BATTERY_CHANNEL: u8 = 3;
/// ADC1 channel wired to the bridge shunt amplifier.
const CURRENT_CHANNEL: u8 = 4;

/// Battery divider ratio: the sense pin sees VBAT / 4.
const BATTERY_DIVIDER: u32 = 4;
/// ADC reference in millivolts.
const VREF_MV: u32 = 3300;

/// Generic ADC wrapper over a PAC ADCx peripheral.
pub struct Adc<ADC> {
    adc: ADC,
}

impl<ADC> Adc<ADC> {
    #[inline]
    pub fn free(self) -> ADC {
        self.adc
    }
}

fn init_basic_adc(adc: &pac::adc1::RegisterBlock) {
    // Power off to configure
    adc.cr2.modify(|_, w| w.adon().clear_bit());

    // 12-bit, right-aligned, software trigger
    adc.cr1.modify(|_, w| w.res().bits(0b00));
    adc.cr2.modify(|_, w| {
        w.cont().clear_bit();
        w.align().right();
        w.exten().disabled();
        w
    });

    // Power on
    adc.cr2.modify(|_, w| w.adon().set_bit());
}

/// Read a single channel with a long sample time.
fn read_channel(adc: &pac::adc1::RegisterBlock, channel: u8) -> u16 {
    if channel <= 9 {
        adc.smpr2.modify(|_, w| match channel {
            0 => w.smp0().bits(0b111),
            1 => w.smp1().bits(0b111),
            2 => w.smp2().bits(0b111),
            3 => w.smp3().bits(0b111),
            4 => w.smp4().bits(0b111),
            5 => w.smp5().bits(0b111),
            6 => w.smp6().bits(0b111),
            7 => w.smp7().bits(0b111),
            8 => w.smp8().bits(0b111),
            9 => w.smp9().bits(0b111),
            _ => unreachable!(),
        });
    }

    // Single conversion of the requested channel
    adc.sqr1.modify(|_, w| w.l().bits(0));
    adc.sqr3
        .modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });

    adc.cr2.modify(|_, w| w.swstart().set_bit());
    while adc.sr.read().eoc().bit_is_clear() {}

    adc.dr.read().data().bits() as u16
}

impl Adc<pac::ADC1> {
    /// Create and initialize ADC1.
    pub fn adc1(adc1: pac::ADC1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        // ADC prescaler: PCLK2 / 4
        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        common.ccr.modify(|_, w| w.adcpre().div4());

        init_basic_adc(&adc1);

        Self { adc: adc1 }
    }

    /// Read a single channel.
    #[inline]
    pub fn read(&self, channel: u8) -> u16 {
        read_channel(&self.adc, channel)
    }
}

/// Battery voltage and bridge current sampling for the motion core.
pub struct PowerSense {
    adc: Adc<pac::ADC1>,
}

impl PowerSense {
    pub fn new(adc: Adc<pac::ADC1>) -> Self {
        Self { adc }
    }
}

impl PowerMonitor for PowerSense {
    fn voltage(&mut self) -> u16 {
        let raw = self.adc.read(BATTERY_CHANNEL) as u32;
        // Raw counts -> battery millivolts -> sixteenths of a volt.
        let battery_mv = raw * VREF_MV * BATTERY_DIVIDER / 4095;
        (battery_mv * 16 / 1000) as u16
    }

    fn motor_current(&mut self) -> u8 {
        // The host only gets a byte; drop the low nibble.
        (self.adc.read(CURRENT_CHANNEL) >> 4) as u8
    }
}
