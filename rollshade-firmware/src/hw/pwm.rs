//! TIM1 gate PWM for the H-bridge low sides, using direct PAC register
//! access.
//!
//! CH1 drives the LOW1 gate (down movement), CH4 drives the LOW2 gate (up
//! movement). The compare range is 0..=255 so the motion core's duty byte
//! maps straight onto CCR1/CCR4. Channels are kept disabled until a movement
//! energizes one of them.

use stm32f7xx_hal::pac;

pub struct MotorPwm {
    tim: pac::TIM1,
}

impl MotorPwm {
    /// Configure TIM1 for 8-bit edge-aligned PWM on CH1 and CH4.
    pub fn tim1(tim1: pac::TIM1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.tim1en().set_bit());

        let tim = tim1;

        // Disable while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // 8-bit duty range at full timer clock
        tim.psc.write(|w| w.psc().bits(0));
        tim.arr.write(|w| w.arr().bits(255));

        // PWM mode 1 with preloaded compares on CH1 and CH4
        tim.ccmr1_output()
            .modify(|_, w| unsafe { w.oc1m().bits(0b110) }.oc1pe().set_bit());
        tim.ccmr2_output()
            .modify(|_, w| unsafe { w.oc4m().bits(0b110) }.oc4pe().set_bit());

        tim.ccr1.write(|w| w.ccr().bits(0));
        tim.ccr4.write(|w| w.ccr().bits(0));

        // Channels stay disabled until energized
        tim.ccer.modify(|_, w| w.cc1e().clear_bit().cc4e().clear_bit());

        // Advanced timer: outputs need the master enable
        tim.bdtr.modify(|_, w| w.moe().set_bit());

        // Start counting
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Enable the LOW2 (up) channel.
    #[inline]
    pub fn enable_up(&mut self) {
        self.tim.ccer.modify(|_, w| w.cc4e().set_bit());
    }

    /// Enable the LOW1 (down) channel.
    #[inline]
    pub fn enable_down(&mut self) {
        self.tim.ccer.modify(|_, w| w.cc1e().set_bit());
    }

    /// Disable both low-side channels.
    #[inline]
    pub fn disable_both(&mut self) {
        self.tim
            .ccer
            .modify(|_, w| w.cc1e().clear_bit().cc4e().clear_bit());
    }

    /// Compare value of the up (LOW2) channel.
    #[inline]
    pub fn set_compare_up(&mut self, duty: u8) {
        self.tim.ccr4.write(|w| w.ccr().bits(duty as u16));
    }

    /// Compare value of the down (LOW1) channel.
    #[inline]
    pub fn set_compare_down(&mut self, duty: u8) {
        self.tim.ccr1.write(|w| w.ccr().bits(duty as u16));
    }

    /// Release the underlying timer peripheral.
    pub fn free(self) -> pac::TIM1 {
        self.tim
    }
}
