//! Flash-emulated EEPROM for the settings store.
//!
//! The last flash sector holds an append-only log of `(virtual address,
//! value)` halfword pairs. Reads scan the log and take the newest entry;
//! writes append to the first erased slot and compact the sector once it
//! fills up. Erased flash reads 0xFFFF, which is why that virtual address is
//! reserved.
//!
//! The motion controller guarantees writes only happen while the motor is
//! stopped, so a program or erase cycle is never interrupted by bridge
//! switching.

use rollshade_core::SettingsBackend;
use stm32f7xx_hal::pac;

/// Flash sector reserved for the store (kept out of memory.x).
const EEPROM_SECTOR: u8 = 11;
const EEPROM_BASE: usize = 0x081C_0000;
const EEPROM_SIZE: usize = 256 * 1024;
/// Log capacity in (address, value) pairs.
const EEPROM_SLOTS: usize = EEPROM_SIZE / 4;

const FLASH_KEY1: u32 = 0x4567_0123;
const FLASH_KEY2: u32 = 0xCDEF_89AB;

/// Erased-cell marker; doubles as the reserved virtual address.
const EMPTY: u16 = 0xFFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlashError {
    /// The programmed cell read back a different value.
    Verify,
    /// No free slot remained even after compaction.
    Full,
}

pub struct FlashEeprom {
    flash: pac::FLASH,
}

impl FlashEeprom {
    pub fn new(flash: pac::FLASH) -> Self {
        Self { flash }
    }

    #[inline]
    fn slot_ptr(slot: usize) -> *const u16 {
        (EEPROM_BASE + slot * 4) as *const u16
    }

    fn read_slot(slot: usize) -> (u16, u16) {
        let ptr = Self::slot_ptr(slot);
        unsafe { (ptr.read_volatile(), ptr.add(1).read_volatile()) }
    }

    /// Index of the first erased slot, if any.
    fn first_free_slot() -> Option<usize> {
        (0..EEPROM_SLOTS).find(|&slot| Self::read_slot(slot).0 == EMPTY)
    }

    /// Newest logged value for `address`.
    fn scan(address: u16) -> Option<u16> {
        let mut value = None;
        for slot in 0..EEPROM_SLOTS {
            let (slot_address, slot_value) = Self::read_slot(slot);
            if slot_address == EMPTY {
                break;
            }
            if slot_address == address {
                value = Some(slot_value);
            }
        }
        value
    }

    fn unlock(&mut self) {
        if self.flash.cr.read().lock().bit_is_set() {
            self.flash.keyr.write(|w| w.key().bits(FLASH_KEY1));
            self.flash.keyr.write(|w| w.key().bits(FLASH_KEY2));
        }
    }

    fn lock(&mut self) {
        self.flash.cr.modify(|_, w| w.lock().set_bit());
    }

    fn wait_idle(&self) {
        while self.flash.sr.read().bsy().bit_is_set() {}
    }

    fn program_halfword(&mut self, ptr: *mut u16, value: u16) -> Result<(), FlashError> {
        self.wait_idle();
        self.unlock();
        // x16 parallelism, program mode
        self.flash
            .cr
            .modify(|_, w| unsafe { w.psize().bits(0b01) }.pg().set_bit());
        unsafe { ptr.write_volatile(value) };
        self.wait_idle();
        self.flash.cr.modify(|_, w| w.pg().clear_bit());
        self.lock();

        if unsafe { (ptr as *const u16).read_volatile() } == value {
            Ok(())
        } else {
            Err(FlashError::Verify)
        }
    }

    fn erase_sector(&mut self) {
        self.wait_idle();
        self.unlock();
        self.flash.cr.modify(|_, w| {
            unsafe { w.snb().bits(EEPROM_SECTOR) };
            w.ser().set_bit()
        });
        self.flash.cr.modify(|_, w| w.strt().set_bit());
        self.wait_idle();
        self.flash.cr.modify(|_, w| w.ser().clear_bit());
        self.lock();
    }

    fn append(&mut self, slot: usize, address: u16, value: u16) -> Result<(), FlashError> {
        let ptr = Self::slot_ptr(slot) as *mut u16;
        self.program_halfword(ptr, address)?;
        self.program_halfword(unsafe { ptr.add(1) }, value)
    }

    /// Rewrite the newest value of every variable into a fresh sector.
    fn compact(&mut self) -> Result<usize, FlashError> {
        let mut latest = [(EMPTY, 0u16); 16];
        let mut count = 0;
        for slot in 0..EEPROM_SLOTS {
            let (slot_address, slot_value) = Self::read_slot(slot);
            if slot_address == EMPTY {
                break;
            }
            match latest[..count].iter().position(|(a, _)| *a == slot_address) {
                Some(index) => latest[index].1 = slot_value,
                None if count < latest.len() => {
                    latest[count] = (slot_address, slot_value);
                    count += 1;
                }
                None => {}
            }
        }

        self.erase_sector();
        for (slot, &(address, value)) in latest[..count].iter().enumerate() {
            self.append(slot, address, value)?;
        }
        Ok(count)
    }
}

impl SettingsBackend for FlashEeprom {
    type Error = FlashError;

    fn read(&mut self, address: u16) -> Result<Option<u16>, FlashError> {
        Ok(Self::scan(address))
    }

    fn write(&mut self, address: u16, value: u16) -> Result<(), FlashError> {
        let slot = match Self::first_free_slot() {
            Some(slot) => slot,
            None => {
                let used = self.compact()?;
                if used >= EEPROM_SLOTS {
                    return Err(FlashError::Full);
                }
                used
            }
        };
        self.append(slot, address, value)
    }
}
