//! Persisted controller settings over a pluggable storage backend.
//!
//! Five 16-bit variables live in flash-emulated EEPROM, addressed by the
//! virtual addresses the factory tooling expects. The store provisions a
//! default on first boot (and writes it back so later boots read flash), and
//! skips the write cycle when the value is unchanged. The "only while
//! Stopped" gate for writes lives in the motion controller, which owns the
//! only timing context where a flash write cannot collide with motor
//! switching.

use crate::config::{
    DEFAULT_AUTO_CALIBRATION, DEFAULT_FULL_CURTAIN_LENGTH, DEFAULT_MINIMUM_VOLTAGE,
    DEFAULT_TARGET_SPEED,
};

/// The five persisted parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Setting {
    MaxCurtainLength,
    FullCurtainLength,
    MinimumVoltage,
    DefaultSpeed,
    AutoCalibration,
}

impl Setting {
    /// Virtual address of the variable in the backing store. 0xFFFF is
    /// reserved by the storage layer and must not appear here.
    pub const fn address(self) -> u16 {
        match self {
            Setting::MaxCurtainLength => 0x5555,
            Setting::FullCurtainLength => 0x6666,
            Setting::MinimumVoltage => 0x7777,
            Setting::DefaultSpeed => 0x8888,
            Setting::AutoCalibration => 0x9999,
        }
    }

    /// Factory value provisioned on first boot.
    pub const fn default_value(self) -> u16 {
        match self {
            // Until configured, the user limit is the factory limit.
            Setting::MaxCurtainLength => DEFAULT_FULL_CURTAIN_LENGTH,
            Setting::FullCurtainLength => DEFAULT_FULL_CURTAIN_LENGTH,
            Setting::MinimumVoltage => DEFAULT_MINIMUM_VOLTAGE,
            Setting::DefaultSpeed => DEFAULT_TARGET_SPEED as u16,
            Setting::AutoCalibration => DEFAULT_AUTO_CALIBRATION as u16,
        }
    }
}

/// Storage backend the firmware provides (flash-emulated EEPROM on the real
/// board, a plain array in tests).
pub trait SettingsBackend {
    type Error;

    /// Read the variable at `address`; `Ok(None)` if it was never written.
    fn read(&mut self, address: u16) -> Result<Option<u16>, Self::Error>;

    /// Write the variable at `address`.
    fn write(&mut self, address: u16, value: u16) -> Result<(), Self::Error>;
}

/// Typed accessors over a [`SettingsBackend`].
pub struct SettingsStore<B> {
    backend: B,
}

impl<B: SettingsBackend> SettingsStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read a setting, provisioning and persisting the default on first boot.
    pub fn read(&mut self, setting: Setting) -> Result<u16, B::Error> {
        match self.backend.read(setting.address())? {
            Some(value) => Ok(value),
            None => {
                let value = setting.default_value();
                self.backend.write(setting.address(), value)?;
                Ok(value)
            }
        }
    }

    /// Write a setting, skipping the flash cycle when the value is unchanged.
    pub fn write(&mut self, setting: Setting, value: u16) -> Result<(), B::Error> {
        if self.backend.read(setting.address())? != Some(value) {
            self.backend.write(setting.address(), value)?;
        }
        Ok(())
    }

    /// Tear down the store and return the backend.
    pub fn free(self) -> B {
        self.backend
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory backend recording every write, for the store tests and the
    /// motor scenario tests.
    pub(crate) struct MemoryBackend {
        pub entries: Vec<(u16, u16)>,
        pub writes: usize,
    }

    impl MemoryBackend {
        pub fn new() -> Self {
            Self {
                entries: Vec::new(),
                writes: 0,
            }
        }
    }

    impl SettingsBackend for MemoryBackend {
        type Error = core::convert::Infallible;

        fn read(&mut self, address: u16) -> Result<Option<u16>, Self::Error> {
            Ok(self
                .entries
                .iter()
                .find(|(a, _)| *a == address)
                .map(|(_, v)| *v))
        }

        fn write(&mut self, address: u16, value: u16) -> Result<(), Self::Error> {
            self.writes += 1;
            match self.entries.iter().position(|(a, _)| *a == address) {
                Some(index) => self.entries[index].1 = value,
                None => self.entries.push((address, value)),
            }
            Ok(())
        }
    }

    #[test]
    fn first_boot_provisions_defaults() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        assert_eq!(
            store.read(Setting::DefaultSpeed).unwrap(),
            Setting::DefaultSpeed.default_value()
        );
        // The default was written back, so the next read hits the backend.
        let backend = store.free();
        assert_eq!(backend.writes, 1);
        assert_eq!(
            backend.entries,
            vec![(0x8888, Setting::DefaultSpeed.default_value())]
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        for value in [0u16, 1, 1000, u16::MAX] {
            store.write(Setting::MaxCurtainLength, value).unwrap();
            assert_eq!(store.read(Setting::MaxCurtainLength).unwrap(), value);
        }
    }

    #[test]
    fn unchanged_write_skips_the_flash_cycle() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        store.write(Setting::MinimumVoltage, 96).unwrap();
        store.write(Setting::MinimumVoltage, 96).unwrap();
        assert_eq!(store.free().writes, 1);
    }

    #[test]
    fn addresses_match_the_factory_layout() {
        let expected = [
            (Setting::MaxCurtainLength, 0x5555),
            (Setting::FullCurtainLength, 0x6666),
            (Setting::MinimumVoltage, 0x7777),
            (Setting::DefaultSpeed, 0x8888),
            (Setting::AutoCalibration, 0x9999),
        ];
        for (setting, address) in expected {
            assert_eq!(setting.address(), address);
        }
    }
}
