//! Blocking API, built on the [`embedded-hal`] I²C and delay traits.
//!
//! Same command sequences and readiness rules as the async [`crate::Si7020`]. A blocking bus
//! cannot be raced against a timer, so [`Config::timeout_ms`] is not enforced here.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal

use crate::hw_def::*;
use crate::lifecycle::{ErrorListener, Lifecycle, ReadyListener};
use crate::types::*;

use embedded_hal::{delay::DelayNs, i2c::I2c};

#[cfg(feature = "defmt")]
use defmt::{debug, trace};
#[cfg(feature = "log")]
use log::{debug, trace};
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Si7020 device driver (blocking)
#[derive(Debug)]
pub struct Si7020<I2C, Delay> {
    i2c: I2C,
    delay: Delay,
    config: Config,
    lifecycle: Lifecycle,
}

impl<I2C, Delay, E> Si7020<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a new Si7020 driver instance with the default configuration
    pub fn new(i2c: I2C, delay: Delay) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Create a new Si7020 driver instance
    pub fn with_config(i2c: I2C, delay: Delay, config: Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Destroy the driver and give back the bus and delay
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    /// Current readiness of the driver
    pub fn state(&self) -> DriverState {
        self.lifecycle.state()
    }

    /// Register a listener for a successful identity probe
    pub fn on_ready(&mut self, listener: ReadyListener) -> Result<(), Error<E>> {
        self.lifecycle.on_ready(listener)
    }

    /// Register a listener for a failed identity probe
    pub fn on_error(&mut self, listener: ErrorListener) -> Result<(), Error<E>> {
        self.lifecycle.on_error(listener)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        trace!("si7020::send(): {:?}", bytes);
        self.i2c.write(I2C_ADDRESS, bytes).map_err(Error::I2c)
    }

    fn transfer(&mut self, bytes: &[u8], read_buf: &mut [u8]) -> Result<(), Error<E>> {
        trace!("si7020::transfer(): {:?} read_len={}", bytes, read_buf.len());
        let res = if bytes.is_empty() {
            self.i2c.read(I2C_ADDRESS, read_buf)
        } else {
            self.i2c.write_read(I2C_ADDRESS, bytes, read_buf)
        };
        res.map_err(Error::I2c)
    }

    /// Wait for the device to power up, then check that it is an Si7020. Runs once per driver.
    pub fn probe(&mut self) -> Result<(), Error<E>> {
        if !self.lifecycle.begin_probe() {
            return self.lifecycle.probe_outcome();
        }
        self.delay.delay_ms(WAKE_UP_TIME_MS);

        let mut id = [0u8; ID_LEN];
        let outcome = self
            .transfer(Command::ReadElectronicIdLow.as_bytes(), &mut id)
            .and_then(|()| check_identity(&id));
        self.lifecycle.finish_probe(&outcome);
        outcome
    }

    fn acquire(&mut self, command: Command) -> Result<u16, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(command.as_bytes())?;
        self.delay.delay_ms(WAKE_UP_TIME_MS);
        let mut read_buf = [0u8; MEASUREMENT_LEN];
        self.transfer(&[], &mut read_buf)?;
        decode_measurement(&read_buf)
    }

    /// Measure relative humidity in percent
    pub fn read_humidity(&mut self) -> Result<f64, Error<E>> {
        Ok(raw_rel_humid_to_percent(self.acquire(Command::MeasureRelHumidHold)?))
    }

    /// Measure temperature in the requested unit
    pub fn read_temperature(&mut self, unit: TemperatureUnit) -> Result<f64, Error<E>> {
        Ok(unit.convert(self.acquire(Command::MeasureTempHold)?))
    }

    /// Measure relative humidity, then fetch the temperature taken during that conversion
    pub fn measure(&mut self) -> Result<Reading, Error<E>> {
        let raw_humidity = self.acquire(Command::MeasureRelHumidHold)?;
        let mut read_buf = [0u8; 2];
        self.transfer(Command::ReadTempFromPrevRelHumid.as_bytes(), &mut read_buf)?;
        Ok(Reading::from_raw(raw_humidity, merge_bytes(read_buf[0], read_buf[1])))
    }

    /// Read user register 1
    pub fn read_user_register(&mut self) -> Result<UserRegister, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(Command::ReadUserReg.as_bytes())?;
        let mut read_buf = [0u8; 1];
        self.transfer(&[], &mut read_buf)?;
        Ok(UserRegister(read_buf[0]))
    }

    /// Condensation heater on or off
    pub fn set_heater(&mut self, enable: bool) -> Result<(), Error<E>> {
        let current = self.read_user_register()?;
        let updated = current.with_heater(enable);
        debug!("si7020: user register {:#x} -> {:#x}", current.raw(), updated.raw());
        self.send(&Command::WriteUserReg.with_value(updated.raw()))
    }

    /// Read the heater current setting (0..=15)
    pub fn heater_level(&mut self) -> Result<u8, Error<E>> {
        Ok(self.read_heater_register()? & HEATER_LEVEL_MASK)
    }

    /// Set the heater current (0..=15)
    pub fn set_heater_level(&mut self, level: u8) -> Result<(), Error<E>> {
        if level > HEATER_LEVEL_MAX {
            return Err(Error::InvalidInputData);
        }
        let current = self.read_heater_register()?;
        self.send(&Command::WriteHeaterReg.with_value(heater_level_register(current, level)))
    }

    fn read_heater_register(&mut self) -> Result<u8, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut read_buf = [0u8; 1];
        self.transfer(Command::ReadHeaterReg.as_bytes(), &mut read_buf)?;
        Ok(read_buf[0])
    }

    /// software reset
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(Command::SoftReset.as_bytes())?;
        self.delay.delay_ms(WAKE_UP_TIME_MS);
        Ok(())
    }

    /// Read the 64-bit electronic serial number, verifying the ID checksums under `crc`
    pub fn read_serial_number(&mut self) -> Result<SerialNumber, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut high = [0u8; ID_HIGH_LEN];
        self.transfer(Command::ReadElectronicIdHigh.as_bytes(), &mut high)?;
        let mut low = [0u8; ID_LEN];
        self.transfer(Command::ReadElectronicIdLow.as_bytes(), &mut low)?;
        decode_serial_number(&high, &low)
    }

    /// Read the firmware revision
    pub fn read_firmware_revision(&mut self) -> Result<FirmwareRevision, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut read_buf = [0u8; 1];
        self.transfer(Command::ReadFirmwareRevision.as_bytes(), &mut read_buf)?;
        Ok(FirmwareRevision::from(read_buf[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const ADDR: u8 = I2C_ADDRESS;

    fn ready_driver(expectations: &[Transaction]) -> Si7020<I2cMock, NoopDelay> {
        let mut all = vec![Transaction::write_read(ADDR, vec![0xFC, 0xC9], vec![0x14, 0, 0, 0, 0, 0])];
        all.extend_from_slice(expectations);
        let mut si7020 = Si7020::new(I2cMock::new(&all), NoopDelay::new());
        si7020.probe().unwrap();
        si7020
    }

    fn done(si7020: Si7020<I2cMock, NoopDelay>) {
        let (mut i2c, _) = si7020.release();
        i2c.done();
    }

    #[test]
    fn identity_mismatch_is_terminal() {
        let expectations = [Transaction::write_read(ADDR, vec![0xFC, 0xC9], vec![0x15, 0, 0, 0, 0, 0])];
        let mut si7020 = Si7020::new(I2cMock::new(&expectations), NoopDelay::new());
        assert_eq!(si7020.probe(), Err(Error::IdentityMismatch(0x15)));
        assert_eq!(si7020.state(), DriverState::Failed(ProbeFailure::IdentityMismatch(0x15)));
        assert_eq!(si7020.read_temperature(TemperatureUnit::Celsius), Err(Error::NotReady));
        done(si7020);
    }

    #[test]
    fn humidity_and_temperature() {
        let mut si7020 = ready_driver(&[
            Transaction::write(ADDR, vec![0xE5]),
            Transaction::read(ADDR, vec![0x4E, 0x89, 0x16]),
            Transaction::write(ADDR, vec![0xE3]),
            Transaction::read(ADDR, vec![0x61, 0xA8, 0xE4]),
        ]);
        assert!((si7020.read_humidity().unwrap() - 32.347_244_262_695_31).abs() < 1e-9);
        assert!((si7020.read_temperature(TemperatureUnit::Fahrenheit).unwrap() - 68.327_348_632_812_5).abs() < 1e-9);
        done(si7020);
    }

    #[test]
    fn heater_toggle() {
        let mut si7020 = ready_driver(&[
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0b0011_1110]),
            Transaction::write(ADDR, vec![0xE6, 0b0011_1010]),
        ]);
        si7020.set_heater(false).unwrap();
        done(si7020);
    }

    #[test]
    fn heater_write_failure_is_reported() {
        let mut si7020 = ready_driver(&[
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0x3A]),
            Transaction::write(ADDR, vec![0xE6, 0x3E]).with_error(ErrorKind::Other),
        ]);
        assert_eq!(si7020.set_heater(true), Err(Error::I2c(ErrorKind::Other)));
        done(si7020);
    }

    #[test]
    fn measure_and_identification() {
        let mut si7020 = ready_driver(&[
            Transaction::write(ADDR, vec![0xE5]),
            Transaction::read(ADDR, vec![0x4E, 0x89, 0x16]),
            Transaction::write_read(ADDR, vec![0xE0], vec![0x61, 0xA8]),
            Transaction::write_read(ADDR, vec![0x84, 0xB8], vec![0xFF]),
            Transaction::write_read(ADDR, vec![0xFA, 0x0F], vec![0x11, 0x72, 0x22, 0x7E, 0x33, 0x71, 0x44, 0x30]),
            Transaction::write_read(ADDR, vec![0xFC, 0xC9], vec![0x14, 0xFF, 0x41, 0x55, 0x66, 0xF0]),
        ]);
        let reading = si7020.measure().unwrap();
        assert!((reading.fahrenheit() - 68.327_348_632_812_5).abs() < 1e-9);
        assert_eq!(si7020.read_firmware_revision().unwrap(), FirmwareRevision::V1_0);
        assert_eq!(si7020.read_serial_number().unwrap(), SerialNumber(0x1122_3344_14FF_5566));
        done(si7020);
    }

    #[cfg(feature = "crc")]
    #[test]
    fn corrupted_serial_number_is_rejected() {
        let mut si7020 = ready_driver(&[
            Transaction::write_read(ADDR, vec![0xFA, 0x0F], vec![0x11, 0x72, 0x22, 0x7E, 0x33, 0x71, 0x45, 0x30]),
            Transaction::write_read(ADDR, vec![0xFC, 0xC9], vec![0x14, 0xFF, 0x41, 0x55, 0x66, 0xF0]),
        ]);
        assert_eq!(si7020.read_serial_number(), Err(Error::CrcMismatch));
        done(si7020);
    }
}
