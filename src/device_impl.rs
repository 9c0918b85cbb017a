use crate::hw_def::*;
use crate::lifecycle::{ErrorListener, Lifecycle, ReadyListener};
use crate::types::*;

use core::future::Future;
use core::num::NonZeroU32;

use embassy_futures::select::{Either, select};
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

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

/// Await a bus operation, racing it against `delay` when a timeout is configured
async fn bounded<T, E, D, F>(delay: &mut D, timeout_ms: Option<NonZeroU32>, op: F) -> Result<T, Error<E>>
where
    D: DelayNs,
    F: Future<Output = Result<T, E>>,
{
    let Some(timeout_ms) = timeout_ms.map(NonZeroU32::get) else {
        return op.await.map_err(Error::I2c);
    };
    match select(op, delay.delay_ms(timeout_ms)).await {
        Either::First(res) => res.map_err(Error::I2c),
        Either::Second(()) => {
            debug!("si7020: bus transaction timed out after {} ms", timeout_ms);
            Err(Error::Timeout)
        }
    }
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

    /// Register a listener for a successful identity probe.
    ///
    /// Fires once. If the probe already succeeded it fires immediately; if it failed it never fires.
    pub fn on_ready(&mut self, listener: ReadyListener) -> Result<(), Error<E>> {
        self.lifecycle.on_ready(listener)
    }

    /// Register a listener for a failed identity probe.
    ///
    /// Fires once. If the probe already failed it fires immediately; if it succeeded it never fires.
    pub fn on_error(&mut self, listener: ErrorListener) -> Result<(), Error<E>> {
        self.lifecycle.on_error(listener)
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        trace!("si7020::send(): {:?}", bytes);
        bounded(&mut self.delay, self.config.timeout_ms, self.i2c.write(I2C_ADDRESS, bytes)).await
    }

    async fn transfer(&mut self, bytes: &[u8], read_buf: &mut [u8]) -> Result<(), Error<E>> {
        trace!("si7020::transfer(): {:?} read_len={}", bytes, read_buf.len());
        if bytes.is_empty() {
            bounded(&mut self.delay, self.config.timeout_ms, self.i2c.read(I2C_ADDRESS, read_buf)).await
        } else {
            bounded(
                &mut self.delay,
                self.config.timeout_ms,
                self.i2c.write_read(I2C_ADDRESS, bytes, read_buf),
            )
            .await
        }
    }

    /// Wait for the device to power up, then check that it is an Si7020.
    ///
    /// Runs once per driver: the listeners registered with [`Self::on_ready`] or
    /// [`Self::on_error`] are notified of the outcome, and later calls return the recorded
    /// outcome without touching the bus.
    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        if !self.lifecycle.begin_probe() {
            return self.lifecycle.probe_outcome();
        }
        self.delay.delay_ms(WAKE_UP_TIME_MS).await;

        let mut id = [0u8; ID_LEN];
        let outcome = match self.transfer(Command::ReadElectronicIdLow.as_bytes(), &mut id).await {
            Ok(()) => check_identity(&id),
            Err(e) => Err(e),
        };
        self.lifecycle.finish_probe(&outcome);
        outcome
    }

    async fn acquire(&mut self, command: Command) -> Result<u16, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(command.as_bytes()).await?;
        self.delay.delay_ms(WAKE_UP_TIME_MS).await;
        let mut read_buf = [0u8; MEASUREMENT_LEN];
        self.transfer(&[], &mut read_buf).await?;
        decode_measurement(&read_buf)
    }

    /// Measure relative humidity in percent
    pub async fn read_humidity(&mut self) -> Result<f64, Error<E>> {
        let raw = self.acquire(Command::MeasureRelHumidHold).await?;
        Ok(raw_rel_humid_to_percent(raw))
    }

    /// Measure temperature in the requested unit
    pub async fn read_temperature(&mut self, unit: TemperatureUnit) -> Result<f64, Error<E>> {
        let raw = self.acquire(Command::MeasureTempHold).await?;
        Ok(unit.convert(raw))
    }

    /// Measure relative humidity, then fetch the temperature taken during that conversion
    pub async fn measure(&mut self) -> Result<Reading, Error<E>> {
        let raw_humidity = self.acquire(Command::MeasureRelHumidHold).await?;
        let mut read_buf = [0u8; 2];
        self.transfer(Command::ReadTempFromPrevRelHumid.as_bytes(), &mut read_buf).await?;
        Ok(Reading::from_raw(raw_humidity, merge_bytes(read_buf[0], read_buf[1])))
    }

    /// Read user register 1
    pub async fn read_user_register(&mut self) -> Result<UserRegister, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(Command::ReadUserReg.as_bytes()).await?;
        let mut read_buf = [0u8; 1];
        self.transfer(&[], &mut read_buf).await?;
        Ok(UserRegister(read_buf[0]))
    }

    /// Condensation heater on or off. Every other bit of the user register is written back as read.
    pub async fn set_heater(&mut self, enable: bool) -> Result<(), Error<E>> {
        let current = self.read_user_register().await?;
        let updated = current.with_heater(enable);
        debug!("si7020: user register {:#x} -> {:#x}", current.raw(), updated.raw());
        self.send(&Command::WriteUserReg.with_value(updated.raw())).await
    }

    /// Read the heater current setting (0..=15)
    pub async fn heater_level(&mut self) -> Result<u8, Error<E>> {
        Ok(self.read_heater_register().await? & HEATER_LEVEL_MASK)
    }

    /// Set the heater current (0..=15), leaving the reserved bits of the register as read
    pub async fn set_heater_level(&mut self, level: u8) -> Result<(), Error<E>> {
        if level > HEATER_LEVEL_MAX {
            return Err(Error::InvalidInputData);
        }
        let current = self.read_heater_register().await?;
        let updated = heater_level_register(current, level);
        self.send(&Command::WriteHeaterReg.with_value(updated)).await
    }

    async fn read_heater_register(&mut self) -> Result<u8, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut read_buf = [0u8; 1];
        self.transfer(Command::ReadHeaterReg.as_bytes(), &mut read_buf).await?;
        Ok(read_buf[0])
    }

    /// software reset. The user and heater registers return to their power-on defaults.
    pub async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        self.send(Command::SoftReset.as_bytes()).await?;
        self.delay.delay_ms(WAKE_UP_TIME_MS).await;
        Ok(())
    }

    /// Read the 64-bit electronic serial number. Under the `crc` feature every checksum
    /// interleaved in the two ID reads is verified.
    pub async fn read_serial_number(&mut self) -> Result<SerialNumber, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut high = [0u8; ID_HIGH_LEN];
        self.transfer(Command::ReadElectronicIdHigh.as_bytes(), &mut high).await?;
        let mut low = [0u8; ID_LEN];
        self.transfer(Command::ReadElectronicIdLow.as_bytes(), &mut low).await?;
        decode_serial_number(&high, &low)
    }

    /// Read the firmware revision
    pub async fn read_firmware_revision(&mut self) -> Result<FirmwareRevision, Error<E>> {
        self.lifecycle.ensure_ready(self.config.require_ready)?;
        let mut read_buf = [0u8; 1];
        self.transfer(Command::ReadFirmwareRevision.as_bytes(), &mut read_buf).await?;
        Ok(FirmwareRevision::from(read_buf[0]))
    }
}
