use crate::lifecycle::{ErrorListener, ReadyListener};
use crate::types::*;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

/// An [`Si7020`] that can be used from several tasks at once.
///
/// Each operation holds the lock for its whole command sequence, so a heater read-modify-write
/// and a measurement's write, wait and read can never interleave on the bus.
pub struct SharedSi7020<M: RawMutex, I2C, Delay> {
    inner: Mutex<M, Si7020<I2C, Delay>>,
}

impl<M, I2C, Delay, E> SharedSi7020<M, I2C, Delay>
where
    M: RawMutex,
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Wrap a driver for shared use
    pub fn new(si7020: Si7020<I2C, Delay>) -> Self {
        Self {
            inner: Mutex::new(si7020),
        }
    }

    /// Give back the wrapped driver
    pub fn into_inner(self) -> Si7020<I2C, Delay> {
        self.inner.into_inner()
    }

    /// Current readiness of the driver
    pub async fn state(&self) -> DriverState {
        self.inner.lock().await.state()
    }

    /// Register a listener for a successful identity probe
    pub async fn on_ready(&self, listener: ReadyListener) -> Result<(), Error<E>> {
        self.inner.lock().await.on_ready(listener)
    }

    /// Register a listener for a failed identity probe
    pub async fn on_error(&self, listener: ErrorListener) -> Result<(), Error<E>> {
        self.inner.lock().await.on_error(listener)
    }

    /// See [`Si7020::probe`]
    pub async fn probe(&self) -> Result<(), Error<E>> {
        self.inner.lock().await.probe().await
    }

    /// See [`Si7020::read_humidity`]
    pub async fn read_humidity(&self) -> Result<f64, Error<E>> {
        self.inner.lock().await.read_humidity().await
    }

    /// See [`Si7020::read_temperature`]
    pub async fn read_temperature(&self, unit: TemperatureUnit) -> Result<f64, Error<E>> {
        self.inner.lock().await.read_temperature(unit).await
    }

    /// See [`Si7020::measure`]
    pub async fn measure(&self) -> Result<Reading, Error<E>> {
        self.inner.lock().await.measure().await
    }

    /// See [`Si7020::set_heater`]
    pub async fn set_heater(&self, enable: bool) -> Result<(), Error<E>> {
        self.inner.lock().await.set_heater(enable).await
    }

    /// See [`Si7020::set_heater_level`]
    pub async fn set_heater_level(&self, level: u8) -> Result<(), Error<E>> {
        self.inner.lock().await.set_heater_level(level).await
    }

    /// See [`Si7020::read_user_register`]
    pub async fn read_user_register(&self) -> Result<UserRegister, Error<E>> {
        self.inner.lock().await.read_user_register().await
    }

    /// See [`Si7020::heater_level`]
    pub async fn heater_level(&self) -> Result<u8, Error<E>> {
        self.inner.lock().await.heater_level().await
    }

    /// See [`Si7020::soft_reset`]
    pub async fn soft_reset(&self) -> Result<(), Error<E>> {
        self.inner.lock().await.soft_reset().await
    }

    /// See [`Si7020::read_serial_number`]
    pub async fn read_serial_number(&self) -> Result<SerialNumber, Error<E>> {
        self.inner.lock().await.read_serial_number().await
    }

    /// See [`Si7020::read_firmware_revision`]
    pub async fn read_firmware_revision(&self) -> Result<FirmwareRevision, Error<E>> {
        self.inner.lock().await.read_firmware_revision().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_def::I2C_ADDRESS as ADDR;

    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_async::delay::DelayNs;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    /// Delay that yields once before completing, so concurrent sequences get a chance to run
    struct YieldingDelay;

    impl DelayNs for YieldingDelay {
        async fn delay_ns(&mut self, _ns: u32) {
            embassy_futures::yield_now().await;
        }
    }

    #[test]
    fn concurrent_operations_do_not_interleave() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0xFC, 0xC9], vec![0x14, 0, 0, 0, 0, 0]),
            // humidity: write, wait, read
            Transaction::write(ADDR, vec![0xE5]),
            Transaction::read(ADDR, vec![0x4E, 0x89, 0x16]),
            // heater: read-modify-write
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0b0001_0001]),
            Transaction::write(ADDR, vec![0xE6, 0b0001_0101]),
            // reset, then its settle time, before the temperature command
            Transaction::write(ADDR, vec![0xFE]),
            Transaction::write(ADDR, vec![0xE3]),
            Transaction::read(ADDR, vec![0x61, 0xA8, 0xE4]),
            // user register, then heater register
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0b0011_1010]),
            Transaction::write_read(ADDR, vec![0x11], vec![0x03]),
        ];
        let shared: SharedSi7020<NoopRawMutex, _, _> =
            SharedSi7020::new(Si7020::new(I2cMock::new(&expectations), YieldingDelay));
        block_on(shared.probe()).unwrap();
        assert_eq!(block_on(shared.state()), DriverState::Ready);

        let (humidity, heater) = block_on(join(shared.read_humidity(), shared.set_heater(true)));
        assert!((humidity.unwrap() - 32.347_244_262_695_31).abs() < 1e-9);
        heater.unwrap();

        let (reset, celsius) = block_on(join(shared.soft_reset(), shared.read_temperature(TemperatureUnit::Celsius)));
        reset.unwrap();
        assert!((celsius.unwrap() - 20.181_860_351_562_5).abs() < 1e-9);

        let (register, level) = block_on(join(shared.read_user_register(), shared.heater_level()));
        assert_eq!(register.unwrap(), UserRegister(0b0011_1010));
        assert_eq!(level.unwrap(), 3);

        let (mut i2c, _) = shared.into_inner().release();
        i2c.done();
    }
}
