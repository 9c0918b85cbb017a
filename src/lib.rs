//! This is a platform-agnostic Rust driver for the Si7020 relative humidity and temperature
//! digital sensor using the [`embedded-hal`] or [`embedded-hal-async`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! This driver allows you to:
//! - Probe the device identity once at start-up and be notified when it is ready (or not).
//! - Read relative humidity.
//! - Read temperature in Celsius or Fahrenheit.
//! - Read humidity and the temperature of the same conversion in one go.
//! - Enable/disable the on-die heater and set its current.
//! - Trigger a software reset.
//! - Read the electronic serial number and firmware revision.
//! - Share one driver between tasks with every command sequence serialized.
//! - blocking API support.
//! - async API support.
//!
//! This driver does not yet support the following device features:
//! - Measurement resolution configuration.
//! - No-hold master mode (the driver always waits a fixed conversion time, then reads).
//!
//! ## Features
//!
//! - `async`: Enables async API.
//! - `blocking`: Enables blocking API.
//! - `crc`: Checks received CRC against computed CRC.
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: Si7020
//!
//! The Si7020 I²C humidity and temperature sensor is a monolithic CMOS IC integrating humidity
//! and temperature sensor elements, an analog-to-digital converter, signal processing,
//! calibration data, and an I²C interface. An on-chip heater can be used to drive off
//! condensation; enabling it raises temperature readings while it is on.
//!
//! Datasheet:
//!   [Si7020-A20](https://www.silabs.com/documents/public/data-sheets/Si7020-A20.pdf)
//!
//! To use this driver, import this crate and an `embedded_hal` or `embedded_hal_async`
//! implementation, then instantiate the device and probe it.
//!
//! ## Async Example:
//!
//! ```ignore
//! use si7020::{Si7020, TemperatureUnit};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal_async::i2c::I2c instance */;
//! let delay = /* embedded_hal_async::delay::DelayNs instance */;
//!
//! let mut si7020 = Si7020::new(i2c, delay);
//! si7020.on_error(|failure| println!("{failure}")).unwrap();
//! si7020.probe().await.unwrap();
//!
//! println!("{:0.1} %RH, {:0.1} °F",
//!     si7020.read_humidity().await.unwrap(),
//!     si7020.read_temperature(TemperatureUnit::Fahrenheit).await.unwrap());
//!
//! // drive off condensation
//! si7020.set_heater(true).await.unwrap();
//! ```
//!
//! ## Blocking Example:
//!
//! ```ignore
//! use si7020::{blocking::Si7020, TemperatureUnit};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal::i2c::I2c instance */;
//! let delay = /* embedded_hal::delay::DelayNs instance */;
//!
//! let mut si7020 = Si7020::new(i2c, delay);
//! si7020.probe().unwrap();
//!
//! let reading = si7020.measure().unwrap();
//! println!("{:0.1} %RH, {:0.1} °C", reading.humidity_percent, reading.centigrade);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(not(any(feature = "async", feature = "blocking")))]
compile_error!("At least one of \"async\" and \"blocking\" features must be enabled");

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[cfg(feature = "async")]
mod device_impl;
mod hw_def;
mod lifecycle;
#[cfg(feature = "async")]
mod shared;
mod types;

#[cfg(feature = "blocking")]
pub mod blocking;

pub use crate::{
    hw_def::{
        EXPECTED_ID, HEATER_LEVEL_MAX, HTRE, I2C_ADDRESS, WAKE_UP_TIME_MS, heater_register,
        raw_rel_humid_to_percent, raw_temp_to_centigrade, raw_temp_to_fahrenheit,
    },
    lifecycle::{ErrorListener, MAX_LISTENERS, ReadyListener},
    types::*,
};
#[cfg(feature = "async")]
pub use crate::shared::SharedSi7020;
