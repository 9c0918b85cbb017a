use crate::hw_def::*;
#[cfg(feature = "async")]
use crate::lifecycle::Lifecycle;

use core::fmt;
use core::num::NonZeroU32;

#[cfg(feature = "crc")]
use crc::{Algorithm, Crc};
#[cfg(feature = "defmt")]
use defmt::Format;

#[cfg(feature = "defmt")]
use defmt::warn;
#[cfg(feature = "log")]
use log::warn;
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

/// Si7020 device driver (async)
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct Si7020<I2C, Delay> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) config: Config,
    pub(crate) lifecycle: Lifecycle,
}

/// Driver configuration
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Upper bound on a single bus transaction, in milliseconds. `None` waits forever.
    ///
    /// Only the async driver can enforce it.
    pub timeout_ms: Option<NonZeroU32>,
    /// Refuse measurements and register access until the identity probe has succeeded
    pub require_ready: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            require_ready: true,
        }
    }
}
impl Config {
    /// Bound every bus transaction by `timeout_ms`. `0` means no timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = NonZeroU32::new(timeout_ms);
        self
    }

    /// Allow measurements before the identity probe has succeeded
    pub fn permissive(mut self) -> Self {
        self.require_ready = false;
        self
    }
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// I²C communication error
    I2c(E),
    /// The identity probe read an id other than the Si7020's
    IdentityMismatch(u8),
    /// The identity probe has not succeeded yet
    NotReady,
    /// A bus transaction did not complete within the configured timeout
    Timeout,
    /// Invalid input data provided
    InvalidInputData,
    /// No room left to register another listener
    ListenersFull,
    /// Failure of a checksum from the device was detected
    #[cfg(feature = "crc")]
    CrcMismatch,
}
impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {e:?}"),
            Error::IdentityMismatch(id) => write!(f, "{}", ProbeFailure::IdentityMismatch(*id)),
            Error::NotReady => write!(f, "Si7020 has not completed its identity probe"),
            Error::Timeout => write!(f, "I2C transaction timed out"),
            Error::InvalidInputData => write!(f, "Invalid input data"),
            Error::ListenersFull => write!(f, "Listener capacity exhausted"),
            #[cfg(feature = "crc")]
            Error::CrcMismatch => write!(f, "Checksum mismatch"),
        }
    }
}

/// Why the identity probe failed, as delivered to error listeners
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeFailure {
    /// The chip answered with an unexpected id byte
    IdentityMismatch(u8),
    /// The identity read failed on the bus
    Transport,
    /// The identity read did not complete within the configured timeout
    Timeout,
}
impl<E> From<&Error<E>> for ProbeFailure {
    fn from(error: &Error<E>) -> Self {
        match error {
            Error::IdentityMismatch(id) => ProbeFailure::IdentityMismatch(*id),
            Error::Timeout => ProbeFailure::Timeout,
            _ => ProbeFailure::Transport,
        }
    }
}
impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::IdentityMismatch(id) => write!(
                f,
                "Cannot connect to Si7020. Are you sure it's not a Si7005? Got id: {id:#04x}"
            ),
            ProbeFailure::Transport => write!(f, "Cannot connect to Si7020: I2C error during identity probe"),
            ProbeFailure::Timeout => write!(f, "Cannot connect to Si7020: identity probe timed out"),
        }
    }
}

/// Readiness of a driver instance. Only ever moves forward.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DriverState {
    /// Constructed, identity not probed yet
    #[default]
    Uninitialized,
    /// Identity probe in progress
    Probing,
    /// Identity confirmed; measurements are trusted
    Ready,
    /// Identity probe failed; the driver will never become ready
    Failed(ProbeFailure),
}

/// Unit of a temperature reading
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TemperatureUnit {
    /// degrees centigrade
    #[default]
    Celsius,
    /// degrees fahrenheit
    Fahrenheit,
}
impl From<char> for TemperatureUnit {
    /// `'f'` selects Fahrenheit, anything else Celsius
    fn from(unit: char) -> Self {
        match unit {
            'f' => TemperatureUnit::Fahrenheit,
            _ => TemperatureUnit::Celsius,
        }
    }
}
impl TemperatureUnit {
    pub(crate) fn convert(self, raw: u16) -> f64 {
        match self {
            TemperatureUnit::Celsius => raw_temp_to_centigrade(raw),
            TemperatureUnit::Fahrenheit => raw_temp_to_fahrenheit(raw),
        }
    }
}

/// Relative humidity and the temperature taken during the same conversion
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// relative humidity in percent
    pub humidity_percent: f64,
    /// degrees centigrade
    pub centigrade: f64,
}
impl Reading {
    pub(crate) fn from_raw(raw_humidity: u16, raw_temperature: u16) -> Self {
        Self {
            humidity_percent: raw_rel_humid_to_percent(raw_humidity),
            centigrade: raw_temp_to_centigrade(raw_temperature),
        }
    }

    /// Get temperature in Fahrenheit
    pub fn fahrenheit(&self) -> f64 {
        centigrade_to_fahrenheit(self.centigrade)
    }
}

/// User register 1
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UserRegister(pub u8);
impl UserRegister {
    /// Get the raw register value
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// On-die heater is enabled
    pub fn heater_enabled(&self) -> bool {
        self.0 & HTRE != 0
    }

    /// Same register with only the heater bit changed
    pub fn with_heater(self, enable: bool) -> Self {
        Self(heater_register(self.0, enable))
    }
}
impl fmt::Display for UserRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserRegister {{ 0x{:02x}; ", self.0)?;
        if self.heater_enabled() {
            write!(f, "heater_enabled ")?;
        }
        write!(f, "}}")
    }
}

/// 64-bit electronic serial number
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SerialNumber(pub u64);
impl SerialNumber {
    /// Device identification byte (SNB_3), `0x14` for the Si7020
    pub fn device_id(&self) -> u8 {
        (self.0 >> 24) as u8
    }
}
impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Firmware revision of the device
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FirmwareRevision {
    /// Firmware version 1.0
    V1_0,
    /// Firmware version 2.0
    V2_0,
    /// Other
    Other(u8),
}
impl From<u8> for FirmwareRevision {
    fn from(raw: u8) -> Self {
        match raw {
            0xFF => FirmwareRevision::V1_0,
            0x20 => FirmwareRevision::V2_0,
            _ => FirmwareRevision::Other(raw),
        }
    }
}
impl fmt::Display for FirmwareRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareRevision::V1_0 => write!(f, "1.0"),
            FirmwareRevision::V2_0 => write!(f, "2.0"),
            FirmwareRevision::Other(raw) => write!(f, "Unknown (0x{raw:02X})"),
        }
    }
}

#[cfg(feature = "crc")]
const CRC_ALGORITHM: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xA2,
    residue: 0x00,
};

#[cfg(feature = "crc")]
const CRC: Crc<u8> = Crc::<u8>::new(&CRC_ALGORITHM);

/// Check a measurement read (MSB, LSB, checksum) and assemble its word
pub(crate) fn decode_measurement<E>(buf: &[u8; MEASUREMENT_LEN]) -> Result<u16, Error<E>> {
    #[cfg(feature = "crc")]
    {
        let crc_expect = CRC.checksum(&buf[..2]);
        if buf[2] != crc_expect {
            warn!("si7020: crc mismatch: msb={:#x} lsb={:#x} crc={:#x} expected={:#x}", buf[0], buf[1], buf[2], crc_expect);
            return Err(Error::CrcMismatch);
        }
    }
    Ok(merge_bytes(buf[0], buf[1]))
}

/// Check both electronic ID reads and assemble the serial number.
///
/// The first read interleaves SNA_3..SNA_0 with a checksum after every byte, the second carries
/// SNB_3, SNB_2, checksum, SNB_1, SNB_0, checksum. Each checksum covers all id bytes of its read
/// received so far.
pub(crate) fn decode_serial_number<E>(
    high: &[u8; ID_HIGH_LEN],
    low: &[u8; ID_LEN],
) -> Result<SerialNumber, Error<E>> {
    let sna = [high[0], high[2], high[4], high[6]];
    let snb = [low[0], low[1], low[3], low[4]];
    #[cfg(feature = "crc")]
    {
        let checks = [
            (&sna[..1], high[1]),
            (&sna[..2], high[3]),
            (&sna[..3], high[5]),
            (&sna[..], high[7]),
            (&snb[..2], low[2]),
            (&snb[..], low[5]),
        ];
        for (bytes, crc) in checks {
            let crc_expect = CRC.checksum(bytes);
            if crc != crc_expect {
                warn!("si7020: id crc mismatch: crc={:#x} expected={:#x}", crc, crc_expect);
                return Err(Error::CrcMismatch);
            }
        }
    }
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&sna);
    bytes[4..].copy_from_slice(&snb);
    Ok(SerialNumber(u64::from_be_bytes(bytes)))
}

/// Check the id byte of the identity probe
pub(crate) fn check_identity<E>(buf: &[u8; ID_LEN]) -> Result<(), Error<E>> {
    if buf[0] == EXPECTED_ID {
        Ok(())
    } else {
        warn!("si7020: unexpected id {:#x}", buf[0]);
        Err(Error::IdentityMismatch(buf[0]))
    }
}
