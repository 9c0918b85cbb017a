// Datasheet: https://www.silabs.com/documents/public/data-sheets/Si7020-A20.pdf

/// Fixed I²C address of the Si7020
pub const I2C_ADDRESS: u8 = 0x40;

/// First byte of the second electronic ID access (SNB_3) for an Si7020
pub const EXPECTED_ID: u8 = 0x14;

/// Power-up time, and the time allowed for a conversion to complete, in milliseconds
pub const WAKE_UP_TIME_MS: u32 = 15;

/// Heater enable bit (HTRE) of user register 1
pub const HTRE: u8 = 1 << 2;

/// Heater current field of the heater control register
pub const HEATER_LEVEL_MASK: u8 = 0x0f;

/// Highest heater current setting accepted by the heater control register
pub const HEATER_LEVEL_MAX: u8 = HEATER_LEVEL_MASK;

pub(crate) const HUMIDITY_SLOPE: f64 = 125.0 / 65536.0;
pub(crate) const HUMIDITY_OFFSET: f64 = 6.0;
pub(crate) const TEMPERATURE_SLOPE: f64 = 175.72 / 65536.0;
pub(crate) const TEMPERATURE_OFFSET: f64 = 46.85;

/// Bytes returned by the identity probe (SNB_3, SNB_2, CRC, SNB_1, SNB_0, CRC)
pub(crate) const ID_LEN: usize = 6;
/// Bytes returned by the first electronic ID access (SNA_3..SNA_0, each followed by a CRC)
pub(crate) const ID_HIGH_LEN: usize = 8;
/// Two data bytes and a checksum
pub(crate) const MEASUREMENT_LEN: usize = 3;

/// Commands understood by the Si7020
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Command {
    MeasureRelHumidHold,
    MeasureTempHold,
    ReadTempFromPrevRelHumid,
    SoftReset,
    WriteUserReg,
    ReadUserReg,
    WriteHeaterReg,
    ReadHeaterReg,
    ReadElectronicIdHigh,
    ReadElectronicIdLow,
    ReadFirmwareRevision,
}
impl Command {
    pub(crate) const fn as_bytes(self) -> &'static [u8] {
        match self {
            Command::MeasureRelHumidHold => &[0xE5],
            Command::MeasureTempHold => &[0xE3],
            Command::ReadTempFromPrevRelHumid => &[0xE0],
            Command::SoftReset => &[0xFE],
            Command::WriteUserReg => &[0xE6],
            Command::ReadUserReg => &[0xE7],
            Command::WriteHeaterReg => &[0x51],
            Command::ReadHeaterReg => &[0x11],
            Command::ReadElectronicIdHigh => &[0xFA, 0x0F],
            Command::ReadElectronicIdLow => &[0xFC, 0xC9],
            Command::ReadFirmwareRevision => &[0x84, 0xB8],
        }
    }

    /// Single-byte commands that carry a register value as their second byte
    pub(crate) const fn with_value(self, value: u8) -> [u8; 2] {
        [self.as_bytes()[0], value]
    }
}

/// Merge the two data bytes of a register read, MSB first
pub(crate) fn merge_bytes(msb: u8, lsb: u8) -> u16 {
    (msb as u16) << 8 | lsb as u16
}

/// Convert a raw humidity word to percent relative humidity
pub fn raw_rel_humid_to_percent(raw: u16) -> f64 {
    raw as f64 * HUMIDITY_SLOPE - HUMIDITY_OFFSET
}

/// Convert a raw temperature word to degrees Celsius
pub fn raw_temp_to_centigrade(raw: u16) -> f64 {
    raw as f64 * TEMPERATURE_SLOPE - TEMPERATURE_OFFSET
}

/// Convert a raw temperature word to degrees Fahrenheit
pub fn raw_temp_to_fahrenheit(raw: u16) -> f64 {
    centigrade_to_fahrenheit(raw_temp_to_centigrade(raw))
}

pub(crate) fn centigrade_to_fahrenheit(centigrade: f64) -> f64 {
    centigrade * (9.0 / 5.0) + 32.0
}

/// Apply the heater enable bit to a user register value, leaving every other bit as read
pub fn heater_register(register: u8, enable: bool) -> u8 {
    if enable {
        register | HTRE
    } else {
        register & !HTRE
    }
}

/// Replace the heater current field of a heater control register value
pub(crate) fn heater_level_register(register: u8, level: u8) -> u8 {
    (register & !HEATER_LEVEL_MASK) | (level & HEATER_LEVEL_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn byte_merge() {
        assert_eq!(merge_bytes(0x4E, 0x89), 0x4E89);
        assert_eq!(merge_bytes(0x61, 0xA8), 25000);
    }

    #[rstest]
    #[case(0x0000)]
    #[case(0x4E85)]
    #[case(0x4E89)]
    #[case(0x7C80)]
    #[case(0xFFFF)]
    fn humidity_matches_datasheet_formula(#[case] raw: u16) {
        let expected = raw as f64 * 125.0 / 65536.0 - 6.0;
        assert!((raw_rel_humid_to_percent(raw) - expected).abs() < TOLERANCE);
    }

    #[rstest]
    #[case(0x0000)]
    #[case(0x61A8)]
    #[case(0x683A)]
    #[case(0xFFFF)]
    fn temperature_matches_datasheet_formula(#[case] raw: u16) {
        let celsius = raw as f64 * 175.72 / 65536.0 - 46.85;
        assert!((raw_temp_to_centigrade(raw) - celsius).abs() < TOLERANCE);
        assert!((raw_temp_to_fahrenheit(raw) - (celsius * 9.0 / 5.0 + 32.0)).abs() < TOLERANCE);
    }

    #[test]
    fn datasheet_samples() {
        assert!((raw_rel_humid_to_percent(20105) - 32.347_244_262_695_31).abs() < TOLERANCE);
        assert!((raw_temp_to_centigrade(25000) - 20.181_860_351_562_5).abs() < TOLERANCE);
        assert!((raw_temp_to_fahrenheit(25000) - 68.327_348_632_812_5).abs() < TOLERANCE);
    }

    #[rstest]
    #[case(0b0001_0001, true, 0b0001_0101)]
    #[case(0b0001_0001, false, 0b0001_0001)]
    #[case(0b0011_1110, false, 0b0011_1010)]
    #[case(0b0011_1110, true, 0b0011_1110)]
    #[case(0xFF, false, 0xFB)]
    #[case(0x00, true, 0x04)]
    fn heater_bit_preserves_other_bits(#[case] register: u8, #[case] enable: bool, #[case] expected: u8) {
        assert_eq!(heater_register(register, enable), expected);
    }

    #[test]
    fn heater_bit_over_every_register_value() {
        for register in 0..=u8::MAX {
            assert_eq!(heater_register(register, true), register | 0x04);
            assert_eq!(heater_register(register, false), register & !0x04);
        }
    }

    #[test]
    fn heater_level_keeps_upper_nibble() {
        assert_eq!(heater_level_register(0xA3, 0x0F), 0xAF);
        assert_eq!(heater_level_register(0xAF, 0x00), 0xA0);
    }

    #[test]
    fn command_bytes() {
        assert_eq!(Command::MeasureRelHumidHold.as_bytes(), &[0xE5]);
        assert_eq!(Command::MeasureTempHold.as_bytes(), &[0xE3]);
        assert_eq!(Command::ReadElectronicIdLow.as_bytes(), &[0xFC, 0xC9]);
        assert_eq!(Command::WriteUserReg.with_value(0x15), [0xE6, 0x15]);
    }
}
