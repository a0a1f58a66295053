//! Core domain types

use std::fmt;

use super::error::{BridgeError, BridgeResult};

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    /// Parse the literal bit count used at the C boundary (5-8)
    pub fn from_count(bits: i32) -> BridgeResult<Self> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(BridgeError::InvalidConfig(format!(
                "data bits must be 5-8, got {other}"
            ))),
        }
    }

    pub fn count(&self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Parse a line-control parity code: 0=none 1=odd 2=even 3=mark 4=space
    pub fn from_code(code: i32) -> BridgeResult<Self> {
        match code {
            0 => Ok(Parity::None),
            1 => Ok(Parity::Odd),
            2 => Ok(Parity::Even),
            3 => Ok(Parity::Mark),
            4 => Ok(Parity::Space),
            other => Err(BridgeError::InvalidConfig(format!(
                "unknown parity code {other}"
            ))),
        }
    }

    /// Single-letter form used in "8N1"-style notation
    pub fn letter(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    /// Parse a line-control stop-bits code: 0=1 1=1.5 2=2
    pub fn from_code(code: i32) -> BridgeResult<Self> {
        match code {
            0 => Ok(StopBits::One),
            1 => Ok(StopBits::OnePointFive),
            2 => Ok(StopBits::Two),
            other => Err(BridgeError::InvalidConfig(format!(
                "unknown stop bits code {other}"
            ))),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopBits::One => f.write_str("1"),
            StopBits::OnePointFive => f.write_str("1.5"),
            StopBits::Two => f.write_str("2"),
        }
    }
}

/// Line parameters applied to a port when it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl LineSettings {
    pub fn new(baud_rate: u32, data_bits: DataBits, parity: Parity, stop_bits: StopBits) -> Self {
        Self {
            baud_rate,
            data_bits,
            parity,
            stop_bits,
        }
    }

    /// Build settings from the raw integers passed across the C boundary.
    pub fn from_raw(baud_rate: i32, data_bits: i32, parity: i32, stop_bits: i32) -> BridgeResult<Self> {
        if baud_rate <= 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "baud rate must be positive, got {baud_rate}"
            )));
        }
        Ok(Self {
            baud_rate: baud_rate as u32,
            data_bits: DataBits::from_count(data_bits)?,
            parity: Parity::from_code(parity)?,
            stop_bits: StopBits::from_code(stop_bits)?,
        })
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.baud_rate == 0 {
            return Err(BridgeError::InvalidConfig("baud rate must be positive".into()));
        }
        Ok(())
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::new(9600, DataBits::Eight, Parity::None, StopBits::One)
    }
}

/// Renders as e.g. `115200 8N1`
impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits.count(),
            self.parity.letter(),
            self.stop_bits
        )
    }
}

/// Information about a serial port found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub port_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_accepts_reference_codes() {
        let settings = LineSettings::from_raw(115200, 7, 2, 2).unwrap();
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.data_bits, DataBits::Seven);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::Two);
    }

    #[test]
    fn from_raw_rejects_non_positive_baud() {
        assert!(matches!(
            LineSettings::from_raw(0, 8, 0, 0),
            Err(BridgeError::InvalidConfig(_))
        ));
        assert!(LineSettings::from_raw(-9600, 8, 0, 0).is_err());
    }

    #[test]
    fn from_raw_rejects_out_of_range_codes() {
        assert!(LineSettings::from_raw(9600, 4, 0, 0).is_err());
        assert!(LineSettings::from_raw(9600, 9, 0, 0).is_err());
        assert!(LineSettings::from_raw(9600, 8, 5, 0).is_err());
        assert!(LineSettings::from_raw(9600, 8, 0, 3).is_err());
    }

    #[test]
    fn display_uses_compact_notation() {
        assert_eq!(LineSettings::default().to_string(), "9600 8N1");
        let odd = LineSettings::new(4800, DataBits::Five, Parity::Mark, StopBits::OnePointFive);
        assert_eq!(odd.to_string(), "4800 5M1.5");
    }
}
