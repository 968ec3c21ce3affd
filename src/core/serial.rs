//! Serial line configuration
//!
//! A validated description of a real serial device that can be attached to
//! a virtual network. The network treats it as an opaque record identified by
//! [`SerialConfig::port`]; [`SerialConfig::builder`] materializes it into
//! something the OS can open.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity, StopBits};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Supported baud rates
pub const BAUD_RATES: &[u32] = &[
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115_200,
];

/// Default data bits
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Default stop bits
pub const DEFAULT_STOP_BITS: u8 = 1;

/// Shortest accepted port name
const MIN_PORT_NAME_LEN: usize = 3;

/// Serial configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Port name is empty
    #[error("Port cannot be empty")]
    EmptyPort,

    /// Port name is shorter than any real device path
    #[error("Port name is too short: {0}")]
    PortTooShort(String),

    /// Baud rate is not in [`BAUD_RATES`]
    #[error("Invalid baudrate: {0}")]
    InvalidBaudRate(u32),

    /// Data bits outside 5..=8
    #[error("Invalid bytesize: {0}")]
    InvalidDataBits(u8),

    /// Stop bits other than 1 or 2
    #[error("Invalid stopbits: {0}")]
    InvalidStopBits(u8),

    /// Unknown parity letter
    #[error("Invalid parity: {0}")]
    InvalidParity(String),
}

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    /// No parity
    #[default]
    #[serde(rename = "N")]
    None,
    /// Odd parity
    #[serde(rename = "O")]
    Odd,
    /// Even parity
    #[serde(rename = "E")]
    Even,
}

impl std::str::FromStr for SerialParity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Err(ConfigError::InvalidParity(s.to_string())),
        }
    }
}

impl fmt::Display for SerialParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "N"),
            Self::Odd => write!(f, "O"),
            Self::Even => write!(f, "E"),
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Parity
    #[serde(default)]
    pub parity: SerialParity,
    /// Stop bits (1, 2)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_data_bits() -> u8 {
    DEFAULT_DATA_BITS
}

fn default_stop_bits() -> u8 {
    DEFAULT_STOP_BITS
}

impl SerialConfig {
    /// Create a validated configuration with default line settings
    pub fn new(port: &str) -> Result<Self, ConfigError> {
        let config = Self {
            port: port.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DEFAULT_DATA_BITS,
            parity: SerialParity::None,
            stop_bits: DEFAULT_STOP_BITS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Result<Self, ConfigError> {
        self.baud_rate = baud_rate;
        self.validate()?;
        Ok(self)
    }

    /// Set data bits
    pub fn data_bits(mut self, bits: u8) -> Result<Self, ConfigError> {
        self.data_bits = bits;
        self.validate()?;
        Ok(self)
    }

    /// Set stop bits
    pub fn stop_bits(mut self, bits: u8) -> Result<Self, ConfigError> {
        self.stop_bits = bits;
        self.validate()?;
        Ok(self)
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Check every field against the supported ranges.
    ///
    /// Needed after deserializing, since serde bypasses [`SerialConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.port.chars().count() < MIN_PORT_NAME_LEN {
            return Err(ConfigError::PortTooShort(self.port.clone()));
        }
        if !BAUD_RATES.contains(&self.baud_rate) {
            return Err(ConfigError::InvalidBaudRate(self.baud_rate));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ConfigError::InvalidDataBits(self.data_bits));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(ConfigError::InvalidStopBits(self.stop_bits));
        }
        Ok(())
    }

    /// Materialize into a port builder
    pub fn builder(&self) -> serialport::SerialPortBuilder {
        let data_bits = match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match self.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        serialport::new(&self.port, self.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(Duration::ZERO)
    }

    /// Open the device with this configuration.
    ///
    /// The device is left non-exclusive so other clients can still open it
    /// while it is attached, and after it is detached.
    #[cfg(unix)]
    pub fn open(&self) -> serialport::Result<serialport::TTYPort> {
        let mut port = self.builder().open_native()?;
        port.set_exclusive(false)?;
        Ok(port)
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} baud ({}{}{})",
            self.port, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}
