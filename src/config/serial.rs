//! Serial connection settings
//!
//! [`SerialConfig`] is produced by the settings panel (or the config file)
//! and consumed once when the port is opened. Only `enabled`, `port`,
//! `baud` and the read timeout matter to the acquisition loop; the line
//! framing fields are passed straight to the driver.

use crate::error::{FreqMeterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud rates offered by the settings panel
pub const BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

/// Default baud rate of the counter firmware
pub const DEFAULT_BAUD: u32 = 57600;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Parity {
    /// All modes, for the settings panel
    pub const ALL: [Parity; 3] = [Parity::None, Parity::Even, Parity::Odd];

    /// Letter used in framing notation such as `8N1`
    pub fn short_name(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "None"),
            Parity::Even => write!(f, "Even"),
            Parity::Odd => write!(f, "Odd"),
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

/// Serial connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Whether the settings were confirmed by the user
    pub enabled: bool,
    /// Port identifier (`/dev/ttyUSB0`, `COM3`, ...)
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Data bits per character (5 to 8)
    pub data_bits: u8,
    /// Parity checking
    pub parity: Parity,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// RTS/CTS hardware flow control
    pub cts: bool,
    /// Assert DTR after opening
    pub dtr: bool,
    /// XON/XOFF software flow control
    pub xon: bool,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: String::new(),
            baud: DEFAULT_BAUD,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            cts: false,
            dtr: false,
            xon: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    /// Create a config for a port with default framing
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            ..Self::default()
        }
    }

    /// Whether this config may be used to open a port
    pub fn is_usable(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the config before the port is opened
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Err(FreqMeterError::Config(
                "serial settings were not confirmed".to_string(),
            ));
        }
        if self.port.trim().is_empty() {
            return Err(FreqMeterError::Config(
                "port identifier is empty".to_string(),
            ));
        }
        if self.baud == 0 {
            return Err(FreqMeterError::Config("baud rate must be non-zero".to_string()));
        }
        self.driver_data_bits()?;
        self.driver_stop_bits()?;
        if self.timeout_ms == 0 {
            return Err(FreqMeterError::Config(
                "read timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Read timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Data bits in driver form
    pub fn driver_data_bits(&self) -> Result<serialport::DataBits> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            n => Err(FreqMeterError::Config(format!(
                "unsupported data bits: {n} (expected 5 to 8)"
            ))),
        }
    }

    /// Stop bits in driver form
    pub fn driver_stop_bits(&self) -> Result<serialport::StopBits> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            n => Err(FreqMeterError::Config(format!(
                "unsupported stop bits: {n} (expected 1 or 2)"
            ))),
        }
    }

    /// Flow control in driver form; hardware wins when both are set
    pub fn driver_flow_control(&self) -> serialport::FlowControl {
        if self.cts {
            serialport::FlowControl::Hardware
        } else if self.xon {
            serialport::FlowControl::Software
        } else {
            serialport::FlowControl::None
        }
    }

    /// Build a driver port builder from this config
    pub fn builder(&self) -> Result<serialport::SerialPortBuilder> {
        self.validate()?;
        Ok(serialport::new(self.port.trim(), self.baud)
            .data_bits(self.driver_data_bits()?)
            .parity(self.parity.into())
            .stop_bits(self.driver_stop_bits()?)
            .flow_control(self.driver_flow_control())
            .timeout(self.timeout()))
    }
}
