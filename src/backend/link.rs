//! Serial port abstraction
//!
//! [`SerialLink`] is the unified interface over an open port: a cloned read
//! handle for the reader thread and a write path for mode commands.
//! [`PortOpener`] creates links from a [`SerialConfig`], so the controller can
//! be exercised with in-memory links.

use crate::config::SerialConfig;
use crate::error::Result;
use std::io::{Read, Write};

/// An open serial connection
#[cfg_attr(test, mockall::automock)]
pub trait SerialLink: Send {
    /// Port identifier for status display
    fn port_name(&self) -> String;

    /// Independent read handle for the reader thread
    ///
    /// The handle must honour the configured read timeout so that the reader
    /// can observe a stop request.
    fn reader(&self) -> Result<Box<dyn Read + Send>>;

    /// Write a command to the device
    fn write_command(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Opens serial links
#[cfg_attr(test, mockall::automock)]
pub trait PortOpener {
    /// Open a link using a validated config
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn SerialLink>>;
}

/// Link backed by a real serial port
pub struct SerialPortLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPortLink {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut port = config.builder()?.open()?;
        if config.dtr {
            port.write_data_terminal_ready(true)?;
        }
        tracing::info!(
            "Opened {} at {} baud ({}{}{})",
            config.port,
            config.baud,
            config.data_bits,
            config.parity.short_name(),
            config.stop_bits
        );
        Ok(Self { port })
    }
}

impl SerialLink for SerialPortLink {
    fn port_name(&self) -> String {
        self.port.name().unwrap_or_default()
    }

    fn reader(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.port.try_clone()?))
    }

    fn write_command(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("port", &self.port.name())
            .finish()
    }
}

/// Opener for the system's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn SerialLink>> {
        Ok(Box::new(SerialPortLink::open(config)?))
    }
}

/// A serial port found on the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Identifier passed to the driver
    pub port_name: String,
    /// Name plus USB manufacturer/product when known
    pub display: String,
}

/// List serial ports, sorted by display name
pub fn available_ports() -> Vec<PortEntry> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            return Vec::new();
        }
    };

    let mut entries: Vec<PortEntry> = ports
        .into_iter()
        .map(|p| {
            let display = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    let parts: Vec<String> =
                        info.manufacturer.into_iter().chain(info.product).collect();
                    if parts.is_empty() {
                        format!("{}: USB Serial", p.port_name)
                    } else {
                        format!("{}: {}", p.port_name, parts.join(" "))
                    }
                }
                serialport::SerialPortType::BluetoothPort => format!("{}: Bluetooth", p.port_name),
                serialport::SerialPortType::PciPort => format!("{}: PCI", p.port_name),
                serialport::SerialPortType::Unknown => p.port_name.clone(),
            };
            PortEntry {
                port_name: p.port_name,
                display,
            }
        })
        .collect();

    entries.sort_by(|a, b| a.display.cmp(&b.display));
    tracing::debug!("Found {} serial ports", entries.len());
    entries
}
