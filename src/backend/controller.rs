//! Acquisition controller
//!
//! Owns the serial link and the reader thread and drives the connection
//! state machine:
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected --disconnect--> Disconnected
//!                               |                  |
//!                               +--open failed-----+--reader stopped--> Error
//!                               v
//!                          Disconnected
//! ```
//!
//! Stopping is cooperative: the running flag is cleared, the reader thread is
//! joined, and only then is the link dropped. The reader's read timeout
//! bounds how long the join can take.

use crate::backend::line_reader::spawn_reader;
use crate::backend::link::{PortOpener, SerialLink, SystemPortOpener};
use crate::backend::ReaderMessage;
use crate::config::SerialConfig;
use crate::error::{FreqMeterError, Result, ResultExt};
use crate::types::{ConnectionStatus, SamplingSpeed};
use crossbeam_channel::{unbounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Serial connection and reader thread owner
pub struct AcquisitionController<O: PortOpener = SystemPortOpener> {
    opener: O,
    config: Option<SerialConfig>,
    status: ConnectionStatus,
    link: Option<Box<dyn SerialLink>>,
    reader: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    rx: Receiver<ReaderMessage>,
    speed: Option<SamplingSpeed>,
    last_error: Option<String>,
}

impl AcquisitionController<SystemPortOpener> {
    /// Controller using the system's serial ports
    pub fn system() -> Self {
        Self::new(SystemPortOpener)
    }
}

impl<O: PortOpener> AcquisitionController<O> {
    pub fn new(opener: O) -> Self {
        let (_, rx) = unbounded();
        Self {
            opener,
            config: None,
            status: ConnectionStatus::Disconnected,
            link: None,
            reader: None,
            running: Arc::new(AtomicBool::new(false)),
            rx,
            speed: None,
            last_error: None,
        }
    }

    /// Supply connection settings
    ///
    /// Refused while connected. The settings are stored even when they fail
    /// validation so the panel can show them; connecting stays unavailable
    /// until a valid config is supplied.
    pub fn configure(&mut self, config: SerialConfig) -> Result<()> {
        if self.status.is_open() {
            return Err(FreqMeterError::Connection(
                "cannot change serial settings while connected".to_string(),
            ));
        }
        let result = config.validate();
        tracing::debug!("Serial settings updated: {:?}", config);
        self.config = Some(config);
        result
    }

    /// Current settings, if any were supplied
    pub fn config(&self) -> Option<&SerialConfig> {
        self.config.as_ref()
    }

    /// Whether [`connect`](Self::connect) may be attempted
    pub fn can_connect(&self) -> bool {
        !self.status.is_open() && self.config.as_ref().is_some_and(SerialConfig::is_usable)
    }

    /// Open the port and start the reader
    ///
    /// On failure the controller is back in `Disconnected` and the error is
    /// returned for the UI to report.
    pub fn connect(&mut self) -> Result<()> {
        if self.status.is_open() {
            return Err(FreqMeterError::Connection("already connected".to_string()));
        }
        let config = self
            .config
            .clone()
            .ok_or_else(|| FreqMeterError::Config("no serial settings supplied".to_string()))?;
        config.validate()?;

        self.status = ConnectionStatus::Connecting;
        tracing::info!("Connecting to {} at {} baud", config.port, config.baud);

        match self.start(&config) {
            Ok(()) => {
                self.status = ConnectionStatus::Connected;
                self.last_error = None;
                tracing::info!("Connected to {}", config.port);
                Ok(())
            }
            Err(e) => {
                self.status = ConnectionStatus::Disconnected;
                tracing::warn!("Failed to connect to {}: {}", config.port, e);
                Err(e)
            }
        }
    }

    fn start(&mut self, config: &SerialConfig) -> Result<()> {
        let link = self
            .opener
            .open(config)
            .with_context(|| format!("Failed to open {}", config.port))?;
        let reader = link.reader().context("Failed to clone port for reading")?;

        let (tx, rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_reader(reader, tx, running.clone())
            .map_err(FreqMeterError::from)
            .context("Failed to spawn reader thread")?;

        self.link = Some(link);
        self.reader = Some(handle);
        self.running = running;
        self.rx = rx;
        Ok(())
    }

    /// Stop the reader, wait for it, then close the port
    pub fn disconnect(&mut self) {
        if self.link.is_none() && self.reader.is_none() {
            return;
        }
        self.shutdown();
        // Samples still queued belong to the closed connection
        let (_, rx) = unbounded();
        self.rx = rx;
        self.status = ConnectionStatus::Disconnected;
        tracing::info!("Disconnected");
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                tracing::error!("Reader thread panicked");
            }
        }
        // Port handle released only after the reader has exited
        self.link = None;
        self.speed = None;
    }

    /// Ask the counter for fast or slow sampling
    pub fn set_speed(&mut self, speed: SamplingSpeed) -> Result<()> {
        let link = match (self.status, self.link.as_mut()) {
            (ConnectionStatus::Connected, Some(link)) => link,
            _ => return Err(FreqMeterError::Connection("not connected".to_string())),
        };
        link.write_command(speed.command())
            .with_context(|| format!("Failed to send {:?} speed command", speed))?;
        tracing::info!("Sampling speed set to {:?}", speed);
        self.speed = Some(speed);
        Ok(())
    }

    /// Take a queued reader message without blocking
    pub fn try_recv(&mut self) -> Option<ReaderMessage> {
        let msg = self.rx.try_recv().ok()?;
        if let ReaderMessage::Stopped { ref reason } = msg {
            self.reader_stopped(reason);
        }
        Some(msg)
    }

    /// Take all queued reader messages, in arrival order
    pub fn drain(&mut self) -> Vec<ReaderMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn reader_stopped(&mut self, reason: &str) {
        if !self.status.is_open() {
            return;
        }
        tracing::warn!("Connection lost: {}", reason);
        self.shutdown();
        self.status = ConnectionStatus::Error;
        self.last_error = Some(reason.to_string());
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_open()
    }

    /// Last speed successfully requested on this connection
    pub fn speed(&self) -> Option<SamplingSpeed> {
        self.speed
    }

    /// Why the last connection ended unexpectedly
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<String> {
        self.link.as_ref().map(|l| l.port_name())
    }
}

impl<O: PortOpener> Drop for AcquisitionController<O> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<O: PortOpener> std::fmt::Debug for AcquisitionController<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionController")
            .field("status", &self.status)
            .field("config", &self.config)
            .field("reader_running", &self.reader.is_some())
            .finish()
    }
}
