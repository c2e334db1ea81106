//! Application session
//!
//! [`MeterSession`] ties the acquisition controller to the display
//! controller, the filter slot and the graph. The egui frontend calls
//! [`MeterSession::pump`] once per frame and otherwise only flips toggles
//! and forwards button presses; everything here works without a window.

use crate::backend::{AcquisitionController, PortOpener, ReaderMessage, SystemPortOpener};
use crate::config::{AppConfig, SerialConfig};
use crate::display::{DisplayController, DisplayState, SinkOutcome};
use crate::filter::FilterSlot;
use crate::graph::FrequencyGraph;
use crate::types::{ConnectionStatus, SamplingSpeed};

/// Name under which the startup filter script is installed
pub const CONFIG_FILTER_NAME: &str = "config";

/// Everything the UI shows and controls
pub struct MeterSession<O: PortOpener = SystemPortOpener> {
    pub acquisition: AcquisitionController<O>,
    pub display: DisplayController,
    pub state: DisplayState,
    pub filter: FilterSlot,
    pub graph: FrequencyGraph,
    /// Speed selected in the UI, sent on change and after connecting
    pub speed: SamplingSpeed,
    notice: Option<String>,
}

impl MeterSession<SystemPortOpener> {
    /// Session on the system's serial ports
    pub fn system(config: &AppConfig) -> Self {
        Self::new(SystemPortOpener, config)
    }
}

impl<O: PortOpener> MeterSession<O> {
    /// Build a session from the loaded configuration
    ///
    /// Invalid serial settings or a broken filter script are not fatal: they
    /// are logged and surfaced once through [`take_notice`](Self::take_notice).
    pub fn new(opener: O, config: &AppConfig) -> Self {
        let mut session = Self {
            acquisition: AcquisitionController::new(opener),
            display: DisplayController::new(),
            state: DisplayState::from_config(&config.display),
            filter: FilterSlot::new(),
            graph: FrequencyGraph::new(config.graph.clone()),
            speed: config.display.speed,
            notice: None,
        };

        if !config.serial.port.trim().is_empty() {
            if let Err(e) = session.acquisition.configure(config.serial.clone()) {
                tracing::warn!("Serial settings from config ignored: {}", e);
            }
        }

        match config.filter.source() {
            Ok(Some(source)) => {
                if let Err(e) = session.filter.install_script(CONFIG_FILTER_NAME, &source) {
                    session.notice = Some(e.to_string());
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("{}", e);
                session.notice = Some(e.to_string());
            }
        }

        session
    }

    /// Process all samples queued by the reader
    ///
    /// Returns the number of messages handled.
    pub fn pump(&mut self) -> usize {
        let messages = self.acquisition.drain();
        let count = messages.len();
        for msg in messages {
            match msg {
                ReaderMessage::Sample(sample) => {
                    let outcome =
                        self.display
                            .process(sample, &self.state, &mut self.filter, &mut self.graph);
                    if let SinkOutcome::Updated { effective } = outcome {
                        tracing::trace!("Displayed {} Hz", effective);
                    }
                }
                ReaderMessage::Stopped { reason } => {
                    self.notice = Some(format!("Connection lost: {}", reason));
                }
            }
        }
        self.state.connection_open = self.acquisition.is_connected();
        count
    }

    /// Replace the serial settings (only while disconnected)
    pub fn apply_serial_config(&mut self, config: SerialConfig) {
        if let Err(e) = self.acquisition.configure(config) {
            self.notice = Some(e.to_string());
        }
    }

    /// Open the port; failures end up in the notice
    pub fn connect(&mut self) {
        if let Err(e) = self.acquisition.connect() {
            self.notice = Some(e.to_string());
            return;
        }
        self.state.connection_open = true;
        self.display.reset_link();
        self.filter.reset();
        self.graph.clear();

        // The counter starts in slow mode
        if self.speed == SamplingSpeed::Fast {
            self.set_speed(SamplingSpeed::Fast);
        }
    }

    pub fn disconnect(&mut self) {
        self.acquisition.disconnect();
        self.state.connection_open = false;
    }

    /// Select a sampling speed, sending it when connected
    pub fn set_speed(&mut self, speed: SamplingSpeed) {
        self.speed = speed;
        if self.acquisition.is_connected() {
            if let Err(e) = self.acquisition.set_speed(speed) {
                self.notice = Some(e.to_string());
            }
        }
    }

    /// Install a filter script from the editor
    pub fn install_filter(&mut self, name: &str, source: &str) -> bool {
        match self.filter.install_script(name, source) {
            Ok(()) => true,
            Err(e) => {
                self.notice = Some(e.to_string());
                false
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.acquisition.status()
    }

    /// Take the pending user-facing error, if any
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Peek at the pending user-facing error
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}
