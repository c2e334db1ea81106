//! # freqmeter-rs: Serial Frequency Meter
//!
//! A desktop frequency meter for a microcontroller-based counter that
//! streams one reading per line over a serial port. Readings are scaled by
//! an optional prescaler multiplier, optionally filtered, autoranged to
//! Hz/kHz/MHz with the matching period, and plotted on a rolling graph.
//!
//! ## Architecture
//!
//! - **Backend**: opens the port and runs a line reader thread that parses
//!   each line into a sample (`-1.0` for anything malformed)
//! - **Display controller**: turns samples into the displayed reading,
//!   honouring hold, autorange, filter and multiplier
//! - **Scripting**: Rhai filter scripts installed into a filter slot
//! - **Frontend**: eframe/egui window with egui_plot for the graph
//! - **Communication**: a crossbeam channel from the reader to the UI thread
//!
//! ## Configuration
//!
//! An optional read-only `config.toml` is loaded from the platform config
//! directory under `freqmeter-rs` (or from `--config <path>`):
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud = 57600
//!
//! [display]
//! autorange = true
//! multiplier = 8
//!
//! [filter]
//! script = "smooth(value, 0.8)"
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use freqmeter_rs::{app::MeterSession, config::AppConfig};
//!
//! let mut session = MeterSession::system(&AppConfig::load_or_default(None));
//! session.connect();
//! loop {
//!     session.pump();
//!     println!("{} {}", session.display.displayed().value_text,
//!         session.display.displayed().unit);
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod filter;
pub mod frontend;
pub mod graph;
pub mod scripting;
pub mod types;

// Re-export commonly used types
pub use app::MeterSession;
pub use backend::{AcquisitionController, ReaderMessage};
pub use config::{AppConfig, SerialConfig};
pub use display::{DisplayController, DisplayReading, DisplayState, SinkOutcome};
pub use error::{FreqMeterError, Result};
pub use filter::{FilterSlot, SampleFilter};
pub use frontend::FreqMeterApp;
pub use graph::{FrequencyGraph, GraphSink, RollingBuffer};
pub use types::{Sample, FAILURE_SAMPLE};
