//! Serial acquisition backend
//!
//! The backend owns the serial port and a reader thread. The reader turns
//! each line sent by the counter into a [`Sample`] and pushes it to the UI
//! over a crossbeam channel; the UI drains the channel once per frame.
//!
//! # Architecture
//!
//! - [`AcquisitionController`] - Connection state machine, owns the port and
//!   the reader thread, sends speed commands
//! - [`LineReader`] - Reader loop run on its own thread
//! - [`SerialLink`] / [`PortOpener`] - Port abstraction so the controller
//!   can be driven without hardware
//! - [`ReaderMessage`] - Messages sent from the reader to the UI
//!
//! # Example
//!
//! ```ignore
//! use freqmeter_rs::backend::{AcquisitionController, ReaderMessage};
//! use freqmeter_rs::config::SerialConfig;
//!
//! let mut controller = AcquisitionController::system();
//! controller.configure(SerialConfig::new("/dev/ttyUSB0", 57600))?;
//! controller.connect()?;
//!
//! for msg in controller.drain() {
//!     if let ReaderMessage::Sample(hz) = msg {
//!         println!("{hz} Hz");
//!     }
//! }
//! ```

pub mod controller;
pub mod line_reader;
pub mod link;

pub use controller::AcquisitionController;
pub use line_reader::{parse_sample, spawn_reader, LineReader};
pub use link::{available_ports, PortEntry, PortOpener, SerialLink, SerialPortLink, SystemPortOpener};

use crate::types::Sample;

/// Message sent from the reader thread to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderMessage {
    /// A parsed sample, or the failure sentinel
    Sample(Sample),
    /// The reader exited on its own (end of stream or I/O error)
    Stopped {
        /// Why the reader stopped
        reason: String,
    },
}
