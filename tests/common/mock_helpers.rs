//! In-memory serial port for driving the controller without hardware

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use freqmeter_rs::backend::{PortOpener, SerialLink};
use freqmeter_rs::config::SerialConfig;
use freqmeter_rs::error::{FreqMeterError, Result};
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long a fake read blocks before timing out
const FAKE_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Device side of the fake port
pub struct FakeDevice {
    tx: Option<Sender<Vec<u8>>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeDevice {
    /// Send one line, appending the terminator
    pub fn send_line(&self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes());
    }

    /// Send raw bytes
    pub fn send_raw(&self, bytes: &[u8]) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// Simulate unplugging the device: readers see end of stream
    pub fn unplug(&mut self) {
        self.tx = None;
    }

    /// Commands written by the host so far
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

/// Read half handed to the reader thread
struct FakeReader {
    rx: Receiver<Vec<u8>>,
    leftover: Vec<u8>,
}

impl Read for FakeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.leftover.is_empty() {
            match self.rx.recv_timeout(FAKE_READ_TIMEOUT) {
                Ok(chunk) => self.leftover = chunk,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = self.leftover.len().min(buf.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(n)
    }
}

struct FakeLink {
    name: String,
    rx: Receiver<Vec<u8>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SerialLink for FakeLink {
    fn port_name(&self) -> String {
        self.name.clone()
    }

    fn reader(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(FakeReader {
            rx: self.rx.clone(),
            leftover: Vec::new(),
        }))
    }

    fn write_command(&mut self, bytes: &[u8]) -> Result<()> {
        self.writes.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

/// Opener handing out links wired to a [`FakeDevice`]
#[derive(Clone)]
pub struct FakeOpener {
    rx: Receiver<Vec<u8>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    failure: Option<io::ErrorKind>,
    opens: Arc<AtomicUsize>,
}

impl FakeOpener {
    /// Number of successful and failed open attempts
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl PortOpener for FakeOpener {
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn SerialLink>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.failure {
            return Err(FreqMeterError::Io(io::Error::new(
                kind,
                format!("cannot open {}", config.port),
            )));
        }
        Ok(Box::new(FakeLink {
            name: config.port.clone(),
            rx: self.rx.clone(),
            writes: self.writes.clone(),
        }))
    }
}

/// Create a connected fake device and opener
pub fn fake_port() -> (FakeDevice, FakeOpener) {
    let (tx, rx) = unbounded();
    let writes = Arc::new(Mutex::new(Vec::new()));
    let device = FakeDevice {
        tx: Some(tx),
        writes: writes.clone(),
    };
    let opener = FakeOpener {
        rx,
        writes,
        failure: None,
        opens: Arc::new(AtomicUsize::new(0)),
    };
    (device, opener)
}

/// Opener whose every attempt fails with `kind`
pub fn failing_opener(kind: io::ErrorKind) -> FakeOpener {
    let (_, opener) = fake_port();
    FakeOpener {
        failure: Some(kind),
        ..opener
    }
}
