//! Line reader thread
//!
//! Reads newline-terminated ASCII lines from the port and forwards one
//! sample per line. Anything that does not parse as a float becomes the
//! failure sentinel, so a garbled line never stops acquisition.
//!
//! The read call is bounded by the port timeout. A timeout with nothing
//! received is reported as the sentinel (the counter sends at least one
//! line per second in slow mode). A timeout in the middle of a line keeps
//! the bytes read so far.

use crate::backend::ReaderMessage;
use crate::types::{Sample, FAILURE_SAMPLE};
use crossbeam_channel::Sender;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Parse one received line into a sample
///
/// The line may include its terminator. Surrounding whitespace (including
/// `\r`) is ignored. Non-ASCII, empty and non-numeric lines yield
/// [`FAILURE_SAMPLE`].
pub fn parse_sample(line: &[u8]) -> Sample {
    if !line.is_ascii() {
        return FAILURE_SAMPLE;
    }
    std::str::from_utf8(line)
        .ok()
        .and_then(|text| text.trim().parse::<f64>().ok())
        .unwrap_or(FAILURE_SAMPLE)
}

/// Outcome of one blocking read
enum ReadEvent {
    /// A complete line is in the pending buffer
    Line,
    /// Timed out with no bytes received
    Idle,
    /// Timed out mid-line, or hit end of stream after a partial line
    Partial,
    /// End of stream with nothing pending
    Eof,
}

/// Reader loop forwarding samples to the UI
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    tx: Sender<ReaderMessage>,
    running: Arc<AtomicBool>,
    lines: u64,
}

impl<R: Read> LineReader<R> {
    /// Create a reader; it runs until `running` is cleared
    pub fn new(reader: R, tx: Sender<ReaderMessage>, running: Arc<AtomicBool>) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::with_capacity(32),
            tx,
            running,
            lines: 0,
        }
    }

    /// Run until stopped, the stream ends or the receiver goes away
    pub fn run(mut self) {
        tracing::info!("Line reader started");

        let reason = loop {
            if !self.running.load(Ordering::SeqCst) {
                break None;
            }

            let sample = match self.read_event() {
                Ok(ReadEvent::Line) => self.take_line(),
                Ok(ReadEvent::Idle) => {
                    tracing::trace!("Read timed out with no data");
                    FAILURE_SAMPLE
                }
                Ok(ReadEvent::Partial) => continue,
                Ok(ReadEvent::Eof) => break Some("end of stream".to_string()),
                Err(e) => {
                    tracing::warn!("Serial read failed: {}", e);
                    break Some(e.to_string());
                }
            };

            if !self.emit(ReaderMessage::Sample(sample)) {
                break None;
            }
        };

        if let Some(reason) = reason {
            self.running.store(false, Ordering::SeqCst);
            let _ = self.tx.send(ReaderMessage::Stopped {
                reason: reason.clone(),
            });
            tracing::info!("Line reader stopped after {} lines: {}", self.lines, reason);
        } else {
            tracing::info!("Line reader stopped after {} lines", self.lines);
        }
    }

    fn read_event(&mut self) -> io::Result<ReadEvent> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(ReadEvent::Eof),
            // End of stream with an unterminated line: flush it as a line
            Ok(0) => Ok(ReadEvent::Line),
            Ok(_) if self.pending.ends_with(b"\n") => Ok(ReadEvent::Line),
            Ok(_) => Ok(ReadEvent::Partial),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                if self.pending.is_empty() {
                    Ok(ReadEvent::Idle)
                } else {
                    Ok(ReadEvent::Partial)
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(ReadEvent::Partial),
            Err(e) => Err(e),
        }
    }

    fn take_line(&mut self) -> Sample {
        let sample = parse_sample(&self.pending);
        if sample == FAILURE_SAMPLE {
            tracing::debug!("Malformed line: {:?}", String::from_utf8_lossy(&self.pending));
        }
        self.pending.clear();
        self.lines += 1;
        sample
    }

    fn emit(&self, msg: ReaderMessage) -> bool {
        if self.tx.send(msg).is_err() {
            tracing::debug!("Sample receiver dropped, stopping reader");
            return false;
        }
        true
    }
}

/// Spawn a [`LineReader`] on a named thread
pub fn spawn_reader<R>(
    reader: R,
    tx: Sender<ReaderMessage>,
    running: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || LineReader::new(reader, tx, running).run())
}
