//! Line assembly for the serial link.
//!
//! Bytes arrive from the UART in arbitrary chunks. The assembler collects
//! them into complete lines:
//! - `\n` terminates a line
//! - `\r` is dropped (so `\r\n` terminals work)
//! - empty lines are skipped
//! - a line longer than [`MAX_LINE_LEN`] is discarded up to the next `\n`

use heapless::{String, Vec};

/// Maximum accepted line length in bytes (excluding terminator)
pub const MAX_LINE_LEN: usize = 128;

/// A complete received line
pub type Line = String<MAX_LINE_LEN>;

/// Errors that can occur while assembling lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded the maximum length and was dropped
    Overflow,
    /// Line was not valid UTF-8
    InvalidUtf8,
}

/// Assembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Collecting bytes of the current line
    Collecting,
    /// Dropping bytes until the next terminator after an overflow
    Discarding,
}

/// State machine turning a byte stream into lines
#[derive(Debug, Clone)]
pub struct LineAssembler {
    state: State,
    buffer: Vec<u8, MAX_LINE_LEN>,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    /// Create a new assembler
    pub const fn new() -> Self {
        Self {
            state: State::Collecting,
            buffer: Vec::new(),
        }
    }

    /// Reset the assembler, dropping any partial line
    pub fn reset(&mut self) {
        self.state = State::Collecting;
        self.buffer.clear();
    }

    /// Number of bytes buffered for the current line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a non-empty line.
    /// An overflow is reported once, when the terminator of the dropped line
    /// arrives, so the caller can acknowledge it in order.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        match (self.state, byte) {
            (_, b'\r') => Ok(None),
            (State::Discarding, b'\n') => {
                self.reset();
                Err(LineError::Overflow)
            }
            (State::Discarding, _) => Ok(None),
            (State::Collecting, b'\n') => {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let result = core::str::from_utf8(&self.buffer)
                    .map_err(|_| LineError::InvalidUtf8)
                    .map(|text| {
                        let mut line = Line::new();
                        // Cannot fail: buffer and line share the same capacity
                        let _ = line.push_str(text.trim());
                        line
                    });
                self.buffer.clear();
                result.map(|line| if line.is_empty() { None } else { Some(line) })
            }
            (State::Collecting, _) => {
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = State::Discarding;
                }
                Ok(None)
            }
        }
    }

    /// Feed multiple bytes
    ///
    /// Returns the first complete line (or error) found, together with the
    /// number of bytes consumed. Remaining bytes after it are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Result<Option<Line>, LineError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                other => return (i + 1, other),
            }
        }
        (bytes.len(), Ok(None))
    }
}
