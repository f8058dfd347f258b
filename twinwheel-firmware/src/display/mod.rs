//! Text display sink
//!
//! Boards without a panel show pages over the defmt log. Each screen is
//! logged only when its text changes, so a static page does not flood RTT.

use defmt::*;
use heapless::String;

use twinwheel_core::display::TEXT_WIDTH;
use twinwheel_core::traits::{DisplayError, TelemetrySink, MAX_DATA_LINES};

/// Longest logged screen: title plus data lines with separators
const SCREEN_TEXT_LEN: usize = (TEXT_WIDTH + 3) * (MAX_DATA_LINES + 1);

/// [`TelemetrySink`] writing to the defmt log
#[derive(Default)]
pub struct LogDisplay {
    last: String<SCREEN_TEXT_LEN>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, text: String<SCREEN_TEXT_LEN>) {
        if text != self.last {
            info!("[display] {}", text.as_str());
            self.last = text;
        }
    }
}

impl TelemetrySink for LogDisplay {
    fn show(&mut self, title: &str, lines: &[&str]) -> Result<(), DisplayError> {
        if lines.len() > MAX_DATA_LINES {
            return Err(DisplayError::TooManyLines);
        }
        let mut text: String<SCREEN_TEXT_LEN> = String::new();
        text.push_str(title).map_err(|_| DisplayError::Bus)?;
        for line in lines {
            text.push_str(" | ").map_err(|_| DisplayError::Bus)?;
            text.push_str(line).map_err(|_| DisplayError::Bus)?;
        }
        self.emit(text);
        Ok(())
    }

    fn progress(&mut self, message: &str, percent: u8) -> Result<(), DisplayError> {
        use core::fmt::Write;

        let mut text: String<SCREEN_TEXT_LEN> = String::new();
        write!(text, "{} {}%", message, percent.min(100)).map_err(|_| DisplayError::Bus)?;
        self.emit(text);
        Ok(())
    }
}
