//! Display sink trait
//!
//! The display is a dumb text sink: a title plus up to three data lines, or
//! a progress message. Page layout and formatting stay in the core.

use crate::display::Screen;

/// Data lines a screen can carry below its title
pub const MAX_DATA_LINES: usize = 3;

/// Errors that can occur when writing to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Display not initialised or absent
    NotReady,
    /// Bus transfer failed
    Bus,
    /// More than [`MAX_DATA_LINES`] lines were passed
    TooManyLines,
}

/// Trait for the display subsystem
pub trait TelemetrySink {
    /// Show a title and up to [`MAX_DATA_LINES`] data lines
    fn show(&mut self, title: &str, lines: &[&str]) -> Result<(), DisplayError>;

    /// Show a message with a completion percentage (0-100)
    fn progress(&mut self, message: &str, percent: u8) -> Result<(), DisplayError>;
}

/// Helper for pushing rendered screens
pub trait TelemetrySinkExt: TelemetrySink {
    /// Show a rendered [`Screen`]
    fn show_screen(&mut self, screen: &Screen) -> Result<(), DisplayError> {
        let mut lines: [&str; MAX_DATA_LINES] = [""; MAX_DATA_LINES];
        let count = screen.lines.len().min(MAX_DATA_LINES);
        for (slot, line) in lines.iter_mut().zip(screen.lines.iter()) {
            *slot = line.as_str();
        }
        self.show(screen.title.as_str(), &lines[..count])
    }
}

impl<T: TelemetrySink> TelemetrySinkExt for T {}
