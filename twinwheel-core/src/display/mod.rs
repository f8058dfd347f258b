//! Display pages
//!
//! Pages turn control state into short text screens for the display sink.
//! Rendering is pure formatting; the display task owns the sink.

pub mod pages;

use heapless::{String, Vec};

use crate::traits::MAX_DATA_LINES;

pub use pages::{
    AttitudePage, DebugPage, MotorPage, Page, PageContext, PageInput, PageSet, ParamCursor,
};

/// Characters per display row
pub const TEXT_WIDTH: usize = 24;

/// One row of text
pub type TextLine = String<TEXT_WIDTH>;

/// A rendered screen: title plus data lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub title: TextLine,
    pub lines: Vec<TextLine, MAX_DATA_LINES>,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear title and lines
    pub fn clear(&mut self) {
        self.title.clear();
        self.lines.clear();
    }

    /// Set the title, truncated to the row width
    pub fn set_title(&mut self, title: &str) {
        self.title.clear();
        push_truncated(&mut self.title, title);
    }

    /// Append a data line formatted with `format_args!`
    ///
    /// Lines beyond [`MAX_DATA_LINES`] or wider than the row are rejected.
    pub fn push_line(&mut self, args: core::fmt::Arguments<'_>) -> core::fmt::Result {
        let mut line = TextLine::new();
        core::fmt::write(&mut line, args)?;
        self.lines.push(line).map_err(|_| core::fmt::Error)
    }
}

fn push_truncated(out: &mut TextLine, text: &str) {
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
}
