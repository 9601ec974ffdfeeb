//! Status display abstraction and its embedded-graphics implementation

mod text_panel;

pub use text_panel::*;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{FONT_9X15, FONT_10X20};

/// Font size of the two display lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    /// Status messages such as boot progress and the listening address
    Small,
    /// Sensor readings
    Large,
}

impl TextSize {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            TextSize::Small => &FONT_9X15,
            TextSize::Large => &FONT_10X20,
        }
    }
}

/// A display that shows two short lines of text, e.g. a label and a value.
///
/// Each call replaces whatever was shown before.
pub trait StatusDisplay {
    type Error: core::fmt::Debug;

    fn show(&mut self, title: &str, value: &str, size: TextSize) -> Result<(), Self::Error>;
}
