use airnode_core::ui::{StatusDisplay, TextSize};
use log::info;

/// Mirrors everything shown on the status display into the log
pub struct LoggingDisplay<S> {
    inner: S,
}

impl<S: StatusDisplay> LoggingDisplay<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: StatusDisplay> StatusDisplay for LoggingDisplay<S> {
    type Error = S::Error;

    fn show(&mut self, title: &str, value: &str, size: TextSize) -> Result<(), Self::Error> {
        info!("[display] {} | {}", title, value);
        self.inner.show(title, value, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airnode_core::ui::TextPanel;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::SimulatorDisplay;

    #[test]
    fn test_forwards_to_inner_display() {
        let panel = TextPanel::new(
            SimulatorDisplay::<BinaryColor>::new(Size::new(128, 64)),
            BinaryColor::On,
            BinaryColor::Off,
        );
        let mut display = LoggingDisplay::new(panel);

        display.show("CO2", "612", TextSize::Large).unwrap();

        let lit = display
            .inner()
            .target()
            .bounding_box()
            .points()
            .filter(|p| display.inner().target().get_pixel(*p) == BinaryColor::On)
            .count();
        assert!(lit > 0);
    }
}
