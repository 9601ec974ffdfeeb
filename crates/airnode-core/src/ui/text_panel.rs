use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use super::{StatusDisplay, TextSize};

/// Top-left corner of the first line, matching the visible area of the
/// 64x48 window on the node's 128x64 panel
pub const DEFAULT_ORIGIN: Point = Point::new(32, 16);

/// Vertical gap between the two lines in pixels
const LINE_GAP_PX: i32 = 4;

/// [`StatusDisplay`] that draws two text lines onto any `DrawTarget`
pub struct TextPanel<D>
where
    D: DrawTarget,
{
    target: D,
    origin: Point,
    foreground: D::Color,
    background: D::Color,
}

impl<D> TextPanel<D>
where
    D: DrawTarget,
{
    pub fn new(target: D, foreground: D::Color, background: D::Color) -> Self {
        Self {
            target,
            origin: DEFAULT_ORIGIN,
            foreground,
            background,
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn target(&self) -> &D {
        &self.target
    }

}

impl<D> StatusDisplay for TextPanel<D>
where
    D: DrawTarget,
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    fn show(&mut self, title: &str, value: &str, size: TextSize) -> Result<(), D::Error> {
        let font = size.font();
        let style = MonoTextStyle::new(font, self.foreground);
        let line_height = font.character_size.height as i32 + LINE_GAP_PX;
        let second_line = self.origin + Point::new(0, line_height);

        self.target.clear(self.background)?;
        Text::with_baseline(title, self.origin, style, Baseline::Top).draw(&mut self.target)?;
        Text::with_baseline(value, second_line, style, Baseline::Top).draw(&mut self.target)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;
    use embedded_graphics::pixelcolor::BinaryColor;

    fn panel() -> TextPanel<MockDisplay<BinaryColor>> {
        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);
        TextPanel::new(display, BinaryColor::On, BinaryColor::Off).with_origin(Point::zero())
    }

    fn lit_rows(display: &MockDisplay<BinaryColor>) -> (i32, i32) {
        let mut first = i32::MAX;
        let mut last = i32::MIN;
        for y in 0..64 {
            for x in 0..64 {
                if display.get_pixel(Point::new(x, y)) == Some(BinaryColor::On) {
                    first = first.min(y);
                    last = last.max(y);
                }
            }
        }
        (first, last)
    }

    #[test]
    fn test_show_draws_both_lines() {
        let mut panel = panel();
        panel.show("PM2", "12", TextSize::Large).unwrap();

        let (first, last) = lit_rows(panel.target());
        // First glyph row near the top, second line starts below the first line
        assert!(first < 20);
        assert!(last >= 24);
    }

    #[test]
    fn test_show_replaces_previous_content() {
        let mut panel = panel();
        panel.show("CO2", "415", TextSize::Large).unwrap();
        let before: alloc::vec::Vec<_> = (0..64 * 64)
            .map(|i| panel.target().get_pixel(Point::new(i % 64, i / 64)))
            .collect();

        panel.show("CO2", "416", TextSize::Large).unwrap();
        let after: alloc::vec::Vec<_> = (0..64 * 64)
            .map(|i| panel.target().get_pixel(Point::new(i % 64, i / 64)))
            .collect();

        assert_ne!(before, after);
    }

    #[test]
    fn test_origin_offsets_text() {
        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);
        let mut panel = TextPanel::new(display, BinaryColor::On, BinaryColor::Off)
            .with_origin(Point::new(0, 30));

        panel.show("Init", "ab12", TextSize::Small).unwrap();

        let (first, _) = lit_rows(panel.target());
        assert!(first >= 30);
    }
}
