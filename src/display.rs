// Tilt Guard: Text Display
//
// Character-cell text on a 128×64 monochrome panel, rendered with
// embedded-graphics into an SSD1306-style page buffer. The screen shows two
// fields:
//
//   A:        <- CELL_THRESHOLD_LABEL
//   45        <- current angle threshold
//   B:        <- CELL_ANGLE_LABEL
//   12.5      <- latest tilt angle ("X" until the first measurement)

use embedded_graphics::mono_font::ascii::FONT_5X8;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::config::*;
use crate::error::Error;
use crate::peripherals::Display;

// ---------------------------------------------------------------------------
// Frame buffer (page layout: 8 rows per byte, LSB at the top)
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FrameBuffer {
    pages: [u8; DISPLAY_BUFFER_SIZE],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pages: [0; DISPLAY_BUFFER_SIZE],
        }
    }

    /// Raw buffer in controller page order, ready to stream over I2C.
    pub fn pages(&self) -> &[u8] {
        &self.pages
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        let idx = (x + (y / 8) * SCREEN_WIDTH) as usize;
        self.pages[idx] & (1 << (y % 8)) != 0
    }

    /// Number of lit pixels inside `area`.
    pub fn lit_in(&self, area: Rectangle) -> usize {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0 && self.pixel(p.x as u32, p.y as u32))
            .count()
    }

    fn set_pixel(&mut self, point: Point, on: bool) {
        let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
            return;
        };
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }
        let idx = (x + (y / 8) * SCREEN_WIDTH) as usize;
        let mask = 1u8 << (y % 8);
        if on {
            self.pages[idx] |= mask;
        } else {
            self.pages[idx] &= !mask;
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color.is_on());
        }
        Ok(())
    }
}

/// A draw target that can push its contents to the glass.
pub trait Panel: DrawTarget<Color = BinaryColor> {
    fn flush(&mut self) -> crate::error::Result<()> {
        Ok(())
    }
}

impl Panel for FrameBuffer {}

// ---------------------------------------------------------------------------
// Text layer
// ---------------------------------------------------------------------------

pub struct TextPanel<D> {
    target: D,
    font: &'static MonoFont<'static>,
}

impl<D: Panel> TextPanel<D> {
    pub fn new(target: D) -> Self {
        Self {
            target,
            font: &FONT_5X8,
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn cell_size(&self) -> Size {
        Size::new(
            self.font.character_size.width + self.font.character_spacing,
            self.font.character_size.height,
        )
    }

    /// Pixel area covered by the character cell at (`col`, `row`).
    pub fn cell_area(&self, col: u8, row: u8) -> Rectangle {
        let cell = self.cell_size();
        Rectangle::new(
            Point::new(col as i32 * cell.width as i32, row as i32 * cell.height as i32),
            cell,
        )
    }
}

fn draw_err<E: core::fmt::Debug>(e: E) -> Error {
    Error::Display(format!("{:?}", e))
}

impl<D> Display for TextPanel<D>
where
    D: Panel,
    D::Error: core::fmt::Debug,
{
    /// Replaces everything from `col` to the end of `row` with `text`.
    fn write_at(&mut self, col: u8, row: u8, text: &str) -> crate::error::Result<()> {
        let origin = self.cell_area(col, row).top_left;
        let line_width = self
            .target
            .bounding_box()
            .size
            .width
            .saturating_sub(origin.x.max(0) as u32);

        Rectangle::new(origin, Size::new(line_width, self.cell_size().height))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(&mut self.target)
            .map_err(draw_err)?;

        Text::with_baseline(text, origin, MonoTextStyle::new(self.font, BinaryColor::On), Baseline::Top)
            .draw(&mut self.target)
            .map_err(draw_err)?;

        self.target.flush()
    }

    fn clear(&mut self) -> crate::error::Result<()> {
        self.target.clear(BinaryColor::Off).map_err(draw_err)?;
        self.target.flush()
    }
}

// ---------------------------------------------------------------------------
// Screen layout helpers
// ---------------------------------------------------------------------------

/// Draw the static labels and initial values.
pub fn draw_home(display: &mut impl Display, threshold: u32) -> crate::error::Result<()> {
    display.clear()?;
    display.write_at(CELL_THRESHOLD_LABEL.0, CELL_THRESHOLD_LABEL.1, "A:")?;
    show_threshold(display, threshold)?;
    display.write_at(CELL_ANGLE_LABEL.0, CELL_ANGLE_LABEL.1, "B:")?;
    display.write_at(CELL_ANGLE_VALUE.0, CELL_ANGLE_VALUE.1, "X")
}

pub fn show_threshold(display: &mut impl Display, threshold: u32) -> crate::error::Result<()> {
    display.write_at(CELL_THRESHOLD_VALUE.0, CELL_THRESHOLD_VALUE.1, &threshold.to_string())
}

pub fn show_angle(display: &mut impl Display, angle: f32) -> crate::error::Result<()> {
    display.write_at(CELL_ANGLE_VALUE.0, CELL_ANGLE_VALUE.1, &format_angle(angle))
}

/// One decimal, left-aligned in a four character field.
pub fn format_angle(angle: f32) -> String {
    format!("{:<4.1}", angle)
}
