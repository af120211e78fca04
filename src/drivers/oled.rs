// Tilt Guard: SSD1306 OLED Driver
//
// 128×64 monochrome panel on the shared I2C bus. Drawing goes into a local
// page buffer; `flush` streams the whole buffer to the controller.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use tiltguard::config::{I2C_ADDR_OLED, I2C_TIMEOUT_TICKS, SCREEN_WIDTH};
use tiltguard::display::{FrameBuffer, Panel};
use tiltguard::{Error, Result};

use super::imu::SharedBus;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 64
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH deselect
    0xA4, // resume from RAM
    0xA6, // normal (not inverted)
    0xAF, // display on
];

pub struct OledPanel {
    bus: SharedBus,
    frame: FrameBuffer,
}

impl OledPanel {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            frame: FrameBuffer::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.command(&[0xE3]).is_ok() // NOP
    }

    pub fn init(&mut self) -> Result<()> {
        self.command(INIT_SEQUENCE)?;
        self.flush()?;
        log::info!("SSD1306 initialised");
        Ok(())
    }

    fn command(&self, cmds: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(cmds.len() + 1);
        buf.push(CONTROL_COMMAND);
        buf.extend_from_slice(cmds);
        self.send(&buf)
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut bus = self
            .bus
            .lock()
            .map_err(|_| Error::Display("I2C bus lock poisoned".into()))?;
        bus.write(I2C_ADDR_OLED, bytes, I2C_TIMEOUT_TICKS)
            .map_err(|e| Error::Display(e.to_string()))
    }
}

impl OriginDimensions for OledPanel {
    fn size(&self) -> Size {
        self.frame.size()
    }
}

impl DrawTarget for OledPanel {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.frame.draw_iter(pixels)
    }
}

impl Panel for OledPanel {
    fn flush(&mut self) -> Result<()> {
        // Full-screen column and page window.
        self.command(&[0x21, 0, (SCREEN_WIDTH - 1) as u8, 0x22, 0, 7])?;

        let mut chunk = [0u8; SCREEN_WIDTH as usize + 1];
        chunk[0] = CONTROL_DATA;
        for page in self.frame.pages().chunks(SCREEN_WIDTH as usize) {
            chunk[1..].copy_from_slice(page);
            self.send(&chunk)?;
        }
        Ok(())
    }
}
