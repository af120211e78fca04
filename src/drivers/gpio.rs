// Tilt Guard: GPIO Drivers
//
// Mode and status LEDs, plus the user button line (pull-up, active LOW).

use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};

use tiltguard::input::ButtonLine;
use tiltguard::peripherals::Indicator;

pub struct Led {
    pin: PinDriver<'static, AnyOutputPin, Output>,
    on: bool,
}

impl Led {
    pub fn new(pin: AnyOutputPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        Ok(Self { pin, on: false })
    }
}

impl Indicator for Led {
    fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        match res {
            Ok(()) => self.on = on,
            Err(e) => log::warn!("LED write failed: {}", e),
        }
    }

    fn toggle(&mut self) {
        self.set(!self.on);
    }
}

pub struct ButtonPin {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl ButtonPin {
    pub fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl ButtonLine for ButtonPin {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low()
    }
}
