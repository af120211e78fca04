// Tilt Guard: Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V); the same values drive the host simulator.

use std::time::Duration;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BUTTON: i32 = 3;        // D1/A1 - User button (INPUT_PULLUP, active LOW)
pub const PIN_LED_GUI: i32 = 2;       // D0/A0 - GUI mode indicator
pub const PIN_LED_DETECTION: i32 = 4; // D2/A2 - Detection mode indicator
pub const PIN_LED_RESTING: i32 = 5;   // D3   - Blinks while the board lies still
pub const PIN_I2C_SDA: i32 = 6;       // D4   - I2C data line
pub const PIN_I2C_SCL: i32 = 7;       // D5   - I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_OLED: u8 = 0x3C;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED) and text layout in character cells
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;
pub const DISPLAY_BUFFER_SIZE: usize = (SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize) / 8; // 1024

pub const CELL_THRESHOLD_LABEL: (u8, u8) = (1, 2);
pub const CELL_THRESHOLD_VALUE: (u8, u8) = (1, 3);
pub const CELL_ANGLE_LABEL: (u8, u8) = (1, 6);
pub const CELL_ANGLE_VALUE: (u8, u8) = (1, 7);

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_GESTURE: usize = 16 * 1024; // model arena lives on the heap, window + I/O buffers here
pub const STACK_DETECTION: usize = 6144;
pub const STACK_PUBLISH: usize = 6144;
pub const STACK_BUTTON: usize = 4096;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const GESTURE_SAMPLE_INTERVAL_MS: u64 = 40; // 25 Hz, matches the training rate
pub const TILT_SAMPLE_INTERVAL_MS: u64 = 250;
pub const BUTTON_POLL_INTERVAL_MS: u64 = 10;
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// ---------------------------------------------------------------------------
// Gesture model
// ---------------------------------------------------------------------------
pub const GESTURE_SEQ_LENGTH: usize = 64;
pub const GESTURE_CHANNELS: usize = 3; // accX, accY, accZ
pub const GESTURE_INPUT_LEN: usize = GESTURE_SEQ_LENGTH * GESTURE_CHANNELS; // 192
pub const GESTURE_LABEL_COUNT: usize = 3;
pub const GESTURE_CONFIDENCE: f32 = 0.8; // exclusive
/// Consecutive matching inferences required per label: ring, slope, left-to-right.
pub const GESTURE_CONSECUTIVE: [u32; GESTURE_LABEL_COUNT] = [20, 10, 15];

// ---------------------------------------------------------------------------
// Angle threshold (degrees)
// ---------------------------------------------------------------------------
pub const THRESHOLD_MIN: u32 = 30;
pub const THRESHOLD_MAX: u32 = 90;
pub const THRESHOLD_STEP: u32 = 5;

// ---------------------------------------------------------------------------
// Tilt detection
// ---------------------------------------------------------------------------
pub const RESTING_ANGLE_DEG: f32 = 5.0;
pub const SESSION_EVENT_CAP: u32 = 5;

// ---------------------------------------------------------------------------
// Telemetry (broker and Wi-Fi credentials are baked in at build time)
// ---------------------------------------------------------------------------
pub const MQTT_TOPIC: &str = "tiltguard";
pub const MQTT_CLIENT_ID: &str = "tiltguard";
pub const MQTT_BROKER_URL: &str = match option_env!("TILTGUARD_BROKER_URL") {
    Some(url) => url,
    None => "mqtt://192.168.0.24:1883",
};
pub const WIFI_SSID: &str = match option_env!("TILTGUARD_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};
pub const WIFI_PASSWORD: &str = match option_env!("TILTGUARD_WIFI_PASS") {
    Some(pass) => pass,
    None => "",
};

// ---------------------------------------------------------------------------
// Runtime configuration handed to components at construction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    pub confidence: f32,
    pub consecutive: [u32; GESTURE_LABEL_COUNT],
    pub seq_length: usize,
    pub sample_interval: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            confidence: GESTURE_CONFIDENCE,
            consecutive: GESTURE_CONSECUTIVE,
            seq_length: GESTURE_SEQ_LENGTH,
            sample_interval: Duration::from_millis(GESTURE_SAMPLE_INTERVAL_MS),
        }
    }
}

impl GestureConfig {
    /// Number of floats the classifier expects per inference.
    pub fn input_len(&self) -> usize {
        self.seq_length * GESTURE_CHANNELS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min: THRESHOLD_MIN,
            max: THRESHOLD_MAX,
            step: THRESHOLD_STEP,
        }
    }
}

impl ThresholdConfig {
    /// The range must be non-empty and reachable from `min` in whole steps.
    pub fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(Error::Config("threshold step must be non-zero"));
        }
        if self.min > self.max {
            return Err(Error::Config("threshold min exceeds max"));
        }
        if (self.max - self.min) % self.step != 0 {
            return Err(Error::Config("threshold range is not a whole number of steps"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TiltConfig {
    pub sample_interval: Duration,
    pub resting_angle_deg: f32,
    pub session_cap: u32,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(TILT_SAMPLE_INTERVAL_MS),
            resting_angle_deg: RESTING_ANGLE_DEG,
            session_cap: SESSION_EVENT_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub gesture: GestureConfig,
    pub threshold: ThresholdConfig,
    pub tilt: TiltConfig,
    pub topic: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            threshold: ThresholdConfig::default(),
            tilt: TiltConfig::default(),
            topic: MQTT_TOPIC.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        self.threshold.validate()?;
        if self.tilt.session_cap == 0 {
            return Err(Error::Config("session cap must be at least one event"));
        }
        if self.gesture.seq_length == 0 {
            return Err(Error::Config("gesture window must hold at least one sample"));
        }
        Ok(())
    }
}
