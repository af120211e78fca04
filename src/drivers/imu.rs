// Tilt Guard: MPU6050 Accelerometer Driver
//
// Register-level access over the shared I2C bus. Only the accelerometer is
// used; samples are returned as raw LSB counts.

use std::sync::Mutex;

use esp_idf_hal::i2c::I2cDriver;

use tiltguard::config::{I2C_ADDR_MPU6050, I2C_TIMEOUT_TICKS};
use tiltguard::peripherals::AccelerometerSource;
use tiltguard::{AccelSample, Error, Result};

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_INT_STATUS: u8 = 0x3A;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

const DATA_RDY: u8 = 0x01;

/// Cheap to clone: every clone talks to the same chip through the same bus.
#[derive(Clone, Copy)]
pub struct Mpu6050 {
    bus: SharedBus,
}

impl Mpu6050 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.write_read(&[REG_WHO_AM_I], &mut buf), Ok(()) if buf[0] == WHO_AM_I_EXPECTED)
    }

    /// Wake the sensor and configure the accelerometer for ±2 g, DLPF 21 Hz.
    pub fn init(&self) -> Result<()> {
        // Wake up (clear SLEEP bit)
        self.write(&[REG_PWR_MGMT_1, 0x00])?;
        // DLPF bandwidth 21 Hz
        self.write(&[REG_CONFIG, 0x04])?;
        // Accelerometer: ±2 g
        self.write(&[REG_ACCEL_CONFIG, 0x00])?;

        log::info!("MPU6050 initialised (±2g, DLPF 21Hz)");
        Ok(())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut bus = self.bus.lock().map_err(|_| Error::Sensor("I2C bus lock poisoned".into()))?;
        bus.write(I2C_ADDR_MPU6050, bytes, I2C_TIMEOUT_TICKS)
            .map_err(|e| Error::Sensor(e.to_string()))
    }

    fn write_read(&self, reg: &[u8], buf: &mut [u8]) -> Result<()> {
        let mut bus = self.bus.lock().map_err(|_| Error::Sensor("I2C bus lock poisoned".into()))?;
        bus.write_read(I2C_ADDR_MPU6050, reg, buf, I2C_TIMEOUT_TICKS)
            .map_err(|e| Error::Sensor(e.to_string()))
    }
}

impl AccelerometerSource for Mpu6050 {
    fn read(&mut self) -> Result<AccelSample> {
        let mut status = [0u8; 1];
        self.write_read(&[REG_INT_STATUS], &mut status)?;
        if status[0] & DATA_RDY == 0 {
            return Err(Error::SensorMiss);
        }

        let mut raw = [0u8; 6];
        self.write_read(&[REG_ACCEL_XOUT_H], &mut raw)?;
        Ok(AccelSample::new(
            i16::from_be_bytes([raw[0], raw[1]]),
            i16::from_be_bytes([raw[2], raw[3]]),
            i16::from_be_bytes([raw[4], raw[5]]),
        ))
    }
}
