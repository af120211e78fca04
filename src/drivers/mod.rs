pub mod gpio;
pub mod imu;
pub mod mqtt;
pub mod oled;
pub mod wifi;
