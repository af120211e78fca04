//! Error taxonomy shared by every loop.
//!
//! Only `ModelSchema` and `Config` are fatal, and only for the component that
//! raised them. Everything else is reported and the loop carries on with the
//! next tick.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The accelerometer had nothing new this tick.
    #[error("no new accelerometer sample")]
    SensorMiss,

    #[error("accelerometer read failed: {0}")]
    Sensor(String),

    /// Classifier returned a non-success status code.
    #[error("inference failed (code {0})")]
    Inference(i32),

    #[error("model shape mismatch: expected {expected_input} inputs / {expected_labels} labels, model has {input} / {labels}")]
    ModelSchema {
        expected_input: usize,
        expected_labels: usize,
        input: usize,
        labels: usize,
    },

    #[error("publish failed (code {0})")]
    Publish(i32),

    #[error("publish queue closed")]
    QueueClosed,

    #[error("display write failed: {0}")]
    Display(String),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("invalid configuration: {0}")]
    Config(&'static str),
}

impl Error {
    /// Errors a sensor loop logs and skips past.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SensorMiss | Self::Sensor(_) | Self::Inference(_) | Self::Publish(_) | Self::Display(_)
        )
    }
}
