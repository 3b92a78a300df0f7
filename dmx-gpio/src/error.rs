//! GPIO backend error types

use thiserror::Error;

/// Errors that can occur while acquiring or configuring the hardware
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("opening {path}: {source}")]
    DeviceOpen {
        path: String,
        source: std::io::Error,
    },

    #[error("mapping GPIO registers from {path}: {source}")]
    Map {
        path: String,
        source: std::io::Error,
    },

    #[error("pin {0} out of range (0-{max})", max = crate::register::PIN_COUNT - 1)]
    InvalidPin(u8),

    #[error("backend not initialized")]
    NotInitialized,
}
