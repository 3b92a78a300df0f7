//! No-op backend for hosts without the hardware

use crate::error::GpioError;
use crate::types::Level;
use crate::GpioBackend;

/// Backend whose every operation is a no-op.
///
/// Lets the daemon run on machines without a GPIO register block
/// (development hosts, CI) and backs the test suite.
#[derive(Debug, Default)]
pub struct NullGpio;

impl NullGpio {
    pub fn new() -> Self {
        Self
    }
}

impl GpioBackend for NullGpio {
    fn name(&self) -> &'static str {
        "null"
    }

    fn init(&mut self) -> Result<(), GpioError> {
        Ok(())
    }

    fn set_output(&mut self, _pin: u8) -> Result<(), GpioError> {
        Ok(())
    }

    fn write(&mut self, _pin: u8, _level: Level) {}
}
