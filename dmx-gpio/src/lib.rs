//! GPIO backend abstraction for the dmxd DMX512 daemon
//!
//! This crate provides a unified interface for driving the DMX output
//! pin across different backends:
//!
//! - Register (direct memory-mapped access to the BCM283x GPIO block)
//! - Null (no-op stand-in for hosts without the hardware, and for tests)
//!
//! The trait is also the seam where an external waveform-generation
//! service could be plugged in as an alternate backend.

pub mod error;
pub mod types;

mod null;
mod register;

pub use error::GpioError;
pub use null::NullGpio;
pub use register::RegisterGpio;
pub use types::Level;

/// The core backend trait - all GPIO implementations satisfy this
///
/// Writes are direct hardware effects with no buffering, and the
/// interface deliberately offers no way to read a pin back: the DMX
/// line is output-only.
pub trait GpioBackend {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Acquire the hardware (open and map the register device).
    ///
    /// Must be called before any pin operation. Failure is fatal for
    /// the daemon: there is no degraded mode.
    fn init(&mut self) -> Result<(), GpioError>;

    /// Configure a pin as a digital output
    fn set_output(&mut self, pin: u8) -> Result<(), GpioError>;

    /// Drive a pin to the given level.
    ///
    /// Hot path: called for every level change inside the bit-banging
    /// loop, so it is infallible and must not allocate or block.
    fn write(&mut self, pin: u8, level: Level);
}
