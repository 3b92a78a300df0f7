//! Daemon error types
//!
//! Two layers, matching the recovery policy: `ProtocolError` covers
//! anything that spoils a single inbound command and is recovered
//! locally; `DaemonError` covers anything that compromises the daemon's
//! ability to drive the line at all and is fatal.

use std::path::PathBuf;

use dmx_gpio::GpioError;
use thiserror::Error;

/// Per-command failures, recovered by dropping the command
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A byte outside the `pair (',' pair)*` grammar
    #[error("unexpected byte 0x{byte:02X} at position {position}")]
    Malformed { position: usize, byte: u8 },

    /// Channel outside the configured universe
    #[error("channel {channel} out of range (universe has {max} channels)")]
    InvalidChannel { channel: u32, max: usize },

    /// Value does not fit an 8-bit slot
    #[error("value {value} for channel {channel} out of range (0-255)")]
    InvalidValue { channel: u32, value: u32 },

    /// Inbound command exceeded the receive buffer limit
    #[error("command of {len} bytes exceeds the {limit} byte receive limit")]
    Oversized { len: usize, limit: usize },

    /// Socket read failed mid-drain
    #[error("reading control socket: {0}")]
    Read(#[from] std::io::Error),
}

/// Fatal daemon failures
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Gpio(#[from] GpioError),

    #[error("control socket {path}: {source}")]
    Socket {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A protocol error promoted to fatal by strict mode
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The miss streak exceeded the hard ceiling; the daemon stops
    /// rather than keep emitting a corrupted signal.
    #[error("timing starvation: {streak} consecutive missed frames")]
    TimingStarvation { streak: u32 },
}
