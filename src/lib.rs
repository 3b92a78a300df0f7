// dmxd - DMX512 lighting control daemon
// Frame encoding, command parsing, bit-banged transmission and the
// supervising daemon loop; the binary in main.rs is a thin CLI over
// this library.

pub mod config;
pub mod error;
pub mod frame;
pub mod listener;
pub mod logging;
pub mod parser;
pub mod supervisor;
pub mod transmit;

pub use config::{BackendKind, Config};
pub use error::{DaemonError, ProtocolError};
pub use frame::{ChannelTable, DmxFrame, Universe};
pub use listener::CommandListener;
pub use parser::parse_command;
pub use supervisor::{FailureTracker, MissOutcome, Supervisor};
pub use transmit::{MicroClock, MonotonicClock, StepClock, Transmitter};
