//! Log setup
//!
//! The daemon runs headless, so everything goes to an append-only log
//! file without ANSI colour. `RUST_LOG` still works for turning other
//! crates up or down.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;

/// Install the global subscriber writing to `log_path`.
///
/// An unwritable log file is fatal: a realtime daemon that cannot
/// report its deadline misses is not worth running blind.
pub fn init(log_path: &Path) -> Result<(), DaemonError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| {
            DaemonError::Config(format!("cannot open log file {}: {e}", log_path.display()))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dmxd=debug".parse().unwrap()),
        )
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}
