//! Daemon configuration
//!
//! Runtime parameters come from CLI flags with environment-variable
//! fallbacks for the filesystem paths, so packaging can relocate the
//! socket and log without touching unit files.

use std::path::PathBuf;

use crate::error::DaemonError;
use crate::frame::MAX_CHANNELS;

/// Default BCM pin driving the DMX line
pub const DEFAULT_PIN: u8 = 5;

/// Default universe size
pub const DEFAULT_CHANNELS: usize = 512;

/// Directory override for the control socket
pub const RUN_DIR_ENV: &str = "DMX_RUN_DIR";

/// Directory override for the log file
pub const LOG_DIR_ENV: &str = "DMX_LOG_DIR";

const SOCKET_FILE: &str = "dmx.sock";
const LOG_FILE: &str = "dmxd.log";

/// Which GPIO backend drives the output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// Memory-mapped BCM283x registers (real hardware)
    #[default]
    Register,
    /// Discards all writes; for dry runs on machines without the chip
    Null,
}

/// Fully resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub pin: u8,
    pub channels: usize,
    pub socket_path: PathBuf,
    pub log_path: PathBuf,
    pub backend: BackendKind,
    pub strict: bool,
}

impl Config {
    /// `$DMX_RUN_DIR/dmx.sock`, falling back to `/tmp/dmx.sock`
    pub fn default_socket_path() -> PathBuf {
        dir_from_env(RUN_DIR_ENV, "/tmp").join(SOCKET_FILE)
    }

    /// `$DMX_LOG_DIR/dmxd.log`, falling back to `/var/log/dmxd.log`
    pub fn default_log_path() -> PathBuf {
        dir_from_env(LOG_DIR_ENV, "/var/log").join(LOG_FILE)
    }

    /// Resolve a configuration from (possibly absent) CLI inputs.
    pub fn resolve(
        pin: u8,
        channels: usize,
        socket: Option<PathBuf>,
        log: Option<PathBuf>,
        backend: BackendKind,
        strict: bool,
    ) -> Result<Self, DaemonError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(DaemonError::Config(format!(
                "channel count {channels} out of range (1-{MAX_CHANNELS})"
            )));
        }
        Ok(Self {
            pin,
            channels,
            socket_path: socket.unwrap_or_else(Self::default_socket_path),
            log_path: log.unwrap_or_else(Self::default_log_path),
            backend,
            strict,
        })
    }
}

fn dir_from_env(var: &str, fallback: &str) -> PathBuf {
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let config = Config::resolve(
            DEFAULT_PIN,
            DEFAULT_CHANNELS,
            None,
            None,
            BackendKind::Register,
            false,
        )
        .unwrap();
        assert_eq!(config.pin, 5);
        assert_eq!(config.channels, 512);
        assert!(config.socket_path.ends_with(SOCKET_FILE));
        assert!(config.log_path.ends_with(LOG_FILE));
    }

    #[test]
    fn resolve_rejects_bad_channel_counts() {
        for channels in [0, MAX_CHANNELS + 1] {
            let err = Config::resolve(5, channels, None, None, BackendKind::Null, false);
            assert!(matches!(err, Err(DaemonError::Config(_))));
        }
    }

    #[test]
    fn explicit_paths_win_over_defaults() {
        let config = Config::resolve(
            5,
            16,
            Some(PathBuf::from("/run/dmx/custom.sock")),
            Some(PathBuf::from("/tmp/custom.log")),
            BackendKind::Null,
            true,
        )
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/run/dmx/custom.sock"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/custom.log"));
        assert!(config.strict);
    }

    // Environment lookups live in one test so parallel tests never race
    // on the process environment.
    #[test]
    fn env_overrides_relocate_default_paths() {
        std::env::set_var(RUN_DIR_ENV, "/run/dmx");
        std::env::set_var(LOG_DIR_ENV, "/var/log/dmx");
        assert_eq!(
            Config::default_socket_path(),
            PathBuf::from("/run/dmx/dmx.sock")
        );
        assert_eq!(
            Config::default_log_path(),
            PathBuf::from("/var/log/dmx/dmxd.log")
        );

        std::env::remove_var(RUN_DIR_ENV);
        std::env::remove_var(LOG_DIR_ENV);
        assert_eq!(Config::default_socket_path(), PathBuf::from("/tmp/dmx.sock"));
        assert_eq!(
            Config::default_log_path(),
            PathBuf::from("/var/log/dmxd.log")
        );
    }
}
