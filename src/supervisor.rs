//! Top-level daemon loop
//!
//! The supervisor owns every resource for the daemon's lifetime: the
//! GPIO backend, the universe (channel table + frame), the control
//! socket and the failure counters. One thread alternates strictly
//! between transmitting a frame and polling the control socket, so
//! channel state only ever changes between transmissions and no locks
//! are needed anywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dmx_gpio::{GpioBackend, Level, NullGpio, RegisterGpio};
use tracing::{debug, info, warn};

use crate::config::{BackendKind, Config};
use crate::error::DaemonError;
use crate::frame::Universe;
use crate::listener::CommandListener;
use crate::transmit::{timing, MonotonicClock, Transmitter};

/// What the failure policy asks for after a missed deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissOutcome {
    /// Single miss: short recovery pause
    Recover,
    /// Sustained streak: longer cooldown to relieve contention
    Cooldown,
    /// Streak exceeded the hard ceiling: stop the daemon
    Starved,
}

/// Rolling miss-streak accounting
#[derive(Debug, Default)]
pub struct FailureTracker {
    streak: u32,
    transmits: u64,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn transmits(&self) -> u64 {
        self.transmits
    }

    /// A frame went out completely; the streak resets.
    pub fn record_success(&mut self) {
        self.transmits += 1;
        self.streak = 0;
    }

    /// A deadline was missed; returns the recovery to apply.
    pub fn record_miss(&mut self) -> MissOutcome {
        self.transmits += 1;
        self.streak += 1;
        if self.streak > timing::FAILURE_CEILING {
            MissOutcome::Starved
        } else if self.streak >= timing::COOLDOWN_STREAK {
            MissOutcome::Cooldown
        } else {
            MissOutcome::Recover
        }
    }
}

/// The daemon itself
pub struct Supervisor {
    config: Config,
    gpio: Box<dyn GpioBackend>,
    universe: Universe,
    listener: CommandListener,
    transmitter: Transmitter<MonotonicClock>,
    tracker: FailureTracker,
    running: Arc<AtomicBool>,
}

impl Supervisor {
    /// Acquire all resources: hardware first (fatal if absent), then
    /// the control socket. The line starts at its high idle level.
    pub fn new(config: Config, running: Arc<AtomicBool>) -> Result<Self, DaemonError> {
        let mut gpio: Box<dyn GpioBackend> = match config.backend {
            BackendKind::Register => Box::new(RegisterGpio::new()),
            BackendKind::Null => Box::new(NullGpio::new()),
        };
        gpio.init()?;
        gpio.set_output(config.pin)?;
        gpio.write(config.pin, Level::High);

        let listener = CommandListener::bind(&config.socket_path)?;
        let universe = Universe::new(config.channels);
        let transmitter = Transmitter::new(config.pin);

        Ok(Self {
            config,
            gpio,
            universe,
            listener,
            transmitter,
            tracker: FailureTracker::new(),
            running,
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Run until the shutdown flag is observed or a fatal error hits.
    /// Cleanup happens on both paths.
    pub fn run(&mut self) -> Result<(), DaemonError> {
        info!(
            pin = self.config.pin,
            channels = self.config.channels,
            backend = self.gpio.name(),
            socket = %self.config.socket_path.display(),
            "dmxd serving"
        );

        let result = self.serve_loop();
        self.shutdown();
        result
    }

    fn serve_loop(&mut self) -> Result<(), DaemonError> {
        while self.running.load(Ordering::SeqCst) {
            self.transmit_cycle()?;
            self.poll_control()?;
        }
        Ok(())
    }

    /// Send one frame and apply the failure policy to the outcome.
    fn transmit_cycle(&mut self) -> Result<(), DaemonError> {
        self.transmitter.lead_in(self.gpio.as_mut());
        let unsent = self
            .transmitter
            .send_frame(self.gpio.as_mut(), self.universe.frame());

        if unsent == 0 {
            self.tracker.record_success();
            self.transmitter.lead_out(self.gpio.as_mut());
            return Ok(());
        }

        // Force the line back to its safe idle level before recovering.
        self.gpio.write(self.config.pin, Level::High);
        let outcome = self.tracker.record_miss();
        warn!(
            skipped = unsent,
            transmission = self.tracker.transmits(),
            streak = self.tracker.streak(),
            "missed transmission deadline"
        );

        match outcome {
            MissOutcome::Recover => {
                std::thread::sleep(Duration::from_micros(timing::MISS_RECOVERY_US));
            }
            MissOutcome::Cooldown => {
                warn!(
                    streak = self.tracker.streak(),
                    "sustained miss streak, cooling down"
                );
                std::thread::sleep(Duration::from_millis(timing::COOLDOWN_MS));
            }
            MissOutcome::Starved => {
                return Err(DaemonError::TimingStarvation {
                    streak: self.tracker.streak(),
                });
            }
        }
        Ok(())
    }

    /// Service at most one client, strictly between transmissions.
    fn poll_control(&mut self) -> Result<(), DaemonError> {
        match self.listener.poll(&mut self.universe) {
            Ok(Some(pairs)) => debug!(pairs, "channels updated"),
            Ok(None) => {}
            Err(e) => {
                warn!("command rejected: {e}");
                if self.config.strict {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.gpio.write(self.config.pin, Level::High);
        let _ = std::fs::remove_file(self.listener.path());
        info!(
            transmits = self.tracker.transmits(),
            "dmxd shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn single_miss_asks_for_recovery() {
        let mut tracker = FailureTracker::new();
        assert_eq!(tracker.record_miss(), MissOutcome::Recover);
        assert_eq!(tracker.streak(), 1);
        assert_eq!(tracker.transmits(), 1);
    }

    #[test]
    fn streak_escalates_to_cooldown() {
        let mut tracker = FailureTracker::new();
        for _ in 0..timing::COOLDOWN_STREAK - 1 {
            assert_eq!(tracker.record_miss(), MissOutcome::Recover);
        }
        assert_eq!(tracker.record_miss(), MissOutcome::Cooldown);
    }

    #[test]
    fn success_resets_the_streak() {
        let mut tracker = FailureTracker::new();
        for _ in 0..timing::COOLDOWN_STREAK {
            tracker.record_miss();
        }
        tracker.record_success();
        assert_eq!(tracker.streak(), 0);
        assert_eq!(tracker.record_miss(), MissOutcome::Recover);
    }

    #[test]
    fn ceiling_is_fatal() {
        let mut tracker = FailureTracker::new();
        for _ in 0..timing::FAILURE_CEILING {
            assert_ne!(tracker.record_miss(), MissOutcome::Starved);
        }
        assert_eq!(tracker.record_miss(), MissOutcome::Starved);
    }

    fn test_config(tag: &str) -> Config {
        Config {
            pin: 5,
            channels: 4,
            socket_path: std::env::temp_dir()
                .join(format!("dmxd-sup-{}-{tag}.sock", std::process::id())),
            log_path: PathBuf::from("/dev/null"),
            backend: BackendKind::Null,
            strict: false,
        }
    }

    #[test]
    fn run_observes_shutdown_flag_and_cleans_up() {
        let config = test_config("shutdown");
        let socket_path = config.socket_path.clone();

        // Flag already cleared: the loop must exit before transmitting.
        let running = Arc::new(AtomicBool::new(false));
        let mut supervisor = Supervisor::new(config, running).unwrap();
        assert!(socket_path.exists());

        supervisor.run().unwrap();
        assert!(!socket_path.exists());
    }

    #[test]
    fn strict_mode_makes_rejected_commands_fatal() {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let mut config = test_config("strict");
        config.strict = true;
        let socket_path = config.socket_path.clone();

        let running = Arc::new(AtomicBool::new(true));
        let mut supervisor = Supervisor::new(config, running).unwrap();

        // Queue a malformed command before the loop starts; the first
        // poll after a transmission must pick it up and abort the run.
        let mut client = UnixStream::connect(&socket_path).unwrap();
        client.write_all(b"1:10,x:5").unwrap();
        drop(client);

        let err = supervisor.run().unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(_)));
        // Cleanup runs on the error path too.
        assert!(!socket_path.exists());
        assert_eq!(supervisor.universe().table().values(), &[0, 0, 0, 0]);
    }

    #[test]
    fn new_binds_socket_and_builds_universe() {
        let config = test_config("new");
        let socket_path = config.socket_path.clone();
        let running = Arc::new(AtomicBool::new(true));

        let supervisor = Supervisor::new(config, running).unwrap();
        assert_eq!(supervisor.universe().channel_count(), 4);
        assert_eq!(supervisor.universe().table().values(), &[0, 0, 0, 0]);

        let _ = std::fs::remove_file(socket_path);
    }
}
