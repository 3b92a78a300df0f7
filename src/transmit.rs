//! Busy-wait frame transmitter
//!
//! Drives a frame's bits out of the GPIO pin with 4 us symbol timing.
//! The bit loop polls a monotonic microsecond clock instead of
//! sleeping: scheduler latency on a sleep is far larger than a symbol
//! period, so precision has to be bought with CPU. The surrounding
//! idle gaps don't need that precision and use coarse sleeps.

use std::cell::Cell;
use std::time::{Duration, Instant};

use dmx_gpio::{GpioBackend, Level};

use crate::frame::DmxFrame;

/// Transmission timing parameters
pub mod timing {
    /// One DMX bit period at 250 kbit/s
    pub const SYMBOL_US: u64 = 4;

    /// High idle held before the break
    pub const PRE_FRAME_IDLE_US: u64 = 1000;

    /// High idle held after the last stop bit
    pub const POST_FRAME_IDLE_US: u64 = 100;

    /// Recovery pause after a single missed deadline
    pub const MISS_RECOVERY_US: u64 = 1000;

    /// Consecutive misses that switch recovery to the longer cooldown
    pub const COOLDOWN_STREAK: u32 = 50;

    /// Cooldown pause once the streak threshold is reached
    pub const COOLDOWN_MS: u64 = 25;

    /// Consecutive misses after which the daemon gives up entirely
    pub const FAILURE_CEILING: u32 = 10_000;
}

/// Monotonic microsecond clock.
///
/// A trait so tests can inject a clock that stalls or jumps; `now_us`
/// must never go backwards.
pub trait MicroClock {
    fn now_us(&self) -> u64;
}

/// Wall clock anchored to an `Instant` taken at construction
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MicroClock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Clock advancing a fixed step per reading; for tests
pub struct StepClock {
    next: Cell<u64>,
    step: u64,
}

impl StepClock {
    pub fn new(step: u64) -> Self {
        Self {
            next: Cell::new(0),
            step,
        }
    }
}

impl MicroClock for StepClock {
    fn now_us(&self) -> u64 {
        let t = self.next.get();
        self.next.set(t + self.step);
        t
    }
}

/// Sends frames out of one output pin using a busy-wait bit loop
pub struct Transmitter<C: MicroClock = MonotonicClock> {
    pin: u8,
    clock: C,
}

impl Transmitter<MonotonicClock> {
    pub fn new(pin: u8) -> Self {
        Self::with_clock(pin, MonotonicClock::new())
    }
}

impl<C: MicroClock> Transmitter<C> {
    pub fn with_clock(pin: u8, clock: C) -> Self {
        Self { pin, clock }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Hold the line high through the pre-frame idle gap, then align
    /// to a timer edge so the bit loop starts right after a kernel
    /// tick and gets the longest possible uninterrupted run.
    pub fn lead_in(&self, gpio: &mut dyn GpioBackend) {
        gpio.write(self.pin, Level::High);
        std::thread::sleep(Duration::from_micros(timing::PRE_FRAME_IDLE_US));
        self.wait_for_timer_edge();
    }

    /// Return the line to its high idle level after a frame.
    pub fn lead_out(&self, gpio: &mut dyn GpioBackend) {
        gpio.write(self.pin, Level::High);
        std::thread::sleep(Duration::from_micros(timing::POST_FRAME_IDLE_US));
    }

    /// Busy-wait until the microsecond counter jumps, which marks the
    /// moment right after a scheduler interrupt.
    fn wait_for_timer_edge(&self) {
        let mut prev = self.clock.now_us();
        loop {
            let now = self.clock.now_us();
            if now - prev > 1 {
                break;
            }
            prev = now;
        }
    }

    /// Transmit one frame bit by bit.
    ///
    /// Returns the number of bits that were NOT sent: 0 means the full
    /// frame went out; any positive count means a deadline was missed
    /// at that point and the transmission was aborted (a soft failure
    /// the supervisor turns into recovery or, eventually, starvation).
    pub fn send_frame(&self, gpio: &mut dyn GpioBackend, frame: &DmxFrame) -> usize {
        let bits = frame.bits();
        if bits.is_empty() {
            return 0;
        }

        let mut p = 0usize;
        gpio.write(self.pin, bits[0]);
        let start = self.clock.now_us();

        let last = bits.len() - 1;
        while p < last {
            let elapsed = self.clock.now_us() - start - p as u64 * timing::SYMBOL_US;

            if elapsed == timing::SYMBOL_US {
                p += 1;
                // Only touch the hardware when the level changes.
                if bits[p] != bits[p - 1] {
                    gpio.write(self.pin, bits[p]);
                }
            } else if elapsed > timing::SYMBOL_US {
                // Missed the deadline; stop rather than emit skewed bits.
                return bits.len() - p;
            }
        }

        0
    }
}
