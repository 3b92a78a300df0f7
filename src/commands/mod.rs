//! Command handlers for the CLI application.
//!
//! - `serve`: the daemon itself (transmission loop + control socket)
//! - `send`: one-shot client writing a channel update to the socket

pub mod send;
pub mod serve;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set up a SIGINT/SIGTERM handler that clears the given flag when
/// triggered. Returns the Arc<AtomicBool> for use in the serve loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}
