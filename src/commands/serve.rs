//! The `serve` command: run the daemon until interrupted.

use anyhow::Context;

use dmxd::config::Config;
use dmxd::logging;
use dmxd::supervisor::Supervisor;

use crate::cli::ServeOpts;

pub fn run(opts: ServeOpts) -> anyhow::Result<()> {
    let config = Config::resolve(
        opts.pin,
        opts.channels as usize,
        opts.socket,
        opts.log,
        opts.backend,
        opts.strict,
    )?;

    logging::init(&config.log_path)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dmxd starting");

    let running = super::setup_interrupt_handler();
    let mut supervisor =
        Supervisor::new(config, running).context("failed to start daemon")?;
    supervisor.run()?;
    Ok(())
}
