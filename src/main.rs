//! DMX512 lighting control daemon
//!
//! Bit-bangs DMX frames out of a GPIO pin and takes channel updates
//! over a unix domain socket.

use clap::Parser;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Commands::Serve(opts) => commands::serve::run(opts),
        Commands::Set {
            channel,
            value,
            socket,
        } => commands::send::run(channel, value, socket),
    }
}
