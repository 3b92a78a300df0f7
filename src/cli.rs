// CLI definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use dmxd::config::{self, BackendKind};

#[derive(Parser)]
#[command(name = "dmxd")]
#[command(author, version, about = "DMX512 lighting control daemon")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the transmission daemon (the default when no command is given)
    Serve(ServeOpts),

    /// Send one channel update to a running daemon
    Set {
        /// DMX address (1-512)
        #[arg(value_parser = clap::value_parser!(u16).range(1..=512))]
        channel: u16,

        /// Channel value (0-255)
        value: u8,

        /// Control socket path ($DMX_RUN_DIR/dmx.sock or /tmp/dmx.sock)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve(ServeOpts::default())
    }
}

#[derive(Args)]
pub struct ServeOpts {
    /// BCM number of the output pin
    #[arg(long, default_value_t = config::DEFAULT_PIN)]
    pub pin: u8,

    /// Universe size in channels (1-512)
    #[arg(long, default_value_t = config::DEFAULT_CHANNELS as u16,
          value_parser = clap::value_parser!(u16).range(1..=512))]
    pub channels: u16,

    /// Control socket path ($DMX_RUN_DIR/dmx.sock or /tmp/dmx.sock)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Log file path ($DMX_LOG_DIR/dmxd.log or /var/log/dmxd.log)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// GPIO backend driving the pin
    #[arg(long, value_enum, default_value_t = BackendKind::Register)]
    pub backend: BackendKind,

    /// Exit on the first rejected command instead of logging it
    #[arg(long)]
    pub strict: bool,
}

impl Default for ServeOpts {
    fn default() -> Self {
        Self {
            pin: config::DEFAULT_PIN,
            channels: config::DEFAULT_CHANNELS as u16,
            socket: None,
            log: None,
            backend: BackendKind::Register,
            strict: false,
        }
    }
}
