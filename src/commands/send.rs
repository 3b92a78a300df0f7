//! The `set` command: a one-shot control client.
//!
//! Connects, writes `channel:value`, and exits. The protocol is
//! fire-and-forget, so no acknowledgement is read.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use anyhow::Context;

use dmxd::config::Config;

pub fn run(channel: u16, value: u8, socket: Option<PathBuf>) -> anyhow::Result<()> {
    let path = socket.unwrap_or_else(Config::default_socket_path);

    let mut stream = UnixStream::connect(&path)
        .with_context(|| format!("connecting to daemon at {}", path.display()))?;
    stream
        .write_all(format!("{channel}:{value}").as_bytes())
        .context("writing command")?;

    println!("channel {channel} set to {value}");
    Ok(())
}
