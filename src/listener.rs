//! Control-channel listener
//!
//! A non-blocking unix domain socket the daemon polls once per cycle,
//! strictly between transmissions. Clients are fire-and-forget: they
//! connect, write one textual command, and close; nothing is ever
//! written back.
//!
//! Protocol boundary: the wire `channel` field is the 1-based DMX
//! address (matching the DMX standard's numbering), so `1:255` drives
//! the first slot of the universe. Address 0 is rejected.

use std::io::Read;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DaemonError, ProtocolError};
use crate::frame::Universe;
use crate::parser::parse_command;

/// Per-read chunk size; larger commands span multiple reads
const READ_CHUNK: usize = 1024;

/// Hard cap on one command's size across all reads
const MAX_COMMAND_BYTES: usize = 1 << 20;

/// Non-blocking listener on the control socket
pub struct CommandListener {
    listener: UnixListener,
    path: PathBuf,
}

impl CommandListener {
    /// Bind the control socket, replacing any stale socket file.
    pub fn bind(path: &Path) -> Result<Self, DaemonError> {
        // A previous run may have left its socket file behind.
        let _ = std::fs::remove_file(path);

        let listener = UnixListener::bind(path).map_err(|source| DaemonError::Socket {
            path: path.to_path_buf(),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| DaemonError::Socket {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "control socket bound");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept at most one waiting client; never blocks.
    pub fn poll_once(&self) -> Option<UnixStream> {
        match self.listener.accept() {
            Ok((stream, _)) => Some(stream),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("accept failed: {e}");
                None
            }
        }
    }

    /// Read a connection to end-of-stream, accumulating every chunk.
    ///
    /// `WouldBlock` means the client has not finished writing yet, a
    /// zero-length read means it closed. The buffer is truncated at
    /// the first NUL byte for compatibility with clients that write
    /// fixed-size zero-padded buffers.
    pub fn drain(&self, stream: &mut UnixStream) -> Result<Vec<u8>, ProtocolError> {
        stream.set_nonblocking(true)?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if buf.len() + n > MAX_COMMAND_BYTES {
                        return Err(ProtocolError::Oversized {
                            len: buf.len() + n,
                            limit: MAX_COMMAND_BYTES,
                        });
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(nul) = buf.iter().position(|&b| b == 0) {
            buf.truncate(nul);
        }
        Ok(buf)
    }

    /// One poll cycle: accept, drain, parse, apply.
    ///
    /// Returns the number of pairs applied, or `None` when no client
    /// was waiting. The command is applied to `universe` only once the
    /// whole buffer parsed and validated; connections live for exactly
    /// this one call.
    pub fn poll(&self, universe: &mut Universe) -> Result<Option<usize>, ProtocolError> {
        let Some(mut stream) = self.poll_once() else {
            return Ok(None);
        };

        let buf = self.drain(&mut stream)?;
        let pairs = parse_command(&buf)?;
        universe.apply_command(&pairs)?;

        debug!(pairs = pairs.len(), "command applied");
        Ok(Some(pairs.len()))
    }
}
