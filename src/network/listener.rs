use crate::error::{ChainError, Result};
use crate::network::ConnectionSpawner;
use log::{error, info, warn};
use std::io::{BufRead, BufReader, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

// I cap a single line at 64 KiB so a peer that never sends a newline
// can't make me buffer forever
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Receives every newline-terminated line read from a connection
pub trait LineHandler: Send + Sync + 'static {
    fn handle_line(&self, line: &str, peer: SocketAddr);
}

/// Line-oriented TCP listener shared by the intake and announcement ports
pub struct Listener {
    name: &'static str,
    listener: TcpListener,
}

impl Listener {
    pub fn bind(name: &'static str, addr: &str) -> Result<Listener> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| ChainError::Network(format!("Failed to bind {name} to {addr}: {e}")))?;
        info!("{name} listening on {addr}");
        Ok(Listener { name, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, handing each one to `spawner`.
    ///
    /// Accept, read and spawn failures only affect the connection involved.
    pub fn serve<H: LineHandler>(self, handler: Arc<H>, spawner: &dyn ConnectionSpawner) {
        // I loop over incoming connections forever, the same way for both ports
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("{}: error accepting connection: {e}", self.name);
                    continue;
                }
            };
            let peer_addr = match stream.peer_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("{}: failed to get peer address: {e}", self.name);
                    continue;
                }
            };

            // Each connection gets its own handler clone so I never block the accept loop
            let handler = Arc::clone(&handler);
            let name = self.name;
            let job = Box::new(move || {
                if let Err(e) = handle_connection(handler.as_ref(), stream, peer_addr) {
                    warn!("{name}: connection from {peer_addr} ended: {e}");
                }
            });
            if let Err(e) = spawner.spawn(peer_addr, job) {
                warn!("{}: rejecting connection from {peer_addr}: {e}", self.name);
            }
        }
    }
}

/// Feed each line to `handler` until the peer closes, a read fails or a line
/// runs past [`MAX_LINE_BYTES`].
///
/// Lines are raw bytes; anything that isn't UTF-8 reaches the handler with
/// replacement characters instead of ending the connection.
fn handle_connection<H: LineHandler>(handler: &H, stream: TcpStream, peer_addr: SocketAddr) -> Result<()> {
    let mut reader = BufReader::new(&stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        // One byte past the cap tells me the line is too long
        let read = (&mut reader)
            .take(MAX_LINE_BYTES + 1)
            .read_until(b'\n', &mut line)
            .map_err(|e| ChainError::Network(format!("Failed to read from {peer_addr}: {e}")))?;
        if read == 0 {
            break;
        }

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        } else if read as u64 > MAX_LINE_BYTES {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(ChainError::Network(format!(
                "Line from {peer_addr} exceeds {MAX_LINE_BYTES} bytes"
            )));
        }

        handler.handle_line(&String::from_utf8_lossy(&line), peer_addr);
    }
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}
