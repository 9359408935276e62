use crate::error::{ChainError, Result};
use log::debug;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Open a connection, write `line` plus a newline, and close.
///
/// Nothing is read back; neither port replies.
pub fn send_line(addr: &str, line: &str) -> Result<()> {
    let socket_addr = resolve(addr)?;
    debug!("Sending line to {socket_addr}: {line}");

    let mut stream = TcpStream::connect_timeout(&socket_addr, Duration::from_millis(TCP_WRITE_TIMEOUT))
        .map_err(|e| ChainError::Network(format!("Failed to connect to {addr}: {e}")))?;

    stream
        .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
        .map_err(|e| ChainError::Network(format!("Failed to set write timeout: {e}")))?;

    stream
        .write_all(format!("{line}\n").as_bytes())
        .map_err(|e| ChainError::Network(format!("Failed to send data to {addr}: {e}")))?;

    let _ = stream.flush();
    Ok(())
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| ChainError::Network(format!("Invalid address {addr}: {e}")))?
        .next()
        .ok_or_else(|| ChainError::Network(format!("Address {addr} did not resolve")))
}
