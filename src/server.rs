use crate::error::{network_error, Result};
use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

/// Upper bound on a single request read.
pub const REQUEST_BUFFER_SIZE: usize = 1024;

/// Pending connections the listener queues.
pub const LISTEN_BACKLOG: i32 = 1;

/// Single-client, unframed request/response over TCP: one accept, one read,
/// one write, then close.
#[derive(Debug, Default)]
pub struct Server {
    listener: Option<TcpListener>,
    active: Option<TcpStream>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds on all interfaces with address reuse, replacing any previous
    /// listener. Returns the bound address, which carries the OS-chosen port
    /// when `port` is 0.
    pub fn bind(&mut self, port: u16) -> Result<SocketAddr> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::from(([0, 0, 0, 0], port)).into())?;
        socket.listen(LISTEN_BACKLOG)?;

        let listener: TcpListener = socket.into();
        let addr = listener.local_addr()?;
        info!("listening on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Address of the current listener, if one is bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    pub fn has_active_connection(&self) -> bool {
        self.active.is_some()
    }

    /// Blocks until one client connects, then reads a single chunk from it.
    /// The new connection replaces any active one, which is closed.
    pub fn accept(&mut self) -> Result<(String, SocketAddr)> {
        let Some(listener) = &self.listener else {
            return network_error("Server not initialized.");
        };

        let (mut stream, peer) = listener.accept()?;
        info!("accepted connection from {}", peer);

        let mut buffer = [0u8; REQUEST_BUFFER_SIZE];
        let bytes_read = stream.read(&mut buffer)?;
        let request = String::from_utf8_lossy(&buffer[..bytes_read]).into_owned();

        if let Some(previous) = self.active.replace(stream) {
            warn!("dropping unanswered connection from {:?}", previous.peer_addr());
            previous.shutdown(Shutdown::Both).ok();
        }
        Ok((request, peer))
    }

    /// Sends `message` in full to the active client and closes the connection.
    /// A failed write leaves the connection active.
    pub fn respond(&mut self, message: &str) -> Result<()> {
        let Some(stream) = self.active.as_mut() else {
            return network_error("No active request to respond to.");
        };

        stream.write_all(message.as_bytes())?;
        stream.flush()?;

        if let Some(stream) = self.active.take() {
            // The peer may already be gone; the response is written either way.
            stream.shutdown(Shutdown::Both).ok();
        }
        Ok(())
    }
}
