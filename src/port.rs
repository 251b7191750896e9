use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::RudpError;

/// Whether `DatagramPort::receive` produced a datagram or simply ran out of
/// time waiting for one.
pub enum RecvOutcome {
    Datagram(Vec<u8>),
    Timeout,
}

/// Thin wrapper over a UDP socket: send-to-peer, receive-with-timeout,
/// set-timeout, close. The reliability engine and state machine never touch
/// `UdpSocket` directly.
pub struct DatagramPort {
    socket: UdpSocket,
}

impl DatagramPort {
    /// Binds an ephemeral local port (client role).
    pub fn open() -> Result<Self, RudpError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(DatagramPort { socket })
    }

    /// Binds a specific local port (server role).
    pub fn bind(port: u16) -> Result<Self, RudpError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        Ok(DatagramPort { socket })
    }

    /// Locks subsequent send/receive to a single peer address.
    pub fn connect_peer(&self, addr: impl ToSocketAddrs) -> Result<(), RudpError> {
        self.socket.connect(addr)?;
        Ok(())
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), RudpError> {
        self.socket.send(bytes)?;
        Ok(())
    }

    /// `recv_from`-style send used only during `accept`, before the peer
    /// address is locked in via `connect_peer`.
    pub fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> Result<(), RudpError> {
        self.socket.send_to(bytes, addr)?;
        Ok(())
    }

    pub fn receive(&self, max_bytes: usize) -> Result<RecvOutcome, RudpError> {
        let mut buf = vec![0u8; max_bytes];
        match self.socket.recv(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(RecvOutcome::Datagram(buf))
            }
            Err(e) if is_timeout(&e) => Ok(RecvOutcome::Timeout),
            Err(e) => Err(RudpError::Transport(e)),
        }
    }

    /// Receives one datagram from any sender, reporting who sent it. Used
    /// only by the server before a peer is locked in.
    pub fn receive_from(&self, max_bytes: usize) -> Result<(RecvOutcome, Option<SocketAddr>), RudpError> {
        let mut buf = vec![0u8; max_bytes];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                buf.truncate(n);
                Ok((RecvOutcome::Datagram(buf), Some(from)))
            }
            Err(e) if is_timeout(&e) => Ok((RecvOutcome::Timeout, None)),
            Err(e) => Err(RudpError::Transport(e)),
        }
    }

    pub fn set_receive_timeout(&self, timeout: Duration) -> Result<(), RudpError> {
        self.socket.set_read_timeout(Some(timeout))?;
        Ok(())
    }

    /// Has nothing extra to release beyond the socket's own `Drop`; kept as
    /// an explicit operation so the public API can surface transport errors
    /// from it uniformly.
    pub fn close(self) -> Result<(), RudpError> {
        drop(self);
        Ok(())
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
