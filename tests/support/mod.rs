//! A tiny UDP relay used only by the integration tests to inject
//! deterministic packet loss between a real client and a real server
//! socket, without relying on actual network loss.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rudp::Pdu;

/// A drop rule: given a decoded PDU and how many times a PDU matching this
/// rule's predicate has already passed through, decide whether to drop it.
pub struct DropRule {
    matches: Box<dyn Fn(&Pdu) -> bool + Send>,
    drop_first_n: usize,
    seen: AtomicUsize,
}

impl DropRule {
    pub fn new(drop_first_n: usize, matches: impl Fn(&Pdu) -> bool + Send + 'static) -> Self {
        DropRule { matches: Box::new(matches), drop_first_n, seen: AtomicUsize::new(0) }
    }

    fn should_drop(&self, pdu: &Pdu) -> bool {
        if !(self.matches)(pdu) {
            return false;
        }
        let n = self.seen.fetch_add(1, Ordering::SeqCst);
        n < self.drop_first_n
    }
}

/// Sits between a client and a server, forwarding datagrams both ways.
/// Tests bind their client/server `RudpSocket`s at the proxy's two
/// addresses instead of at each other directly.
pub struct FaultyProxy {
    pub client_facing_addr: SocketAddr,
    pub server_facing_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FaultyProxy {
    /// `real_server_addr` is where the server actually listens.
    /// `client_to_server_drop` applies to datagrams flowing client -> server;
    /// `server_to_client_drop` applies to the reverse direction.
    pub fn spawn(
        real_server_addr: SocketAddr,
        client_to_server_drop: DropRule,
        server_to_client_drop: DropRule,
    ) -> Self {
        let client_side = UdpSocket::bind("127.0.0.1:0").unwrap();
        client_side.set_read_timeout(Some(Duration::from_millis(20))).unwrap();
        let client_facing_addr = client_side.local_addr().unwrap();

        let server_side = UdpSocket::bind("127.0.0.1:0").unwrap();
        server_side.set_read_timeout(Some(Duration::from_millis(20))).unwrap();
        let server_facing_addr = server_side.local_addr().unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();

        let handle = thread::spawn(move || {
            let mut client_addr: Option<SocketAddr> = None;
            let mut buf = [0u8; 8192];

            while !stop_clone.load(Ordering::SeqCst) {
                if let Ok((n, from)) = client_side.recv_from(&mut buf) {
                    client_addr = Some(from);
                    if let Ok(pdu) = Pdu::decode(&buf[..n]) {
                        if !client_to_server_drop.should_drop(&pdu) {
                            server_side.send_to(&buf[..n], real_server_addr).unwrap();
                        }
                    }
                }

                if let Ok((n, _)) = server_side.recv_from(&mut buf) {
                    if let Some(addr) = client_addr {
                        if let Ok(pdu) = Pdu::decode(&buf[..n]) {
                            if !server_to_client_drop.should_drop(&pdu) {
                                client_side.send_to(&buf[..n], addr).unwrap();
                            }
                        }
                    }
                }
            }
        });

        FaultyProxy { client_facing_addr, server_facing_addr, stop, handle: Some(handle) }
    }
}

impl Drop for FaultyProxy {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
