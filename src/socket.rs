use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use log::{info, warn};

use crate::config::{CONNECT_ATTEMPTS, IDLE_TIMEOUT, MAX_PAYLOAD, RETRY_TIMEOUT};
use crate::error::RudpError;
use crate::pdu::{Pdu, PduFlags};
use crate::port::{DatagramPort, RecvOutcome};
use crate::recv::{run_linger, ReceiveOutcome, ReceivePipeline};
use crate::reliability::{await_pdu, send_with_retry};
use crate::state::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Client,
    Server,
}

/// The public surface: one endpoint of a reliable, ordered,
/// message-oriented channel over UDP. `open`, `connect`, `accept`, `send`,
/// `receive` and `close` are the operations callers see.
pub struct RudpSocket {
    port: DatagramPort,
    state: ConnectionState,
    role: Role,
    recv_pipeline: ReceivePipeline,
    retry_timeout: Duration,
}

impl RudpSocket {
    /// Creates an endpoint with no peer yet bound.
    pub fn open() -> Result<Self, RudpError> {
        let port = DatagramPort::open()?;
        Ok(RudpSocket {
            port,
            state: ConnectionState::Closed,
            role: Role::Client,
            recv_pipeline: ReceivePipeline::new(),
            retry_timeout: RETRY_TIMEOUT,
        })
    }

    /// Client handshake: send SYN, await SYN+ACK within one retry window,
    /// retrying up to `CONNECT_ATTEMPTS` total.
    ///
    /// This implementation does not send an explicit third-leg ACK; the
    /// server's `accept` treats successfully sending the SYN+ACK as
    /// sufficient confirmation.
    pub fn connect(peer: impl ToSocketAddrs) -> Result<Self, RudpError> {
        Self::connect_with_timeout(peer, RETRY_TIMEOUT)
    }

    /// Server handshake: bind to `port`, wait for a single peer's SYN, lock
    /// onto that peer, and reply with SYN+ACK.
    pub fn accept(local_port: u16) -> Result<Self, RudpError> {
        Self::accept_with_timeout(local_port, RETRY_TIMEOUT)
    }

    /// Like `connect`/`accept`, but overriding the per-attempt retry timeout
    /// used for the handshake and every subsequent `send`/`close`. Tests
    /// that want the stop-and-wait loop to fail over faster than the one
    /// second reference value use this instead of `connect`/`accept`.
    pub fn connect_with_timeout(peer: impl ToSocketAddrs, retry_timeout: Duration) -> Result<Self, RudpError> {
        let port = DatagramPort::open()?;
        port.connect_peer(peer)?;

        let syn = Pdu::syn();
        let mut attempts = 0;
        let mut state = ConnectionState::Closed;

        loop {
            port.send(&syn.encode())?;
            attempts += 1;
            state = ConnectionState::SynSent;
            info!("connect: sent SYN, attempt {attempts}");

            let reply = await_pdu(&port, retry_timeout, |pdu| {
                pdu.flags.contains(PduFlags::SYN) && pdu.flags.contains(PduFlags::ACK)
            })?;

            if reply.is_some() {
                state = ConnectionState::Established;
                info!("connect: established");
                return Ok(RudpSocket {
                    port,
                    state,
                    role: Role::Client,
                    recv_pipeline: ReceivePipeline::new(),
                    retry_timeout,
                });
            }

            if attempts >= CONNECT_ATTEMPTS {
                warn!("connect: giving up after {attempts} attempts");
                return Err(RudpError::HandshakeFailed { attempts });
            }
        }
    }

    pub fn accept_with_timeout(local_port: u16, retry_timeout: Duration) -> Result<Self, RudpError> {
        let port = DatagramPort::bind(local_port)?;
        port.set_receive_timeout(IDLE_TIMEOUT)?;

        let mut state = ConnectionState::Closed;

        let peer: SocketAddr = loop {
            let (outcome, from) = port.receive_from(crate::config::HEADER_LEN + MAX_PAYLOAD)?;
            let bytes = match outcome {
                RecvOutcome::Datagram(bytes) => bytes,
                RecvOutcome::Timeout => continue,
            };

            let Ok(pdu) = Pdu::decode(&bytes) else { continue };
            if !pdu.flags.contains(PduFlags::SYN) || pdu.flags.contains(PduFlags::ACK) {
                continue;
            }

            state = ConnectionState::SynRcvd;
            break from.expect("recv_from always reports a sender on success");
        };

        port.connect_peer(peer)?;
        port.send(&Pdu::syn_ack().encode())?;
        state = ConnectionState::Established;
        info!("accept: established with {peer}");

        Ok(RudpSocket {
            port,
            state,
            role: Role::Server,
            recv_pipeline: ReceivePipeline::new(),
            retry_timeout,
        })
    }

    /// Fragments `data` into successive DATA PDUs of up to `MAX_PAYLOAD`
    /// bytes and drives the stop-and-wait loop for each in turn. Returns
    /// only once every PDU has been acknowledged.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, RudpError> {
        self.require_established()?;

        // A DATA PDU always carries length > 0 (invariant 1); an empty
        // buffer has nothing to fragment and is a no-op.
        if data.is_empty() {
            return Ok(0);
        }

        let chunks: Vec<&[u8]> = data.chunks(MAX_PAYLOAD).collect();
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let pdu = Pdu::data(i as i32, chunk.to_vec(), i == last);
            send_with_retry(&self.port, &pdu, self.retry_timeout)?;
        }

        Ok(data.len())
    }

    /// Blocks for one incoming PDU and returns the receive pipeline's
    /// verdict on it.
    pub fn receive(&mut self) -> Result<ReceiveOutcome, RudpError> {
        self.require_established()?;

        loop {
            self.port.set_receive_timeout(IDLE_TIMEOUT)?;
            let bytes = match self.port.receive(MAX_PAYLOAD + crate::config::HEADER_LEN)? {
                RecvOutcome::Datagram(bytes) => bytes,
                RecvOutcome::Timeout => continue,
            };

            let Ok(pdu) = Pdu::decode(&bytes) else { continue };

            if pdu.flags.contains(PduFlags::FIN) && !pdu.flags.contains(PduFlags::DATA) {
                // Teardown PDU: ack, then linger to absorb retransmitted FINs.
                self.port.send(&Pdu::ack_for(&pdu).encode())?;
                run_linger(&self.port, &mut self.state)?;
                return Ok(ReceiveOutcome::PeerClosed);
            }

            if !pdu.flags.contains(PduFlags::DATA) {
                // Any other control PDU arriving mid-data-phase (e.g. a
                // stray SYN retransmission) is dispatched nowhere and
                // dropped; the state machine's handshake is already done.
                continue;
            }

            // Ack-even-on-duplicate so the sender's retransmission loop
            // converges.
            self.port.send(&Pdu::ack_for(&pdu).encode())?;

            if let Some(outcome) = self.recv_pipeline.accept_data(&pdu) {
                return Ok(outcome);
            }
            // Duplicate of an already-delivered PDU: dropped after acking,
            // keep waiting for the next one.
        }
    }

    /// Initiates teardown: send FIN (seq -1), await its ack, retransmit on
    /// timeout until acked, then release the underlying port. `close`
    /// returns only once the peer has acked the FIN or a transport error
    /// occurs.
    pub fn close(mut self) -> Result<(), RudpError> {
        if self.state.is_established() {
            let fin = Pdu::fin();
            send_with_retry(&self.port, &fin, self.retry_timeout)?;
            self.state = ConnectionState::FinSent;
        }
        self.state = ConnectionState::Closed;
        self.port.close()
    }

    fn require_established(&self) -> Result<(), RudpError> {
        if self.state.is_established() {
            Ok(())
        } else {
            Err(RudpError::NotConnected)
        }
    }
}
