use log::{debug, trace, warn};

use crate::config::LINGER_WINDOW;
use crate::pdu::{Pdu, PduFlags};
use crate::port::DatagramPort;
use crate::reliability::await_pdu;
use crate::state::ConnectionState;

/// Outcome of one `receive` call: a distinguished status is returned rather
/// than an overloaded integer code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// One PDU's worth of payload, with more to come in this send.
    Continue(Vec<u8>),
    /// The last PDU's worth of payload for the current send operation.
    Terminal(Vec<u8>),
    /// The peer's FIN has been fully processed; the connection is closed.
    PeerClosed,
}

/// Holds the receive-side sequence tracking for one connection. Lives on
/// the endpoint, not behind a process-global.
pub struct ReceivePipeline {
    next_expected_seq: i32,
}

impl ReceivePipeline {
    pub fn new() -> Self {
        ReceivePipeline { next_expected_seq: 0 }
    }

    /// Processes one already-decoded, checksum-verified DATA/FIN PDU that
    /// was not a handshake/control PDU. Acking happens unconditionally in
    /// the caller before this is invoked; this method decides whether the
    /// payload is new or a duplicate to drop.
    pub fn accept_data(&mut self, pdu: &Pdu) -> Option<ReceiveOutcome> {
        if pdu.sequence == self.next_expected_seq {
            let payload = pdu.payload.clone();

            if pdu.flags.contains(PduFlags::FIN) {
                debug!("delivering terminal pdu seq={}", pdu.sequence);
                self.next_expected_seq = 0;
                Some(ReceiveOutcome::Terminal(payload))
            } else {
                debug!("delivering pdu seq={}", pdu.sequence);
                self.next_expected_seq += 1;
                Some(ReceiveOutcome::Continue(payload))
            }
        } else {
            trace!(
                "dropping duplicate data pdu seq={} (expected {})",
                pdu.sequence, self.next_expected_seq
            );
            None
        }
    }
}

impl Default for ReceivePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the receiver's side of teardown once a FIN-only PDU has been
/// observed and acked: absorb and re-ack retransmitted FINs for
/// `LINGER_WINDOW`, then report the connection closed.
pub fn run_linger(port: &DatagramPort, state: &mut ConnectionState) -> Result<(), crate::error::RudpError> {
    *state = ConnectionState::Linger;

    loop {
        match await_pdu(port, LINGER_WINDOW, |pdu| {
            pdu.flags.contains(PduFlags::FIN) && !pdu.flags.contains(PduFlags::ACK)
        })? {
            Some(fin) => {
                warn!("linger: re-acking retransmitted fin");
                port.send(&Pdu::ack_for(&fin).encode())?;
            }
            None => {
                *state = ConnectionState::Closed;
                return Ok(());
            }
        }
    }
}
