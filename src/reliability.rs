use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::config::{HEADER_LEN, MAX_PAYLOAD};
use crate::error::RudpError;
use crate::pdu::Pdu;
use crate::port::{DatagramPort, RecvOutcome};

/// Blocks until a PDU satisfying `accept` arrives, or `timeout` elapses.
/// Non-matching PDUs received during the window are decoded and discarded —
/// they are retransmitted acks for already-acknowledged PDUs, or spurious
/// duplicates.
pub fn await_pdu(
    port: &DatagramPort,
    timeout: Duration,
    mut accept: impl FnMut(&Pdu) -> bool,
) -> Result<Option<Pdu>, RudpError> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        port.set_receive_timeout(remaining)?;

        match port.receive(HEADER_LEN + MAX_PAYLOAD)? {
            RecvOutcome::Timeout => return Ok(None),
            RecvOutcome::Datagram(bytes) => match Pdu::decode(&bytes) {
                Ok(pdu) if accept(&pdu) => return Ok(Some(pdu)),
                Ok(pdu) => {
                    trace!("discarding non-matching pdu seq={} flags={:?}", pdu.sequence, pdu.flags);
                }
                Err(e) => {
                    trace!("dropping undecodable datagram: {e}");
                }
            },
        }
    }
}

/// Awaits the ack for `seq`: a PDU with the ACK flag set and a matching
/// sequence number.
pub fn await_ack(port: &DatagramPort, seq: i32, timeout: Duration) -> Result<bool, RudpError> {
    Ok(await_pdu(port, timeout, |pdu| pdu.is_ack_for(seq))?.is_some())
}

/// Stop-and-wait: transmit `pdu`, then repeat {transmit, await_ack} until an
/// ack for its sequence arrives. No attempt cap — the loop terminates only
/// on ack or a fatal transport error.
pub fn send_with_retry(port: &DatagramPort, pdu: &Pdu, retry_timeout: Duration) -> Result<(), RudpError> {
    let encoded = pdu.encode();
    let mut attempt: u32 = 0;

    loop {
        port.send(&encoded)?;
        attempt += 1;
        debug!("sent seq={} flags={:?} attempt={}", pdu.sequence, pdu.flags, attempt);

        if await_ack(port, pdu.sequence, retry_timeout)? {
            debug!("acked seq={}", pdu.sequence);
            return Ok(());
        }

        debug!("timed out awaiting ack for seq={}, retransmitting", pdu.sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduFlags;

    fn pair() -> (DatagramPort, DatagramPort) {
        let a = DatagramPort::open().unwrap();
        let b = DatagramPort::open().unwrap();
        let a_addr = a.local_addr().unwrap();
        let b_addr = b.local_addr().unwrap();
        a.connect_peer(b_addr).unwrap();
        b.connect_peer(a_addr).unwrap();
        (a, b)
    }

    #[test]
    fn await_ack_matches_only_the_requested_sequence() {
        let (a, b) = pair();

        // b sends an ack for seq 5 first, which a must discard, then seq 2.
        let stray = Pdu { flags: PduFlags::ACK, sequence: 5, payload: vec![] };
        b.send(&stray.encode()).unwrap();
        let real = Pdu { flags: PduFlags::ACK, sequence: 2, payload: vec![] };
        b.send(&real.encode()).unwrap();

        let got = await_ack(&a, 2, Duration::from_millis(200)).unwrap();
        assert!(got);
    }

    #[test]
    fn await_ack_times_out_when_nothing_arrives() {
        let (a, _b) = pair();
        let got = await_ack(&a, 0, Duration::from_millis(50)).unwrap();
        assert!(!got);
    }

    #[test]
    fn send_with_retry_retransmits_until_acked() {
        let (a, b) = pair();
        let pdu = Pdu::data(0, vec![1, 2, 3], true);

        // Peer acks only the second attempt, forcing one retransmission.
        let joiner = std::thread::spawn(move || {
            let mut seen = 0;
            loop {
                if let RecvOutcome::Datagram(bytes) = b.receive(8192).unwrap() {
                    let got = Pdu::decode(&bytes).unwrap();
                    seen += 1;
                    if seen >= 2 {
                        b.send(&Pdu::ack_for(&got).encode()).unwrap();
                        break;
                    }
                }
            }
        });

        send_with_retry(&a, &pdu, Duration::from_millis(150)).unwrap();
        joiner.join().unwrap();
    }
}
