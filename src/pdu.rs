use bitflags::bitflags;

use crate::config::{HEADER_LEN, MAX_PAYLOAD};
use crate::error::DecodeError;

bitflags! {
    /// Flags carried by a PDU. Multiple flags may co-occur (SYN+ACK,
    /// FIN+DATA on the terminal data PDU, ACK alongside any other kind).
    ///
    /// The bit positions here are the wire representation; they are not
    /// tied to any host-side struct layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PduFlags: u32 {
        const SYN  = 0b0001;
        const ACK  = 0b0010;
        const FIN  = 0b0100;
        const DATA = 0b1000;
    }
}

/// A protocol data unit: the wire-level unit exchanged between endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub flags: PduFlags,
    pub sequence: i32,
    pub payload: Vec<u8>,
}

impl Pdu {
    pub fn syn() -> Self {
        Pdu { flags: PduFlags::SYN, sequence: 0, payload: Vec::new() }
    }

    pub fn syn_ack() -> Self {
        Pdu { flags: PduFlags::SYN | PduFlags::ACK, sequence: 0, payload: Vec::new() }
    }

    pub fn fin() -> Self {
        Pdu { flags: PduFlags::FIN, sequence: crate::config::TEARDOWN_SEQ, payload: Vec::new() }
    }

    pub fn data(sequence: i32, payload: Vec<u8>, fin: bool) -> Self {
        let mut flags = PduFlags::DATA;
        if fin {
            flags |= PduFlags::FIN;
        }
        Pdu { flags, sequence, payload }
    }

    /// Builds the ACK mirroring this PDU's sequence number and DATA/FIN
    /// shadow-flags, so the sender can tell a terminal PDU's ack apart from
    /// an ordinary one.
    pub fn ack_for(pdu: &Pdu) -> Self {
        let mut flags = PduFlags::ACK;
        flags |= pdu.flags & (PduFlags::DATA | PduFlags::FIN);
        Pdu { flags, sequence: pdu.sequence, payload: Vec::new() }
    }

    pub fn is_ack_for(&self, sequence: i32) -> bool {
        self.flags.contains(PduFlags::ACK) && self.sequence == sequence
    }

    /// Encodes the header plus payload. Callers MAY send only this many
    /// bytes over the wire (header + length); decode accepts the full
    /// fixed-size datagram too.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());

        let checksum = checksum(&self.payload);

        buf.extend_from_slice(&self.flags.bits().to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]); // padding
        buf.extend_from_slice(&self.payload);

        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Pdu, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::TooShort);
        }

        let flags_bits = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let flags = PduFlags::from_bits_truncate(flags_bits);
        let sequence = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let length = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let wire_checksum = u16::from_le_bytes(bytes[12..14].try_into().unwrap());

        if length > MAX_PAYLOAD {
            return Err(DecodeError::ContradictoryFlags);
        }

        // An ack may carry the DATA shadow-flag of the PDU it acknowledges
        // (see `ack_for`) while itself carrying no payload; only a genuine
        // (non-ack) DATA PDU is required to have length > 0.
        let has_data = flags.contains(PduFlags::DATA);
        if has_data && !flags.contains(PduFlags::ACK) && length == 0 {
            return Err(DecodeError::ContradictoryFlags);
        }
        if !has_data && length != 0 {
            return Err(DecodeError::ContradictoryFlags);
        }

        if bytes.len() < HEADER_LEN + length {
            return Err(DecodeError::TooShort);
        }

        let payload = bytes[HEADER_LEN..HEADER_LEN + length].to_vec();

        if checksum(&payload) != wire_checksum {
            return Err(DecodeError::BadChecksum);
        }

        Ok(Pdu { flags, sequence, payload })
    }
}

/// Internet checksum (one's complement of the one's-complement sum of
/// 16-bit words) over the payload only.
pub fn checksum(payload: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = payload.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += u16::from_be_bytes([*last, 0]) as u32;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_data_pdu() {
        let pdu = Pdu::data(3, vec![1, 2, 3, 4], false);
        let encoded = pdu.encode();
        let decoded = Pdu::decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn round_trips_the_teardown_pdu() {
        let pdu = Pdu::fin();
        let decoded = Pdu::decode(&pdu.encode()).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn rejects_short_datagrams() {
        assert!(matches!(Pdu::decode(&[0u8; 4]), Err(DecodeError::TooShort)));
    }

    #[test]
    fn rejects_data_flag_with_zero_length() {
        let mut bytes = Pdu { flags: PduFlags::DATA, sequence: 0, payload: vec![] }.encode();
        // length field is already 0, flags already DATA — this is the case itself.
        let decoded = Pdu::decode(&bytes);
        assert!(matches!(decoded, Err(DecodeError::ContradictoryFlags)));

        // Flip to a non-DATA flag with a nonzero length to hit the other branch.
        bytes[0..4].copy_from_slice(&PduFlags::ACK.bits().to_le_bytes());
        bytes[8..12].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(Pdu::decode(&bytes), Err(DecodeError::ContradictoryFlags)));
    }

    #[test]
    fn rejects_a_flipped_bit_in_the_payload() {
        let pdu = Pdu::data(0, vec![0xAA; 64], false);
        let mut encoded = pdu.encode();
        encoded[HEADER_LEN] ^= 0x01;
        assert!(matches!(Pdu::decode(&encoded), Err(DecodeError::BadChecksum)));
    }

    #[test]
    fn ack_for_mirrors_sequence_and_shadow_flags() {
        let data = Pdu::data(7, vec![9], true);
        let ack = Pdu::ack_for(&data);
        assert_eq!(ack.sequence, 7);
        assert!(ack.flags.contains(PduFlags::ACK));
        assert!(ack.flags.contains(PduFlags::DATA));
        assert!(ack.flags.contains(PduFlags::FIN));
        assert!(ack.is_ack_for(7));
    }
}
