use std::io;

#[derive(Debug, thiserror::Error)]
pub enum RudpError {
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("handshake failed after {attempts} attempt(s)")]
    HandshakeFailed { attempts: u32 },

    #[error("operation not valid in current connection state")]
    NotConnected,
}

/// Internal-only: a PDU that failed to decode. Never crosses the public API;
/// `recv` maps every variant to a silent drop.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("datagram shorter than header")]
    TooShort,

    #[error("flags contradict length (DATA with length == 0, or vice versa)")]
    ContradictoryFlags,

    #[error("checksum mismatch")]
    BadChecksum,
}
