//! A reliable, ordered, message-oriented transport layered on UDP.
//!
//! Provides a connection-oriented channel between exactly two endpoints —
//! a client initiator and a server acceptor — with checksum integrity,
//! stop-and-wait retransmission, sequence-based duplicate suppression, and
//! graceful teardown with a linger window. See [`RudpSocket`] for the
//! public surface: `open`/`connect`/`accept`/`send`/`receive`/`close`.

pub mod config;
mod error;
mod pdu;
mod port;
mod recv;
mod reliability;
mod socket;
mod state;

pub use error::RudpError;
pub use pdu::{Pdu, PduFlags};
pub use recv::ReceiveOutcome;
pub use socket::RudpSocket;
pub use state::ConnectionState;
