/// Explicit connection phase, replacing an implicit `bool connected` flag.
/// Illegal API calls in illegal states are rejected deterministically with
/// `RudpError::NotConnected` rather than silently misbehaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    SynSent,
    SynRcvd,
    Established,
    FinSent,
    Linger,
}

impl ConnectionState {
    pub fn is_established(self) -> bool {
        matches!(self, ConnectionState::Established)
    }
}
