use std::time::Duration;

/// Wire payload limit. Kept well under a conservative path MTU once the
/// 16-byte header is added.
pub const MAX_PAYLOAD: usize = 4096;

/// Fixed header size: flags(4) + sequence(4) + length(4) + checksum(2) + pad(2).
pub const HEADER_LEN: usize = 16;

/// Reserved sequence number carried by the teardown (FIN-only) PDU.
pub const TEARDOWN_SEQ: i32 = -1;

/// Per-attempt retry budget for the stop-and-wait loop and the handshake.
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(1);

/// Attempt cap for `connect`. The data path has no cap.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Grace window during which the receiver absorbs and re-acks retransmitted
/// teardown PDUs after it has already seen one.
pub const LINGER_WINDOW: Duration = Duration::from_secs(1);

/// Receive timeout used while idle, waiting for an application-driven
/// arrival outside of a reliability loop.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
