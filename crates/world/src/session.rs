use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Bound on frames queued towards one client. When a client stops reading,
/// new frames are dropped for that client only; it reconciles from the next
/// full `mob_update` or by reconnecting.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One registered connection. Until a `join` fills in `character_id` the
/// session receives no broadcasts and cannot act on the world.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub account_id: Uuid,
    pub character_id: Option<Uuid>,
    tx: mpsc::Sender<String>,
}

impl Session {
    pub fn new(id: SessionId, account_id: Uuid) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (
            Self {
                id,
                account_id,
                character_id: None,
                tx,
            },
            rx,
        )
    }

    /// Handle for enqueueing outside the world lock.
    pub fn sender(&self) -> mpsc::Sender<String> {
        self.tx.clone()
    }
}
