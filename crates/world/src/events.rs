/// Fire-and-forget sink for domain events. Failures never propagate to the
/// caller; an implementation logs and moves on.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, subject: &str, payload: &[u8]);
}

/// Discards everything. Default for tests and for deployments without a
/// message bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _subject: &str, _payload: &[u8]) {}
}

/// Emits events into the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn publish(&self, subject: &str, payload: &[u8]) {
        tracing::debug!(subject, bytes = payload.len(), "event published");
    }
}
