use uuid::Uuid;

use crate::error::BookingError;

/// Sink for user-visible engine output: classified errors and one-time
/// "package activated" events. The UI layer supplies the real
/// implementation.
pub trait NotificationSink: Send + Sync {
    fn error(&self, error: &BookingError);

    fn package_activated(&self, package_id: Uuid, credits_unlocked: u32);
}

/// Sink that drops everything; useful for headless callers and tests
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn error(&self, _error: &BookingError) {}

    fn package_activated(&self, _package_id: Uuid, _credits_unlocked: u32) {}
}
