use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fitbook_domain::{Booking, ClassInstance, CreditPackage, WaitlistEntry};

/// A raw error signal from the authoritative side, before classification
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server rejected the request. `code` is the wire error code;
    /// `message` is server prose and must never reach the UI as-is.
    #[error("Authoritative rejection [{code}]: {message}")]
    Rejected { code: String, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network failure: {0}")]
    Network(String),
}

/// Server reply to a successful book request. Package selection is
/// server-owned: the reply names which package was actually debited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub debited_package_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelConfirmation {
    pub booking_id: Uuid,
    pub credited_package_id: Uuid,
}

/// User's packages as the authoritative side partitions them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSnapshot {
    pub active: Vec<CreditPackage>,
    pub pending: Vec<CreditPackage>,
    pub historical: Vec<CreditPackage>,
}

impl PackageSnapshot {
    /// Flatten all partitions into one list
    pub fn all(&self) -> Vec<CreditPackage> {
        self.active
            .iter()
            .chain(self.pending.iter())
            .chain(self.historical.iter())
            .cloned()
            .collect()
    }
}

/// Authoritative mutation transport
#[async_trait]
pub trait BookingTransport: Send + Sync {
    /// Book a seat. When `package_id` is None the server picks exactly
    /// one valid package deterministically and reports it back.
    async fn book(
        &self,
        user_id: Uuid,
        class_instance_id: Uuid,
        package_id: Option<Uuid>,
    ) -> Result<BookingConfirmation, TransportError>;

    async fn cancel(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<CancelConfirmation, TransportError>;

    async fn join_waitlist(
        &self,
        user_id: Uuid,
        class_instance_id: Uuid,
    ) -> Result<WaitlistEntry, TransportError>;
}

/// Authoritative read transport for the client's read models
#[async_trait]
pub trait ReadTransport: Send + Sync {
    async fn fetch_bookings(
        &self,
        user_id: Uuid,
        include_past: bool,
    ) -> Result<Vec<Booking>, TransportError>;

    async fn fetch_packages(&self, user_id: Uuid) -> Result<PackageSnapshot, TransportError>;

    async fn fetch_class(&self, class_instance_id: Uuid) -> Result<ClassInstance, TransportError>;
}
