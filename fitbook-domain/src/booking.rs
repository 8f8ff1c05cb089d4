use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Booking status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

/// The relationship between a user and a class instance.
///
/// At most one CONFIRMED booking may exist per (user, class instance)
/// pair; the authoritative side enforces this and the client mirror
/// keys confirmed bookings by class instance to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub class_instance_id: Uuid,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    /// The credit package this booking debited
    pub package_id: Uuid,
    /// Server-owned cancellation eligibility; the client never computes it
    pub cancellable: bool,
}

impl Booking {
    pub fn new(user_id: Uuid, class_instance_id: Uuid, package_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            class_instance_id,
            status: BookingStatus::Confirmed,
            booked_at: Utc::now(),
            package_id,
            cancellable: true,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}
