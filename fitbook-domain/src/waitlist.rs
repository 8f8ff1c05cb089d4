use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A queued request for a seat on a full class instance.
///
/// Entries are served in creation order when a seat frees up; promotion
/// is server-owned and shows up as a confirmed booking on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub class_instance_id: Uuid,
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(user_id: Uuid, class_instance_id: Uuid, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            class_instance_id,
            position,
            created_at: Utc::now(),
        }
    }
}
