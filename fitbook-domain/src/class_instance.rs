use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Class instance status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Scheduled,
    Cancelled,
    Completed,
}

/// A scheduled occurrence of a class template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInstance {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub enrolled_count: u32,
    pub waitlist_count: u32,
    pub status: ClassStatus,
}

impl ClassInstance {
    pub fn new(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        capacity: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_time,
            end_time,
            capacity,
            enrolled_count: 0,
            waitlist_count: 0,
            status: ClassStatus::Scheduled,
        }
    }

    /// Check if every seat is taken
    pub fn is_full(&self) -> bool {
        self.enrolled_count >= self.capacity
    }

    /// Seats still open, saturating at zero
    pub fn remaining_spots(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count)
    }

    /// Check if the class can still accept bookings
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.status == ClassStatus::Scheduled && self.start_time > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn upcoming(capacity: u32) -> ClassInstance {
        let start = Utc::now() + Duration::hours(3);
        ClassInstance::new("Vinyasa Flow", start, start + Duration::hours(1), capacity)
    }

    #[test]
    fn test_fullness() {
        let mut class = upcoming(2);
        assert!(!class.is_full());
        assert_eq!(class.remaining_spots(), 2);

        class.enrolled_count = 2;
        assert!(class.is_full());
        assert_eq!(class.remaining_spots(), 0);
    }

    #[test]
    fn test_bookable_window() {
        let mut class = upcoming(10);
        assert!(class.is_bookable(Utc::now()));

        // Past start time
        assert!(!class.is_bookable(class.start_time + Duration::minutes(1)));

        // Cancelled class
        class.status = ClassStatus::Cancelled;
        assert!(!class.is_bookable(Utc::now()));
    }
}
