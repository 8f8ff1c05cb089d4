use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fitbook_domain::ClassInstance;

/// Capacity snapshot for one class instance, stamped with the fetch
/// sequence of the refresh that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCapacity {
    pub class_instance_id: Uuid,
    pub capacity: u32,
    pub enrolled_count: u32,
    pub fetch_seq: u64,
}

impl ClassCapacity {
    pub fn is_full(&self) -> bool {
        self.enrolled_count >= self.capacity
    }

    pub fn remaining_spots(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count)
    }
}

/// Per-class fullness derived from authoritative refreshes only.
///
/// Entries are replaced wholesale; a refresh carrying an older fetch
/// sequence than the applied one is discarded, so out-of-order
/// completions never roll capacity backwards.
#[derive(Debug, Clone, Default)]
pub struct CapacityTracker {
    entries: HashMap<Uuid, ClassCapacity>,
}

impl CapacityTracker {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Apply an authoritative class refresh. Returns false when the
    /// refresh was stale and discarded.
    pub fn apply_refresh(&mut self, class: &ClassInstance, fetch_seq: u64) -> bool {
        if let Some(current) = self.entries.get(&class.id) {
            if fetch_seq < current.fetch_seq {
                return false;
            }
        }
        self.entries.insert(
            class.id,
            ClassCapacity {
                class_instance_id: class.id,
                capacity: class.capacity,
                enrolled_count: class.enrolled_count,
                fetch_seq,
            },
        );
        true
    }

    pub fn get(&self, class_instance_id: &Uuid) -> Option<&ClassCapacity> {
        self.entries.get(class_instance_id)
    }

    pub fn is_full(&self, class_instance_id: &Uuid) -> Option<bool> {
        self.entries.get(class_instance_id).map(|c| c.is_full())
    }

    pub fn remaining_spots(&self, class_instance_id: &Uuid) -> Option<u32> {
        self.entries
            .get(class_instance_id)
            .map(|c| c.remaining_spots())
    }
}
