use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fitbook_core::BookingError;
use fitbook_domain::Booking;

/// Lifecycle of one in-flight mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationState {
    /// Rejected before any optimistic change was applied
    Idle,
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    Book,
    Cancel,
    JoinWaitlist,
}

/// The explicit result of one mutation attempt, replacing the
/// onMutate/onSuccess/onError callback style with a single value the
/// caller can drive state from.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    pub class_instance_id: Uuid,
    pub state: MutationState,
    /// Whether an optimistic overlay was applied at any point
    pub applied_optimistic: bool,
    /// Server-confirmed booking, present on a confirmed book
    pub confirmed_booking: Option<Booking>,
    pub error: Option<BookingError>,
}

impl MutationOutcome {
    pub fn confirmed(
        kind: MutationKind,
        class_instance_id: Uuid,
        applied_optimistic: bool,
        confirmed_booking: Option<Booking>,
    ) -> Self {
        Self {
            kind,
            class_instance_id,
            state: MutationState::Confirmed,
            applied_optimistic,
            confirmed_booking,
            error: None,
        }
    }

    pub fn rejected(kind: MutationKind, class_instance_id: Uuid, error: BookingError) -> Self {
        Self {
            kind,
            class_instance_id,
            state: MutationState::Idle,
            applied_optimistic: false,
            confirmed_booking: None,
            error: Some(error),
        }
    }

    pub fn rolled_back(kind: MutationKind, class_instance_id: Uuid, error: BookingError) -> Self {
        Self {
            kind,
            class_instance_id,
            state: MutationState::RolledBack,
            applied_optimistic: true,
            confirmed_booking: None,
            error: Some(error),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == MutationState::Confirmed
    }
}

/// Client-side guard allowing one in-flight mutation per class instance.
/// A second intent on a busy class is rejected, never queued.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the class instance; None when a mutation is already running
    pub fn try_begin(&self, class_instance_id: Uuid) -> Option<InFlightToken> {
        let mut busy = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(class_instance_id) {
            return None;
        }
        Some(InFlightToken {
            registry: Arc::clone(&self.inner),
            class_instance_id,
        })
    }
}

/// Releases the claim on drop, so every exit path frees the class
#[derive(Debug)]
pub struct InFlightToken {
    registry: Arc<Mutex<HashSet<Uuid>>>,
    class_instance_id: Uuid,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.class_instance_id);
    }
}
