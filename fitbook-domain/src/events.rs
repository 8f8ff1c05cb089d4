use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events the engine raises toward the notification sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineEvent {
    /// A reserved package was confirmed (cash payment landed) and its
    /// credits became usable. Raised at most once per package.
    PackageActivated {
        package_id: Uuid,
        credits_unlocked: u32,
    },
}
