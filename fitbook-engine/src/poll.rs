use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fitbook_core::{NotificationSink, PackageSnapshot, ReadTransport};
use fitbook_domain::PackageStatus;

use crate::mirror::{MirrorStore, ReadModel};

/// Background watcher for cash-payment confirmations.
///
/// While the mirror holds at least one RESERVED package, the ledger is
/// re-fetched on a fixed interval. A package previously seen reserved
/// that comes back ACTIVE raises exactly one `package_activated` event;
/// once no reserved packages remain the task exits on its own.
pub struct ReservationPoll {
    handle: JoinHandle<()>,
}

impl ReservationPoll {
    pub fn spawn(
        user_id: Uuid,
        mirror: Arc<Mutex<MirrorStore>>,
        reads: Arc<dyn ReadTransport>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(run(user_id, mirror, reads, sink, interval));
        Self { handle }
    }

    /// Stop the watcher without waiting for the next tick
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ReservationPoll {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    user_id: Uuid,
    mirror: Arc<Mutex<MirrorStore>>,
    reads: Arc<dyn ReadTransport>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
) {
    let mut seen_reserved: HashSet<Uuid> =
        mirror.lock().await.ledger.reserved_ids().into_iter().collect();

    if seen_reserved.is_empty() {
        return;
    }
    info!(reserved = seen_reserved.len(), "reservation poll started");

    loop {
        tokio::time::sleep(interval).await;

        match poll_cycle(user_id, &mirror, reads.as_ref(), sink.as_ref(), &seen_reserved).await {
            Some(next_seen) => {
                seen_reserved = next_seen;
                if seen_reserved.is_empty() {
                    info!("no reserved packages remain; reservation poll stopping");
                    return;
                }
            }
            // Transport failure: keep the last known good ledger and the
            // seen set, try again next tick
            None => {}
        }
    }
}

/// One poll iteration. Returns the new seen-reserved set, or None when
/// the fetch failed and nothing was applied.
pub(crate) async fn poll_cycle(
    user_id: Uuid,
    mirror: &Mutex<MirrorStore>,
    reads: &dyn ReadTransport,
    sink: &dyn NotificationSink,
    seen_reserved: &HashSet<Uuid>,
) -> Option<HashSet<Uuid>> {
    let snapshot = match reads.fetch_packages(user_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!("reservation poll fetch failed: {err}");
            return None;
        }
    };

    for (package_id, credits_unlocked) in detect_activations(seen_reserved, &snapshot) {
        info!(%package_id, credits_unlocked, "reserved package activated");
        sink.package_activated(package_id, credits_unlocked);
    }

    {
        let mut mirror = mirror.lock().await;
        let seq = mirror.begin_refresh(ReadModel::Ledger);
        if !mirror.apply_packages(seq, &snapshot) {
            debug!("poll snapshot lost to a newer ledger refresh");
        }
    }

    Some(reserved_ids(&snapshot))
}

/// Packages seen reserved on a previous cycle that are now active,
/// paired with the credits they unlock. Pure diff; the caller updates
/// the seen set so a transition is never reported twice.
fn detect_activations(seen_reserved: &HashSet<Uuid>, snapshot: &PackageSnapshot) -> Vec<(Uuid, u32)> {
    snapshot
        .all()
        .into_iter()
        .filter(|p| seen_reserved.contains(&p.id) && p.status == PackageStatus::Active)
        .map(|p| (p.id, p.credits_remaining))
        .collect()
}

fn reserved_ids(snapshot: &PackageSnapshot) -> HashSet<Uuid> {
    snapshot
        .all()
        .into_iter()
        .filter(|p| p.status == PackageStatus::Reserved)
        .map(|p| p.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use fitbook_domain::CreditPackage;

    fn activated(pkg: &CreditPackage) -> CreditPackage {
        let mut active = pkg.clone();
        active.status = PackageStatus::Active;
        active.reserved_at = None;
        active
    }

    #[test]
    fn test_activation_reported_once() {
        let reserved = CreditPackage::new_reserved("cash 5", 5, Utc::now() + ChronoDuration::days(90));
        let seen: HashSet<Uuid> = [reserved.id].into_iter().collect();

        // Transition lands: reserved -> active with 5 credits
        let snapshot = PackageSnapshot {
            active: vec![activated(&reserved)],
            ..Default::default()
        };
        let events = detect_activations(&seen, &snapshot);
        assert_eq!(events, vec![(reserved.id, 5)]);

        // Next cycle diffs against the updated seen set: nothing fires
        let next_seen = reserved_ids(&snapshot);
        assert!(next_seen.is_empty());
        assert!(detect_activations(&next_seen, &snapshot).is_empty());
    }

    #[test]
    fn test_still_reserved_fires_nothing() {
        let reserved = CreditPackage::new_reserved("cash 5", 5, Utc::now() + ChronoDuration::days(90));
        let seen: HashSet<Uuid> = [reserved.id].into_iter().collect();

        let snapshot = PackageSnapshot {
            pending: vec![reserved.clone()],
            ..Default::default()
        };
        assert!(detect_activations(&seen, &snapshot).is_empty());
        assert_eq!(reserved_ids(&snapshot).len(), 1);
    }

    #[test]
    fn test_unseen_active_package_fires_nothing() {
        // A package that was never seen reserved (bought outright) must
        // not be announced as an activation
        let bought = CreditPackage::new("10 pack", 10, Utc::now() + ChronoDuration::days(90));
        let snapshot = PackageSnapshot {
            active: vec![bought],
            ..Default::default()
        };
        assert!(detect_activations(&HashSet::new(), &snapshot).is_empty());
    }
}
