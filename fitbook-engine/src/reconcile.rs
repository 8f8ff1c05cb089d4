use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use fitbook_core::{EngineConfig, NotificationSink, ReadTransport, TransportError};

use crate::mirror::{MirrorStore, ReadModel};
use crate::poll::ReservationPoll;

/// Keeps the mirror's read models consistent with authoritative truth
/// after every mutation, and owns the reserved-package poll lifecycle.
pub struct Reconciler {
    user_id: Uuid,
    mirror: Arc<Mutex<MirrorStore>>,
    reads: Arc<dyn ReadTransport>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    poll: StdMutex<Option<ReservationPoll>>,
}

impl Reconciler {
    pub fn new(
        user_id: Uuid,
        mirror: Arc<Mutex<MirrorStore>>,
        reads: Arc<dyn ReadTransport>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            user_id,
            mirror,
            reads,
            sink,
            config,
            poll: StdMutex::new(None),
        }
    }

    /// Invalidate and re-fetch the booking list, the credit ledger, and
    /// (when a class is named) that class's capacity. A model whose
    /// refresh keeps failing stays stale but displayable; nothing is
    /// cleared.
    pub async fn reconcile(&self, class_instance_id: Option<Uuid>) {
        let (bookings_seq, ledger_seq, capacity_seq) = {
            let mut mirror = self.mirror.lock().await;
            (
                mirror.begin_refresh(ReadModel::Bookings),
                mirror.begin_refresh(ReadModel::Ledger),
                class_instance_id.map(|_| mirror.begin_refresh(ReadModel::Capacity)),
            )
        };

        self.refresh_bookings(bookings_seq).await;
        self.refresh_ledger(ledger_seq).await;
        if let (Some(class_id), Some(seq)) = (class_instance_id, capacity_seq) {
            self.refresh_class_with_seq(class_id, seq).await;
        }

        self.ensure_polling().await;
    }

    /// Re-fetch a single class instance's authoritative state
    pub async fn refresh_class(&self, class_instance_id: Uuid) {
        let seq = self.mirror.lock().await.begin_refresh(ReadModel::Capacity);
        self.refresh_class_with_seq(class_instance_id, seq).await;
    }

    async fn refresh_bookings(&self, seq: u64) {
        let user_id = self.user_id;
        let fetched = self
            .with_retries("bookings", || self.reads.fetch_bookings(user_id, false))
            .await;
        if let Some(bookings) = fetched {
            let mut mirror = self.mirror.lock().await;
            if !mirror.apply_bookings(seq, bookings) {
                debug!("booking refresh lost to a newer fetch");
            }
        }
    }

    async fn refresh_ledger(&self, seq: u64) {
        let user_id = self.user_id;
        let fetched = self
            .with_retries("ledger", || self.reads.fetch_packages(user_id))
            .await;
        if let Some(snapshot) = fetched {
            let mut mirror = self.mirror.lock().await;
            if !mirror.apply_packages(seq, &snapshot) {
                debug!("ledger refresh lost to a newer fetch");
            }
        }
    }

    async fn refresh_class_with_seq(&self, class_instance_id: Uuid, seq: u64) {
        let fetched = self
            .with_retries("class capacity", || self.reads.fetch_class(class_instance_id))
            .await;
        if let Some(class) = fetched {
            let mut mirror = self.mirror.lock().await;
            if !mirror.apply_class(seq, class) {
                debug!(%class_instance_id, "class refresh lost to a newer fetch");
            }
        }
    }

    /// Start the reserved-package poll when pending packages exist and
    /// no watcher is running
    pub async fn ensure_polling(&self) {
        let has_reserved = !self.mirror.lock().await.ledger.reserved_ids().is_empty();
        if !has_reserved {
            return;
        }

        let mut slot = self.poll.lock().unwrap_or_else(|e| e.into_inner());
        let running = slot.as_ref().map(|p| !p.is_finished()).unwrap_or(false);
        if running {
            return;
        }
        *slot = Some(ReservationPoll::spawn(
            self.user_id,
            Arc::clone(&self.mirror),
            Arc::clone(&self.reads),
            Arc::clone(&self.sink),
            Duration::from_secs(self.config.ledger_poll_interval_secs),
        ));
    }

    pub fn is_polling(&self) -> bool {
        self.poll
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|p| !p.is_finished())
            .unwrap_or(false)
    }

    /// Stop any running poll; part of engine shutdown so no background
    /// work leaks past the owner's lifetime
    pub fn stop_polling(&self) {
        if let Some(poll) = self.poll.lock().unwrap_or_else(|e| e.into_inner()).take() {
            poll.stop();
        }
    }

    async fn with_retries<T, F, Fut>(&self, what: &str, mut fetch: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut backoff = Duration::from_millis(self.config.refresh_backoff_ms);
        let attempts = self.config.refresh_max_retries.max(1);

        for attempt in 1..=attempts {
            match fetch().await {
                Ok(value) => return Some(value),
                Err(err) => {
                    warn!(what, attempt, "read model refresh failed: {err}");
                    if attempt < attempts {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        // Left stale but displayable; the next reconcile will retry
        None
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
