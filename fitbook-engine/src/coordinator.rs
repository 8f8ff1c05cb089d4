use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use fitbook_core::{
    classify, BookingError, BookingTransport, EngineConfig, NotificationSink, ReadTransport,
    TransportError,
};
use fitbook_domain::Booking;

use crate::mirror::{MirrorSnapshot, MirrorStore};
use crate::mutation::{InFlightRegistry, InFlightToken, MutationKind, MutationOutcome};
use crate::reconcile::Reconciler;

/// Turns user intents (book / cancel / join waitlist) into authoritative
/// mutations while keeping the local mirror usable during the round trip.
///
/// Each mutation runs the same lifecycle: claim the class instance,
/// check locally-known preconditions, apply the optimistic overlay, send
/// the authoritative request under a timeout, then either merge the
/// confirmed state and reconcile, or restore the pre-mutation snapshot
/// and surface a classified error.
pub struct ReservationCoordinator {
    user_id: Uuid,
    mirror: Arc<Mutex<MirrorStore>>,
    transport: Arc<dyn BookingTransport>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    in_flight: InFlightRegistry,
    reconciler: Reconciler,
}

impl ReservationCoordinator {
    pub fn new(
        user_id: Uuid,
        transport: Arc<dyn BookingTransport>,
        reads: Arc<dyn ReadTransport>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        let mirror = Arc::new(Mutex::new(MirrorStore::new()));
        let reconciler = Reconciler::new(
            user_id,
            Arc::clone(&mirror),
            reads,
            Arc::clone(&sink),
            config.clone(),
        );
        Self {
            user_id,
            mirror,
            transport,
            sink,
            config,
            in_flight: InFlightRegistry::new(),
            reconciler,
        }
    }

    pub fn mirror(&self) -> Arc<Mutex<MirrorStore>> {
        Arc::clone(&self.mirror)
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Pull the booking list and credit ledger; call at session start
    pub async fn refresh(&self) {
        self.reconciler.reconcile(None).await;
    }

    /// Refresh one class instance's authoritative state, e.g. when its
    /// detail screen opens
    pub async fn view_class(&self, class_instance_id: Uuid) {
        self.reconciler.refresh_class(class_instance_id).await;
    }

    /// Book a seat in a class instance.
    ///
    /// A full class is rejected locally with `ClassFull` so the caller
    /// can offer the waitlist; the rejection never mutates the ledger
    /// and is never converted into a waitlist join silently. Package
    /// choice is server-owned: `preferred_package_id` is relayed when
    /// given, and the optimistic debit is re-pointed if the server
    /// picked a different package.
    pub async fn book_class(
        &self,
        class_instance_id: Uuid,
        preferred_package_id: Option<Uuid>,
    ) -> MutationOutcome {
        let kind = MutationKind::Book;

        let _token = match self.in_flight.try_begin(class_instance_id) {
            Some(token) => token,
            None => return self.reject(kind, class_instance_id, BookingError::OperationInProgress),
        };

        // The guard drops before any sink notification fires
        let prepared = {
            let mut mirror = self.mirror.lock().await;
            self.prepare_book(&mut mirror, class_instance_id, preferred_package_id, Utc::now())
        };
        let (snapshot, placeholder_package) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => return self.reject(kind, class_instance_id, error),
        };

        let (result, timed_out) = self
            .send_with_retry(|| {
                self.transport
                    .book(self.user_id, class_instance_id, preferred_package_id)
            })
            .await;

        match result {
            Ok(confirmation) => {
                {
                    let mut mirror = self.mirror.lock().await;
                    if confirmation.debited_package_id != placeholder_package {
                        // Server chose a different package than the
                        // display placeholder; re-point the debit
                        let _ = mirror.ledger.credit_back(&placeholder_package);
                        if mirror.ledger.debit(&confirmation.debited_package_id).is_err() {
                            debug!("server-chosen package unknown locally; ledger settles on reconcile");
                        }
                    }
                    // Merge by class instance id so the confirmed booking
                    // replaces the optimistic one instead of duplicating it
                    mirror.upsert_booking(confirmation.booking.clone());
                }
                info!(%class_instance_id, booking_id = %confirmation.booking.id, "booking confirmed");
                self.reconciler.reconcile(Some(class_instance_id)).await;
                MutationOutcome::confirmed(
                    kind,
                    class_instance_id,
                    true,
                    Some(confirmation.booking),
                )
            }
            Err(error) => {
                self.rollback(snapshot, class_instance_id, timed_out).await;
                warn!(%class_instance_id, "booking failed: {error}");
                self.sink.error(&error);
                MutationOutcome::rolled_back(kind, class_instance_id, error)
            }
        }
    }

    /// Cancel a confirmed booking. Eligibility is server-owned: the
    /// request is relayed whenever the last-known `cancellable` flag
    /// allows, and the server's verdict is final.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> MutationOutcome {
        let kind = MutationKind::Cancel;

        let prepared = {
            let mut mirror = self.mirror.lock().await;
            self.prepare_cancel(&mut mirror, booking_id)
        };
        let (_token, class_instance_id, snapshot) = match prepared {
            Ok(prepared) => prepared,
            Err((class_instance_id, error)) => {
                return self.reject(kind, class_instance_id, error)
            }
        };

        let (result, timed_out) = self
            .send_with_retry(|| self.transport.cancel(booking_id, reason.clone()))
            .await;

        match result {
            Ok(confirmation) => {
                {
                    let mut mirror = self.mirror.lock().await;
                    if mirror
                        .ledger
                        .credit_back(&confirmation.credited_package_id)
                        .is_err()
                    {
                        debug!("credited package unknown locally; ledger settles on reconcile");
                    }
                }
                info!(%booking_id, "booking cancelled");
                self.reconciler.reconcile(Some(class_instance_id)).await;
                MutationOutcome::confirmed(kind, class_instance_id, true, None)
            }
            Err(error) => {
                // Full snapshot restore, not a partial patch
                self.rollback(snapshot, class_instance_id, timed_out).await;
                warn!(%booking_id, "cancellation failed: {error}");
                self.sink.error(&error);
                MutationOutcome::rolled_back(kind, class_instance_id, error)
            }
        }
    }

    /// Queue for a seat on a full class. No credit moves until the
    /// server promotes the entry, so there is no optimistic overlay.
    pub async fn join_waitlist(&self, class_instance_id: Uuid) -> MutationOutcome {
        let kind = MutationKind::JoinWaitlist;

        let _token = match self.in_flight.try_begin(class_instance_id) {
            Some(token) => token,
            None => return self.reject(kind, class_instance_id, BookingError::OperationInProgress),
        };

        let precheck = {
            let mirror = self.mirror.lock().await;

            if mirror.waitlist_entry(&class_instance_id).is_some() {
                Err(BookingError::DuplicateBooking)
            } else {
                let full = mirror
                    .capacity
                    .is_full(&class_instance_id)
                    .or_else(|| mirror.class(&class_instance_id).map(|c| c.is_full()));
                if full == Some(false) {
                    debug!(%class_instance_id, "class has open seats; waitlist refused");
                    Err(BookingError::Unknown)
                } else {
                    Ok(())
                }
            }
        };
        if let Err(error) = precheck {
            return self.reject(kind, class_instance_id, error);
        }

        let (result, timed_out) = self
            .send_with_retry(|| self.transport.join_waitlist(self.user_id, class_instance_id))
            .await;

        match result {
            Ok(entry) => {
                {
                    let mut mirror = self.mirror.lock().await;
                    mirror.insert_waitlist_entry(entry);
                }
                info!(%class_instance_id, "joined waitlist");
                self.reconciler.reconcile(Some(class_instance_id)).await;
                MutationOutcome::confirmed(kind, class_instance_id, false, None)
            }
            Err(error) => {
                // Nothing optimistic was applied; the mirror is untouched
                if timed_out {
                    self.reconciler.reconcile(Some(class_instance_id)).await;
                }
                warn!(%class_instance_id, "waitlist join failed: {error}");
                self.sink.error(&error);
                MutationOutcome::rejected(kind, class_instance_id, error)
            }
        }
    }

    /// Locally-known precondition checks plus the optimistic overlay,
    /// run under the mirror guard. Returns the pre-mutation snapshot
    /// and the placeholder package the display debit points at.
    fn prepare_book(
        &self,
        mirror: &mut MirrorStore,
        class_instance_id: Uuid,
        preferred_package_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(MirrorSnapshot, Uuid), BookingError> {
        if mirror.booking_for_class(&class_instance_id).is_some() {
            return Err(BookingError::DuplicateBooking);
        }

        if let Some(class) = mirror.class(&class_instance_id) {
            if !class.is_bookable(now) {
                debug!(%class_instance_id, "class is not open for booking");
                return Err(BookingError::Unknown);
            }
        }

        // Authoritative capacity, falling back to the class entity;
        // optimistic overlays never feed this check
        let full = mirror
            .capacity
            .is_full(&class_instance_id)
            .or_else(|| mirror.class(&class_instance_id).map(|c| c.is_full()))
            .unwrap_or(false);
        if full {
            return Err(BookingError::ClassFull);
        }

        let placeholder = match preferred_package_id {
            Some(id) => match mirror.ledger.get(&id) {
                Some(pkg) if pkg.is_valid(now) => id,
                Some(pkg) if pkg.reservation_lapsed(now, self.config.reservation_window_hours) => {
                    return Err(BookingError::ReservationExpired)
                }
                _ => return Err(BookingError::InsufficientCredits),
            },
            None => match mirror.ledger.earliest_expiring_valid(now) {
                Some(pkg) => pkg.id,
                None => return Err(BookingError::InsufficientCredits),
            },
        };

        let snapshot = mirror.snapshot();
        if mirror.ledger.debit(&placeholder).is_err() {
            return Err(BookingError::InsufficientCredits);
        }
        mirror.upsert_booking(Booking::new(self.user_id, class_instance_id, placeholder));
        Ok((snapshot, placeholder))
    }

    fn prepare_cancel(
        &self,
        mirror: &mut MirrorStore,
        booking_id: Uuid,
    ) -> Result<(InFlightToken, Uuid, MirrorSnapshot), (Uuid, BookingError)> {
        let booking = match mirror.booking_by_id(&booking_id).cloned() {
            Some(booking) => booking,
            None => {
                debug!(%booking_id, "cancel requested for unknown booking");
                return Err((Uuid::nil(), BookingError::Unknown));
            }
        };
        let class_instance_id = booking.class_instance_id;

        if !booking.cancellable {
            // The server already reported this booking ineligible
            return Err((class_instance_id, BookingError::CancellationWindowViolation));
        }

        let token = match self.in_flight.try_begin(class_instance_id) {
            Some(token) => token,
            None => return Err((class_instance_id, BookingError::OperationInProgress)),
        };

        let snapshot = mirror.snapshot();
        mirror.remove_booking(&booking_id);
        Ok((token, class_instance_id, snapshot))
    }

    /// Local precondition rejection: nothing was applied, nothing to undo
    fn reject(&self, kind: MutationKind, class_instance_id: Uuid, error: BookingError) -> MutationOutcome {
        debug!(%class_instance_id, "rejected locally: {error}");
        self.sink.error(&error);
        MutationOutcome::rejected(kind, class_instance_id, error)
    }

    async fn rollback(
        &self,
        snapshot: MirrorSnapshot,
        class_instance_id: Uuid,
        timed_out: bool,
    ) {
        {
            let mut mirror = self.mirror.lock().await;
            mirror.restore(snapshot);
        }
        // A timed-out request may still have landed server-side; one
        // refresh resolves the ambiguity either way
        if timed_out {
            self.reconciler.reconcile(Some(class_instance_id)).await;
        }
    }

    /// Send an authoritative request under the configured timeout, with
    /// a single backoff retry for transient classifications. Returns the
    /// result plus whether any attempt timed out.
    async fn send_with_retry<T, F, Fut>(&self, mut send: F) -> (Result<T, BookingError>, bool)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);
        let mut timed_out = false;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match timeout(request_timeout, send()).await {
                Ok(Ok(value)) => return (Ok(value), timed_out),
                Ok(Err(err)) => classify(&err),
                Err(_) => {
                    timed_out = true;
                    BookingError::NetworkFailure
                }
            };

            if attempt == 1 && error.is_retryable() {
                debug!("transient failure, retrying once: {error}");
                sleep(Duration::from_millis(self.config.mutation_retry_backoff_ms)).await;
                continue;
            }
            return (Err(error), timed_out);
        }
    }
}
