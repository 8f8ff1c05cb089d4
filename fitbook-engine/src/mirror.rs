use std::collections::HashMap;

use uuid::Uuid;

use fitbook_core::PackageSnapshot;
use fitbook_domain::{Booking, BookingStatus, ClassInstance, WaitlistEntry};
use fitbook_ledger::{CapacityTracker, CreditLedger};

/// The read models the reconciler refreshes independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadModel {
    Bookings,
    Ledger,
    Capacity,
}

/// Fetch bookkeeping for one read model. `stale` means a refresh is due
/// or has failed; the last good value stays displayable either way.
#[derive(Debug, Clone, Default)]
struct ReadModelMeta {
    next_seq: u64,
    applied_seq: u64,
    stale: bool,
}

impl ReadModelMeta {
    fn begin_fetch(&mut self) -> u64 {
        self.next_seq += 1;
        self.stale = true;
        self.next_seq
    }

    /// An older fetch never overwrites a newer applied one
    fn try_apply(&mut self, seq: u64) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.stale = false;
        true
    }
}

/// The client's cache mirror of authoritative state.
///
/// Single shared mutable resource of the engine: held behind a
/// `tokio::sync::Mutex` by its owners, written only as whole-entity
/// replacements. Optimistic overlays go through `snapshot`/`restore`
/// so rollback is atomic rather than a field-by-field patch.
#[derive(Debug, Default)]
pub struct MirrorStore {
    /// Confirmed bookings keyed by class instance id. The key choice
    /// enforces the one-confirmed-booking-per-class invariant on merge.
    bookings: HashMap<Uuid, Booking>,
    waitlist: HashMap<Uuid, WaitlistEntry>,
    classes: HashMap<Uuid, ClassInstance>,
    pub ledger: CreditLedger,
    pub capacity: CapacityTracker,
    bookings_meta: ReadModelMeta,
    ledger_meta: ReadModelMeta,
    capacity_meta: ReadModelMeta,
}

/// Pre-mutation state captured for atomic rollback
#[derive(Debug, Clone)]
pub struct MirrorSnapshot {
    bookings: HashMap<Uuid, Booking>,
    ledger: CreditLedger,
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- bookings ---------------------------------------------------------

    pub fn booking_for_class(&self, class_instance_id: &Uuid) -> Option<&Booking> {
        self.bookings.get(class_instance_id)
    }

    pub fn booking_by_id(&self, booking_id: &Uuid) -> Option<&Booking> {
        self.bookings.values().find(|b| b.id == *booking_id)
    }

    pub fn confirmed_bookings(&self) -> Vec<&Booking> {
        self.bookings.values().collect()
    }

    /// Insert or replace the confirmed booking for its class instance
    pub fn upsert_booking(&mut self, booking: Booking) {
        self.bookings.insert(booking.class_instance_id, booking);
    }

    pub fn remove_booking(&mut self, booking_id: &Uuid) -> Option<Booking> {
        let class_id = self
            .bookings
            .values()
            .find(|b| b.id == *booking_id)
            .map(|b| b.class_instance_id)?;
        self.bookings.remove(&class_id)
    }

    /// Whole-list replacement from an authoritative fetch. Only confirmed
    /// bookings enter the mirror; duplicates collapse onto their class key.
    pub fn replace_bookings(&mut self, bookings: Vec<Booking>) {
        self.bookings = bookings
            .into_iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .map(|b| (b.class_instance_id, b))
            .collect();
    }

    // -- waitlist ---------------------------------------------------------

    pub fn waitlist_entry(&self, class_instance_id: &Uuid) -> Option<&WaitlistEntry> {
        self.waitlist.get(class_instance_id)
    }

    pub fn insert_waitlist_entry(&mut self, entry: WaitlistEntry) {
        self.waitlist.insert(entry.class_instance_id, entry);
    }

    pub fn remove_waitlist_entry(&mut self, class_instance_id: &Uuid) -> Option<WaitlistEntry> {
        self.waitlist.remove(class_instance_id)
    }

    // -- classes ----------------------------------------------------------

    pub fn class(&self, class_instance_id: &Uuid) -> Option<&ClassInstance> {
        self.classes.get(class_instance_id)
    }

    /// Whole-entity replacement of a class instance, feeding the
    /// capacity tracker with the same fetch sequence.
    pub fn replace_class(&mut self, class: ClassInstance, fetch_seq: u64) -> bool {
        if !self.capacity.apply_refresh(&class, fetch_seq) {
            return false;
        }
        self.classes.insert(class.id, class);
        true
    }

    // -- read-model bookkeeping -------------------------------------------

    pub fn begin_refresh(&mut self, model: ReadModel) -> u64 {
        self.meta_mut(model).begin_fetch()
    }

    pub fn is_stale(&self, model: ReadModel) -> bool {
        self.meta(model).stale
    }

    pub fn apply_bookings(&mut self, seq: u64, bookings: Vec<Booking>) -> bool {
        if !self.bookings_meta.try_apply(seq) {
            return false;
        }
        self.replace_bookings(bookings);

        // A waitlist entry whose class now carries a confirmed booking
        // was promoted server-side; drop the stale entry
        let promoted: Vec<Uuid> = self
            .waitlist
            .keys()
            .filter(|class_id| self.bookings.contains_key(class_id))
            .copied()
            .collect();
        for class_id in promoted {
            self.remove_waitlist_entry(&class_id);
        }
        true
    }

    pub fn apply_packages(&mut self, seq: u64, snapshot: &PackageSnapshot) -> bool {
        if !self.ledger_meta.try_apply(seq) {
            return false;
        }
        self.ledger.replace_all(snapshot);
        true
    }

    pub fn apply_class(&mut self, seq: u64, class: ClassInstance) -> bool {
        let applied = self.replace_class(class, seq);
        if applied {
            self.capacity_meta.try_apply(seq);
        }
        applied
    }

    // -- rollback ---------------------------------------------------------

    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot {
            bookings: self.bookings.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Atomic restore of the pre-mutation bookings and ledger
    pub fn restore(&mut self, snapshot: MirrorSnapshot) {
        self.bookings = snapshot.bookings;
        self.ledger = snapshot.ledger;
    }

    fn meta(&self, model: ReadModel) -> &ReadModelMeta {
        match model {
            ReadModel::Bookings => &self.bookings_meta,
            ReadModel::Ledger => &self.ledger_meta,
            ReadModel::Capacity => &self.capacity_meta,
        }
    }

    fn meta_mut(&mut self, model: ReadModel) -> &mut ReadModelMeta {
        match model {
            ReadModel::Bookings => &mut self.bookings_meta,
            ReadModel::Ledger => &mut self.ledger_meta,
            ReadModel::Capacity => &mut self.capacity_meta,
        }
    }
}
