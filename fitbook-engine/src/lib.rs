pub mod coordinator;
pub mod mirror;
pub mod mutation;
pub mod poll;
pub mod reconcile;

pub use coordinator::ReservationCoordinator;
pub use mirror::{MirrorSnapshot, MirrorStore, ReadModel};
pub use mutation::{InFlightRegistry, MutationKind, MutationOutcome, MutationState};
pub use poll::ReservationPoll;
pub use reconcile::Reconciler;
