use serde::{Deserialize, Serialize};

/// Classified booking failures. Every authoritative rejection maps to
/// exactly one of these; each variant is a single user-visible message
/// category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingError {
    #[error("This class is full; you can join the waitlist instead")]
    ClassFull,

    #[error("No valid credit package available for this booking")]
    InsufficientCredits,

    #[error("You already have a confirmed booking for this class")]
    DuplicateBooking,

    #[error("Too close to the class start time to cancel")]
    CancellationWindowViolation,

    #[error("The cash reservation for this package has lapsed")]
    ReservationExpired,

    #[error("Another change to this class is still in progress")]
    OperationInProgress,

    #[error("Could not reach the booking service")]
    NetworkFailure,

    #[error("The booking service reported an unexpected error")]
    Unknown,
}

/// What the caller should do next after a classified failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryHint {
    JoinWaitlist,
    BuyCredits,
    Retry,
    WaitAndRetry,
    ContactStudio,
    None,
}

impl BookingError {
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            BookingError::ClassFull => RecoveryHint::JoinWaitlist,
            BookingError::InsufficientCredits => RecoveryHint::BuyCredits,
            BookingError::DuplicateBooking => RecoveryHint::None,
            BookingError::CancellationWindowViolation => RecoveryHint::ContactStudio,
            BookingError::ReservationExpired => RecoveryHint::BuyCredits,
            BookingError::OperationInProgress => RecoveryHint::WaitAndRetry,
            BookingError::NetworkFailure => RecoveryHint::Retry,
            BookingError::Unknown => RecoveryHint::Retry,
        }
    }

    /// Only transient failures qualify for the coordinator's single
    /// bounded retry; every other classification is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::NetworkFailure | BookingError::Unknown)
    }
}
