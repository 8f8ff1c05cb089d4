use crate::error::BookingError;
use crate::transport::TransportError;

/// Wire codes the authoritative side uses for rejections
pub mod codes {
    pub const CLASS_FULL: &str = "class_full";
    pub const INSUFFICIENT_CREDITS: &str = "insufficient_credits";
    pub const DUPLICATE_BOOKING: &str = "duplicate_booking";
    pub const CANCELLATION_WINDOW: &str = "cancellation_window";
    pub const RESERVATION_EXPIRED: &str = "reservation_expired";
}

/// Map a raw authoritative error signal into the fixed taxonomy.
///
/// Pure function of the signal; callable from any failure path. Unknown
/// rejection codes fall through to `Unknown` so raw transport text never
/// reaches the UI unclassified.
pub fn classify(err: &TransportError) -> BookingError {
    match err {
        TransportError::Rejected { code, .. } => match code.as_str() {
            codes::CLASS_FULL => BookingError::ClassFull,
            codes::INSUFFICIENT_CREDITS => BookingError::InsufficientCredits,
            codes::DUPLICATE_BOOKING => BookingError::DuplicateBooking,
            codes::CANCELLATION_WINDOW => BookingError::CancellationWindowViolation,
            codes::RESERVATION_EXPIRED => BookingError::ReservationExpired,
            _ => BookingError::Unknown,
        },
        TransportError::Timeout | TransportError::Network(_) => BookingError::NetworkFailure,
    }
}
