pub mod app_config;
pub mod classify;
pub mod error;
pub mod notify;
pub mod transport;

pub use app_config::EngineConfig;
pub use classify::classify;
pub use error::{BookingError, RecoveryHint};
pub use notify::{NotificationSink, NullSink};
pub use transport::{
    BookingConfirmation, BookingTransport, CancelConfirmation, PackageSnapshot, ReadTransport,
    TransportError,
};
