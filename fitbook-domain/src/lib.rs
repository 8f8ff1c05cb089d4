pub mod booking;
pub mod class_instance;
pub mod credit;
pub mod events;
pub mod waitlist;

pub use booking::{Booking, BookingStatus};
pub use class_instance::{ClassInstance, ClassStatus};
pub use credit::{CreditError, CreditPackage, PackageStatus};
pub use events::EngineEvent;
pub use waitlist::WaitlistEntry;
