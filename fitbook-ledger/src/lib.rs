pub mod capacity;
pub mod ledger;

pub use capacity::{CapacityTracker, ClassCapacity};
pub use ledger::{CreditBalance, CreditLedger, LedgerError};
