use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fitbook_core::PackageSnapshot;
use fitbook_domain::{CreditPackage, PackageStatus};

/// Bookable credit total across all valid packages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CreditBalance {
    Credits(u32),
    Unlimited,
}

/// Read-only projection of a user's credit packages, replaced wholesale
/// from authoritative snapshots and overlaid with optimistic debits.
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    packages: HashMap<Uuid, CreditPackage>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self {
            packages: HashMap::new(),
        }
    }

    /// Replace the whole projection from an authoritative snapshot
    pub fn replace_all(&mut self, snapshot: &PackageSnapshot) {
        self.packages = snapshot
            .all()
            .into_iter()
            .map(|pkg| (pkg.id, pkg))
            .collect();
    }

    pub fn get(&self, package_id: &Uuid) -> Option<&CreditPackage> {
        self.packages.get(package_id)
    }

    /// Packages in ACTIVE status and not past their expiry date;
    /// date-lapsed ones surface in `expired` instead
    pub fn active(&self, now: DateTime<Utc>) -> Vec<&CreditPackage> {
        self.packages
            .values()
            .filter(|p| p.status == PackageStatus::Active && !p.is_expired(now))
            .collect()
    }

    /// Packages awaiting cash payment confirmation
    pub fn pending(&self) -> Vec<&CreditPackage> {
        self.with_status(PackageStatus::Reserved)
    }

    /// Terminal packages: expired or rejected
    pub fn historical(&self) -> Vec<&CreditPackage> {
        self.packages
            .values()
            .filter(|p| matches!(p.status, PackageStatus::Expired | PackageStatus::Rejected))
            .collect()
    }

    /// Active packages whose expiry date has passed
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<&CreditPackage> {
        self.packages
            .values()
            .filter(|p| p.status == PackageStatus::Active && p.is_expired(now))
            .collect()
    }

    /// Packages usable for a booking right now
    pub fn valid_packages(&self, now: DateTime<Utc>) -> Vec<&CreditPackage> {
        self.packages.values().filter(|p| p.is_valid(now)).collect()
    }

    /// Ids of packages currently in RESERVED status
    pub fn reserved_ids(&self) -> Vec<Uuid> {
        self.pending().iter().map(|p| p.id).collect()
    }

    /// Total credits bookable right now. Reserved packages contribute
    /// nothing; an unlimited package dominates the sum.
    pub fn bookable_credits(&self, now: DateTime<Utc>) -> CreditBalance {
        let valid = self.valid_packages(now);
        if valid.iter().any(|p| p.unlimited) {
            return CreditBalance::Unlimited;
        }
        CreditBalance::Credits(valid.iter().map(|p| p.credits_remaining).sum())
    }

    /// Client-side placeholder for the server's package choice, used only
    /// for display until the confirmation reports the real pick.
    pub fn earliest_expiring_valid(&self, now: DateTime<Utc>) -> Option<&CreditPackage> {
        self.valid_packages(now)
            .into_iter()
            .min_by_key(|p| p.expires_at)
    }

    /// Optimistically debit one credit from a named package
    pub fn debit(&mut self, package_id: &Uuid) -> Result<(), LedgerError> {
        let pkg = self
            .packages
            .get_mut(package_id)
            .ok_or_else(|| LedgerError::PackageNotFound(package_id.to_string()))?;
        pkg.debit()
            .map_err(|_| LedgerError::NoCreditsRemaining(package_id.to_string()))
    }

    /// Reverse an optimistic debit, or apply a confirmed refund
    pub fn credit_back(&mut self, package_id: &Uuid) -> Result<(), LedgerError> {
        let pkg = self
            .packages
            .get_mut(package_id)
            .ok_or_else(|| LedgerError::PackageNotFound(package_id.to_string()))?;
        pkg.credit_back();
        Ok(())
    }
}

impl CreditLedger {
    fn with_status(&self, status: PackageStatus) -> Vec<&CreditPackage> {
        self.packages
            .values()
            .filter(|p| p.status == status)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("No credits remaining on package: {0}")]
    NoCreditsRemaining(String),
}
