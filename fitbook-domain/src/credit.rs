use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};

/// Credit package status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    /// Awaiting cash payment at the counter; holds zero usable credits
    Reserved,
    Active,
    Expired,
    Rejected,
}

/// A purchased or reserved bundle of class credits owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: Uuid,
    pub name: String,
    pub total_credits: u32,
    pub credits_remaining: u32,
    pub unlimited: bool,
    pub status: PackageStatus,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set while the package awaits payment confirmation
    pub reserved_at: Option<DateTime<Utc>>,
}

impl CreditPackage {
    pub fn new(name: impl Into<String>, total_credits: u32, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_credits,
            credits_remaining: total_credits,
            unlimited: false,
            status: PackageStatus::Active,
            purchased_at: Utc::now(),
            expires_at,
            reserved_at: None,
        }
    }

    /// Create a package held pending an offline cash payment
    pub fn new_reserved(
        name: impl Into<String>,
        total_credits: u32,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_credits,
            credits_remaining: total_credits,
            unlimited: false,
            status: PackageStatus::Reserved,
            purchased_at: now,
            expires_at,
            reserved_at: Some(now),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check if an unconfirmed reservation has outlived its window
    pub fn reservation_lapsed(&self, now: DateTime<Utc>, window_hours: i64) -> bool {
        match (self.status, self.reserved_at) {
            (PackageStatus::Reserved, Some(reserved_at)) => {
                now > reserved_at + Duration::hours(window_hours)
            }
            _ => false,
        }
    }

    /// A package is usable only when active, unexpired, and funded
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == PackageStatus::Active
            && !self.is_expired(now)
            && (self.unlimited || self.credits_remaining > 0)
    }

    /// Debit one credit. Fails rather than underflowing.
    pub fn debit(&mut self) -> Result<(), CreditError> {
        if self.unlimited {
            return Ok(());
        }
        if self.credits_remaining == 0 {
            return Err(CreditError::NoCreditsRemaining(self.id.to_string()));
        }
        self.credits_remaining -= 1;
        Ok(())
    }

    /// Return one credit, capped at the package total
    pub fn credit_back(&mut self) {
        if !self.unlimited && self.credits_remaining < self.total_credits {
            self.credits_remaining += 1;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    #[error("No credits remaining on package: {0}")]
    NoCreditsRemaining(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit_back() {
        let mut pkg = CreditPackage::new("10-class pass", 10, Utc::now() + Duration::days(90));
        pkg.debit().unwrap();
        assert_eq!(pkg.credits_remaining, 9);

        pkg.credit_back();
        assert_eq!(pkg.credits_remaining, 10);

        // Credit back never exceeds the total
        pkg.credit_back();
        assert_eq!(pkg.credits_remaining, 10);
    }

    #[test]
    fn test_debit_never_underflows() {
        let mut pkg = CreditPackage::new("single", 1, Utc::now() + Duration::days(30));
        pkg.debit().unwrap();
        assert!(pkg.debit().is_err());
        assert_eq!(pkg.credits_remaining, 0);
    }

    #[test]
    fn test_reserved_package_is_never_valid() {
        let pkg = CreditPackage::new_reserved("cash pack", 5, Utc::now() + Duration::days(90));
        assert_eq!(pkg.status, PackageStatus::Reserved);
        assert!(!pkg.is_valid(Utc::now()));
    }

    #[test]
    fn test_reservation_lapses_after_window() {
        let mut pkg = CreditPackage::new_reserved("cash pack", 5, Utc::now() + Duration::days(90));
        let now = Utc::now();
        assert!(!pkg.reservation_lapsed(now, 48));

        pkg.reserved_at = Some(now - Duration::hours(49));
        assert!(pkg.reservation_lapsed(now, 48));
    }

    #[test]
    fn test_unlimited_package() {
        let mut pkg = CreditPackage::new("monthly unlimited", 0, Utc::now() + Duration::days(30));
        pkg.unlimited = true;
        assert!(pkg.is_valid(Utc::now()));
        pkg.debit().unwrap();
        assert!(pkg.is_valid(Utc::now()));
    }
}
