//! Coupon collaborators.
//!
//! The service never touches storage directly: it resolves codes through a
//! [`CouponLookup`] and commits usage through a [`CouponStore`]. The store is
//! where the usage limit is actually enforced, so implementations must make
//! the increment conditional and atomic.

use async_trait::async_trait;
use coupons::prelude::{Coupon, CouponCode, CouponUuid, UsageRecord};
use mockall::automock;

use crate::domain::coupons::StoreError;

#[automock]
#[async_trait]
pub trait CouponLookup: Send + Sync {
    /// Find an active coupon by code, case-insensitively.
    async fn find_active_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;

    /// Find a coupon by code whether or not it is active.
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
}

#[automock]
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Increment the coupon's usage by one and return the new count.
    ///
    /// Succeeds only if the coupon has no usage limit or its usage was below
    /// the limit; otherwise fails with [`StoreError::Rejected`] and changes
    /// nothing.
    async fn increment_usage(&self, coupon: CouponUuid) -> Result<u64, StoreError>;

    /// Append a usage record.
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), StoreError>;

    /// Append `record` and then increment its coupon's usage, as one unit.
    ///
    /// If the increment is rejected the record must not persist.
    async fn redeem(&self, record: &UsageRecord) -> Result<u64, StoreError>;

    /// All usage records for a coupon, oldest first.
    async fn usage_records(&self, coupon: CouponUuid) -> Result<Vec<UsageRecord>, StoreError>;
}
