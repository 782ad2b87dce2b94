//! In-memory coupon store
//!
//! Useful for embedding the engine without a database and for exercising
//! concurrent redemptions in tests. One mutex guards both the coupons and
//! the usage log, so `redeem` checks the limit, appends and increments
//! without any other caller observing the steps in between.

use std::sync::Arc;

use async_trait::async_trait;
use coupons::prelude::{Coupon, CouponCode, CouponUuid, UsageRecord};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::domain::coupons::{
    StoreError,
    store::{CouponLookup, CouponStore},
};

#[derive(Debug, Default)]
struct State {
    coupons: FxHashMap<CouponUuid, Coupon>,
    usages: Vec<UsageRecord>,
}

impl State {
    fn by_code(&self, code: &CouponCode) -> Option<&Coupon> {
        self.coupons.values().find(|coupon| coupon.code == *code)
    }

    fn increment(&mut self, uuid: CouponUuid) -> Result<u64, StoreError> {
        let coupon = self.coupons.get_mut(&uuid).ok_or(StoreError::NotFound)?;

        if coupon.is_exhausted() {
            return Err(StoreError::Rejected);
        }

        coupon.current_usage = coupon.current_usage.saturating_add(1);

        Ok(coupon.current_usage)
    }
}

/// Coupon lookup and store held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryCouponStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a coupon.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if another coupon already uses
    /// the same code.
    pub fn insert(&self, coupon: Coupon) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        if state
            .by_code(&coupon.code)
            .is_some_and(|existing| existing.uuid != coupon.uuid)
        {
            return Err(StoreError::AlreadyExists);
        }

        state.coupons.insert(coupon.uuid, coupon);

        Ok(())
    }

    /// Remove a coupon, leaving its usage records in place.
    pub fn remove(&self, uuid: CouponUuid) -> Option<Coupon> {
        self.state.lock().coupons.remove(&uuid)
    }

    /// Current snapshot of a coupon.
    #[must_use]
    pub fn coupon(&self, uuid: CouponUuid) -> Option<Coupon> {
        self.state.lock().coupons.get(&uuid).cloned()
    }
}

#[async_trait]
impl CouponLookup for InMemoryCouponStore {
    async fn find_active_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Ok(self
            .state
            .lock()
            .by_code(code)
            .filter(|coupon| coupon.is_active)
            .cloned())
    }

    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Ok(self.state.lock().by_code(code).cloned())
    }
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn increment_usage(&self, coupon: CouponUuid) -> Result<u64, StoreError> {
        self.state.lock().increment(coupon)
    }

    async fn record_usage(&self, record: &UsageRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        if !state.coupons.contains_key(&record.coupon) {
            return Err(StoreError::NotFound);
        }

        state.usages.push(record.clone());

        Ok(())
    }

    async fn redeem(&self, record: &UsageRecord) -> Result<u64, StoreError> {
        let mut state = self.state.lock();

        let usage = state.increment(record.coupon)?;

        state.usages.push(record.clone());

        Ok(usage)
    }

    async fn usage_records(&self, coupon: CouponUuid) -> Result<Vec<UsageRecord>, StoreError> {
        let state = self.state.lock();

        let mut records: Vec<_> = state
            .usages
            .iter()
            .filter(|record| record.coupon == coupon)
            .cloned()
            .collect();

        records.sort_by_key(|record| record.used_at);

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use coupons::prelude::{CouponDiscount, UsageRecordUuid};
    use jiff::Timestamp;
    use rust_decimal::dec;
    use testresult::TestResult;

    use super::*;

    fn coupon(code: &str, usage_limit: Option<u64>) -> TestResult<Coupon> {
        Ok(Coupon {
            uuid: CouponUuid::new(),
            code: CouponCode::parse(code)?,
            description: String::new(),
            discount: CouponDiscount::FixedAmountOff(dec!(10)),
            expires_at: None,
            allow_stacking: true,
            usage_limit,
            current_usage: 0,
            is_active: true,
            created_by: String::from("tests"),
            created_at: Timestamp::UNIX_EPOCH,
        })
    }

    fn record(coupon: CouponUuid) -> UsageRecord {
        UsageRecord {
            uuid: UsageRecordUuid::new(),
            coupon,
            used_at: Timestamp::now(),
            order_amount: dec!(100),
            discount_amount: dec!(10),
            final_amount: dec!(90),
        }
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_and_skips_inactive() -> TestResult {
        let store = InMemoryCouponStore::new();
        let mut inactive = coupon("OFF", None)?;
        inactive.is_active = false;

        store.insert(coupon("SUMMER30", None)?)?;
        store.insert(inactive)?;

        let found = store
            .find_active_by_code(&CouponCode::parse("summer30")?)
            .await?;

        assert!(found.is_some(), "expected SUMMER30 to resolve");
        assert!(
            store
                .find_active_by_code(&CouponCode::parse("off")?)
                .await?
                .is_none(),
            "inactive coupons must not resolve"
        );
        assert!(
            store
                .find_by_code(&CouponCode::parse("off")?)
                .await?
                .is_some(),
            "reports still see inactive coupons"
        );

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_codes_are_rejected() -> TestResult {
        let store = InMemoryCouponStore::new();

        store.insert(coupon("DUP", None)?)?;

        assert!(matches!(
            store.insert(coupon("dup", None)?),
            Err(StoreError::AlreadyExists)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn increment_stops_at_limit_without_mutating() -> TestResult {
        let store = InMemoryCouponStore::new();
        let limited = coupon("LIMITED", Some(2))?;
        let uuid = limited.uuid;

        store.insert(limited)?;

        assert_eq!(store.increment_usage(uuid).await?, 1);
        assert_eq!(store.increment_usage(uuid).await?, 2);
        assert!(matches!(
            store.increment_usage(uuid).await,
            Err(StoreError::Rejected)
        ));

        assert_eq!(store.coupon(uuid).map(|c| c.current_usage), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn rejected_redemption_leaves_no_record() -> TestResult {
        let store = InMemoryCouponStore::new();
        let limited = coupon("ONCE", Some(1))?;
        let uuid = limited.uuid;

        store.insert(limited)?;

        assert_eq!(store.redeem(&record(uuid)).await?, 1);
        assert!(matches!(
            store.redeem(&record(uuid)).await,
            Err(StoreError::Rejected)
        ));

        assert_eq!(store.usage_records(uuid).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn removed_coupon_keeps_its_usage_records() -> TestResult {
        let store = InMemoryCouponStore::new();
        let gone = coupon("GONE", None)?;
        let uuid = gone.uuid;

        store.insert(gone)?;
        store.redeem(&record(uuid)).await?;

        assert_eq!(store.remove(uuid).map(|c| c.current_usage), Some(1));
        assert!(store.coupon(uuid).is_none());
        assert!(store.find_by_code(&CouponCode::parse("gone")?).await?.is_none());
        assert_eq!(store.usage_records(uuid).await?.len(), 1);
        assert!(matches!(
            store.redeem(&record(uuid)).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_coupon_is_not_found() {
        let store = InMemoryCouponStore::new();
        let uuid = CouponUuid::new();

        assert!(matches!(
            store.increment_usage(uuid).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.record_usage(&record(uuid)).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.redeem(&record(uuid)).await,
            Err(StoreError::NotFound)
        ));
    }
}
