//! `PostgreSQL` coupon store

use async_trait::async_trait;
use coupons::prelude::{Coupon, CouponCode, CouponUuid, UsageRecord};
use tracing::{debug, warn};

use crate::{
    database::Db,
    domain::coupons::{
        StoreError,
        data::NewCoupon,
        repositories::{coupons::PgCouponsRepository, usages::PgUsagesRepository},
        store::{CouponLookup, CouponStore},
    },
};

/// Coupon lookup and store backed by `PostgreSQL`.
///
/// The usage limit is enforced by a conditional `UPDATE`, so concurrent
/// redemptions of the same coupon serialise on its row and the loser sees
/// [`StoreError::Rejected`].
#[derive(Debug, Clone)]
pub struct PgCouponStore {
    db: Db,
    coupons: PgCouponsRepository,
    usages: PgUsagesRepository,
}

impl PgCouponStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            coupons: PgCouponsRepository::new(),
            usages: PgUsagesRepository::new(),
        }
    }

    /// Insert a new coupon.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] if the code is taken (case-insensitively).
    /// - [`StoreError::Corrupt`] if the coupon fails its own invariants.
    /// - [`StoreError::InvalidData`] if a database constraint rejects it.
    #[tracing::instrument(
        name = "coupons.store.create_coupon",
        skip(self, coupon),
        fields(coupon_uuid = %coupon.uuid, coupon_code = %coupon.code),
        err
    )]
    pub async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StoreError> {
        coupon.check()?;

        let mut tx = self.db.begin().await?;

        let created = self.coupons.create_coupon(&mut tx, coupon).await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Increment inside `tx`, telling a refused increment apart from a
    /// missing coupon.
    async fn increment_in(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        coupon: CouponUuid,
    ) -> Result<u64, StoreError> {
        if let Some(usage) = self.coupons.increment_usage(tx, coupon).await? {
            return Ok(usage);
        }

        if self.coupons.exists(tx, coupon).await? {
            warn!(coupon_uuid = %coupon, "usage increment rejected by limit");

            Err(StoreError::Rejected)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl CouponLookup for PgCouponStore {
    async fn find_active_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        let mut tx = self.db.begin().await?;

        let coupon = self.coupons.find_active_by_code(&mut tx, code).await?;

        tx.commit().await?;

        Ok(coupon)
    }

    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        let mut tx = self.db.begin().await?;

        let coupon = self.coupons.find_by_code(&mut tx, code).await?;

        tx.commit().await?;

        Ok(coupon)
    }
}

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn increment_usage(&self, coupon: CouponUuid) -> Result<u64, StoreError> {
        let mut tx = self.db.begin().await?;

        let usage = self.increment_in(&mut tx, coupon).await?;

        tx.commit().await?;

        Ok(usage)
    }

    async fn record_usage(&self, record: &UsageRecord) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        self.usages.create_usage_record(&mut tx, record).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn redeem(&self, record: &UsageRecord) -> Result<u64, StoreError> {
        let mut tx = self.db.begin().await?;

        self.usages.create_usage_record(&mut tx, record).await?;

        // Dropping `tx` on a refused increment rolls the record back.
        let usage = self.increment_in(&mut tx, record.coupon).await?;

        tx.commit().await?;

        debug!(coupon_uuid = %record.coupon, usage, "redeemed coupon");

        Ok(usage)
    }

    async fn usage_records(&self, coupon: CouponUuid) -> Result<Vec<UsageRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let records = self.usages.list_usage_records(&mut tx, coupon).await?;

        tx.commit().await?;

        Ok(records)
    }
}
