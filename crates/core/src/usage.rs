//! Coupon usage records

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    coupons::CouponUuid,
    uuids::TypedUuid,
    validation::{PlannedDiscount, ValidationPlan},
};

/// Usage Record UUID
pub type UsageRecordUuid = TypedUuid<UsageRecord>;

/// One successful application of one coupon. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Record identifier.
    pub uuid: UsageRecordUuid,

    /// Coupon that was applied.
    pub coupon: CouponUuid,

    /// When the application was committed.
    pub used_at: Timestamp,

    /// Order amount before any discount.
    pub order_amount: Decimal,

    /// This coupon's share of the discount.
    pub discount_amount: Decimal,

    /// Order amount after every coupon in the batch.
    pub final_amount: Decimal,
}

impl UsageRecord {
    /// Build the record for one planned discount.
    #[must_use]
    pub fn for_discount(
        plan: &ValidationPlan,
        discount: &PlannedDiscount,
        used_at: Timestamp,
    ) -> Self {
        Self {
            uuid: UsageRecordUuid::new(),
            coupon: discount.coupon,
            used_at,
            order_amount: plan.order_amount(),
            discount_amount: discount.amount,
            final_amount: plan.final_amount(),
        }
    }
}

/// Aggregate usage of a single coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of recorded applications.
    pub total_uses: u64,

    /// Sum of discounts granted.
    pub total_discount: Decimal,

    /// Most recent application, if any.
    pub last_used_at: Option<Timestamp>,
}

impl UsageSummary {
    /// Fold a coupon's usage records into a summary.
    ///
    /// The discount total saturates at [`Decimal::MAX`].
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a UsageRecord>,
    {
        records.into_iter().fold(Self::default(), |mut summary, record| {
            summary.total_uses = summary.total_uses.saturating_add(1);
            summary.total_discount = summary.total_discount.saturating_add(record.discount_amount);
            summary.last_used_at = summary.last_used_at.max(Some(record.used_at));

            summary
        })
    }

    /// Mean discount per use, `None` when never used.
    #[must_use]
    pub fn average_discount(&self) -> Option<Decimal> {
        if self.total_uses == 0 {
            return None;
        }

        self.total_discount.checked_div(Decimal::from(self.total_uses))
    }
}
