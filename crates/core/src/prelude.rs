//! Coupons prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    coupons::{Coupon, CouponCode, CouponDiscount, CouponError, CouponUuid, DiscountKind},
    usage::{UsageRecord, UsageRecordUuid, UsageSummary},
    uuids::TypedUuid,
    validation::{
        PlannedDiscount, ValidationError, ValidationPlan, normalise_codes, plan_discounts,
    },
};
