//! Coupons Data

use coupons::prelude::{Coupon, CouponCode, CouponDiscount, CouponError, CouponUuid};
use jiff::Timestamp;

/// New Coupon Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: CouponCode,
    pub description: String,
    pub discount: CouponDiscount,
    pub expires_at: Option<Timestamp>,
    pub allow_stacking: bool,
    pub usage_limit: Option<u64>,
    pub is_active: bool,
    pub created_by: String,
}

impl NewCoupon {
    /// Check the invariants the discount and code types can't express.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::ZeroUsageLimit`] for a usage limit of zero.
    pub fn check(&self) -> Result<(), CouponError> {
        if self.usage_limit == Some(0) {
            return Err(CouponError::ZeroUsageLimit);
        }

        Ok(())
    }

    /// The coupon as it looks right after creation.
    #[must_use]
    pub fn into_coupon(self, created_at: Timestamp) -> Coupon {
        Coupon {
            uuid: self.uuid,
            code: self.code,
            description: self.description,
            discount: self.discount,
            expires_at: self.expires_at,
            allow_stacking: self.allow_stacking,
            usage_limit: self.usage_limit,
            current_usage: 0,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at,
        }
    }
}
