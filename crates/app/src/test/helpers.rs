//! Test Helpers

use coupons::prelude::{Coupon, CouponCode, CouponDiscount, CouponUuid};

use crate::{
    domain::coupons::{StoreError, data::NewCoupon},
    test::TestContext,
};

/// A stackable, active, unlimited coupon with the given code.
pub(crate) fn new_coupon(code: &str, discount: CouponDiscount) -> NewCoupon {
    NewCoupon {
        uuid: CouponUuid::new(),
        code: CouponCode::parse(code).expect("test codes are non-empty"),
        description: format!("{code} test coupon"),
        discount,
        expires_at: None,
        allow_stacking: true,
        usage_limit: None,
        is_active: true,
        created_by: String::from("tests"),
    }
}

pub(crate) async fn create_coupon(
    ctx: &TestContext,
    coupon: NewCoupon,
) -> Result<Coupon, StoreError> {
    ctx.store.create_coupon(coupon).await
}

pub(crate) async fn current_usage(ctx: &TestContext, uuid: CouponUuid) -> i64 {
    sqlx::query_scalar("SELECT current_usage FROM coupons WHERE uuid = $1")
        .bind(uuid::Uuid::from(uuid))
        .fetch_one(&ctx.db.pool)
        .await
        .expect("coupon row should exist")
}

pub(crate) async fn usage_count(ctx: &TestContext, uuid: CouponUuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM coupon_usages WHERE coupon_uuid = $1")
        .bind(uuid::Uuid::from(uuid))
        .fetch_one(&ctx.db.pool)
        .await
        .expect("count query should succeed")
}
