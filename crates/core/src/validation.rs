//! Coupon validation and discount planning.
//!
//! Everything here is pure: given the coupons a batch of codes resolved to,
//! the order amount and the validation instant, [`plan_discounts`] either
//! rejects the combination or returns a [`ValidationPlan`]. Calling it twice
//! with the same inputs yields equal plans.

use std::cmp::Ordering;

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::coupons::{Coupon, CouponCode, CouponUuid, DiscountKind};

/// Number of coupons a plan holds inline before spilling to the heap.
pub const INLINE_COUPONS: usize = 3;

/// Reasons a coupon batch is rejected before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// At least one code did not resolve to an active coupon.
    #[error("one or more coupon codes are invalid")]
    InvalidCode,

    /// The coupon's expiry is in the past.
    #[error("coupon {0} has expired")]
    Expired(CouponCode),

    /// The coupon has no applications left.
    #[error("coupon {0} has reached its usage limit")]
    UsageLimitReached(CouponCode),

    /// The coupon cannot be combined with other coupons.
    #[error("coupon {0} cannot be combined with other coupons")]
    NotStackable(CouponCode),

    /// The order amount must be strictly positive.
    #[error("order amount must be positive, got {0}")]
    InvalidOrderAmount(Decimal),

    /// No codes were submitted.
    #[error("no coupon codes were submitted")]
    NoCodes,

    /// More codes were submitted than a single order may carry.
    #[error("at most {max} coupon codes may be applied to an order")]
    TooManyCodes {
        /// Configured maximum.
        max: usize,
    },

    /// Discount arithmetic left the representable decimal range.
    #[error("discount calculation overflowed")]
    AmountOutOfRange,
}

/// One coupon's share of a plan, in applied order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDiscount {
    /// Coupon being applied.
    pub coupon: CouponUuid,

    /// Normalised code, kept for error reporting.
    pub code: CouponCode,

    /// Kind of discount the coupon grants.
    pub kind: DiscountKind,

    /// Amount this coupon takes off the order.
    pub amount: Decimal,
}

/// The ordered discount breakdown for a validated batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPlan {
    order_amount: Decimal,
    discounts: SmallVec<[PlannedDiscount; INLINE_COUPONS]>,
    total_discount: Decimal,
    final_amount: Decimal,
}

impl ValidationPlan {
    /// Order amount the plan was computed against.
    #[must_use]
    pub const fn order_amount(&self) -> Decimal {
        self.order_amount
    }

    /// Per-coupon discounts in the order they were applied.
    #[must_use]
    pub fn discounts(&self) -> &[PlannedDiscount] {
        &self.discounts
    }

    /// Sum of all per-coupon discounts.
    #[must_use]
    pub const fn total_discount(&self) -> Decimal {
        self.total_discount
    }

    /// Order amount after discounts, never negative.
    #[must_use]
    pub const fn final_amount(&self) -> Decimal {
        self.final_amount
    }
}

/// Normalise submitted codes and check the batch size.
///
/// Duplicates are kept: each one is a separate lookup.
///
/// # Errors
///
/// - [`ValidationError::NoCodes`] when `raw` is empty.
/// - [`ValidationError::TooManyCodes`] when `raw` holds more than `max_codes`.
/// - [`ValidationError::InvalidCode`] when a code is blank.
pub fn normalise_codes<S: AsRef<str>>(
    raw: &[S],
    max_codes: usize,
) -> Result<SmallVec<[CouponCode; INLINE_COUPONS]>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::NoCodes);
    }

    if raw.len() > max_codes {
        return Err(ValidationError::TooManyCodes { max: max_codes });
    }

    raw.iter()
        .map(|code| CouponCode::parse(code.as_ref()).map_err(|_error| ValidationError::InvalidCode))
        .collect()
}

/// Check a resolved coupon batch and compute its discount plan.
///
/// `coupons` must be in resolution order (the order the codes were
/// submitted); rejections name the first offending coupon in that order.
/// Percentage coupons are applied before fixed ones, larger values first,
/// so the result does not depend on submission order.
///
/// # Errors
///
/// Returns the first failing check: order amount, expiry, usage limit,
/// then stacking.
pub fn plan_discounts(
    coupons: &[Coupon],
    order_amount: Decimal,
    now: Timestamp,
) -> Result<ValidationPlan, ValidationError> {
    if order_amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidOrderAmount(order_amount));
    }

    if coupons.is_empty() {
        return Err(ValidationError::NoCodes);
    }

    if let Some(expired) = coupons.iter().find(|coupon| coupon.is_expired_at(now)) {
        return Err(ValidationError::Expired(expired.code.clone()));
    }

    if let Some(exhausted) = coupons.iter().find(|coupon| coupon.is_exhausted()) {
        return Err(ValidationError::UsageLimitReached(exhausted.code.clone()));
    }

    if coupons.len() > 1
        && let Some(exclusive) = coupons.iter().find(|coupon| !coupon.allow_stacking)
    {
        return Err(ValidationError::NotStackable(exclusive.code.clone()));
    }

    let mut ordered: SmallVec<[&Coupon; INLINE_COUPONS]> = coupons.iter().collect();

    ordered.sort_by(|a, b| application_order(a, b));

    let mut remaining = order_amount;
    let mut total_discount = Decimal::ZERO;
    let mut discounts = SmallVec::with_capacity(ordered.len());

    for coupon in ordered {
        let amount = coupon
            .discount
            .amount_off(remaining)
            .ok_or(ValidationError::AmountOutOfRange)?;

        total_discount = total_discount
            .checked_add(amount)
            .ok_or(ValidationError::AmountOutOfRange)?;

        remaining = (remaining - amount).max(Decimal::ZERO);

        discounts.push(PlannedDiscount {
            coupon: coupon.uuid,
            code: coupon.code.clone(),
            kind: coupon.discount.kind(),
            amount,
        });
    }

    let final_amount = (order_amount - total_discount).max(Decimal::ZERO);

    Ok(ValidationPlan {
        order_amount,
        discounts,
        total_discount,
        final_amount,
    })
}

/// Percentage before fixed, then descending value; code and id break ties.
fn application_order(a: &Coupon, b: &Coupon) -> Ordering {
    a.discount
        .kind()
        .cmp(&b.discount.kind())
        .then_with(|| b.discount.value().cmp(&a.discount.value()))
        .then_with(|| a.code.cmp(&b.code))
        .then_with(|| a.uuid.cmp(&b.uuid))
}

#[cfg(test)]
mod tests {
    use jiff::ToSpan;
    use rust_decimal::dec;
    use testresult::TestResult;

    use crate::coupons::CouponDiscount;

    use super::*;

    fn now() -> Timestamp {
        Timestamp::from_second(1_750_000_000).unwrap_or(Timestamp::UNIX_EPOCH)
    }

    fn coupon(code: &str, discount: CouponDiscount, allow_stacking: bool) -> TestResult<Coupon> {
        Ok(Coupon {
            uuid: CouponUuid::new(),
            code: CouponCode::parse(code)?,
            description: String::new(),
            discount,
            expires_at: None,
            allow_stacking,
            usage_limit: None,
            current_usage: 0,
            is_active: true,
            created_by: String::from("tests"),
            created_at: Timestamp::UNIX_EPOCH,
        })
    }

    #[test]
    fn single_fixed_coupon_below_order_amount() -> TestResult {
        let fixed = coupon("FIXED20", CouponDiscount::FixedAmountOff(dec!(20)), false)?;

        let plan = plan_discounts(&[fixed], dec!(100), now())?;

        assert_eq!(plan.total_discount(), dec!(20));
        assert_eq!(plan.final_amount(), dec!(80));
        assert_eq!(plan.order_amount(), dec!(100));
        assert_eq!(plan.discounts().len(), 1);

        Ok(())
    }

    #[test]
    fn fixed_coupon_larger_than_order_is_clamped() -> TestResult {
        let fixed = coupon("BIG", CouponDiscount::FixedAmountOff(dec!(150)), true)?;

        let plan = plan_discounts(&[fixed], dec!(100), now())?;

        assert_eq!(plan.total_discount(), dec!(100));
        assert_eq!(plan.final_amount(), Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn percentage_applies_before_fixed_regardless_of_input_order() -> TestResult {
        let fixed = coupon("FIXED20", CouponDiscount::FixedAmountOff(dec!(20)), true)?;
        let summer = coupon("SUMMER30", CouponDiscount::PercentageOff(dec!(30)), true)?;

        let plan = plan_discounts(&[fixed.clone(), summer.clone()], dec!(100), now())?;

        assert_eq!(plan.total_discount(), dec!(50));
        assert_eq!(plan.final_amount(), dec!(50));

        let applied: Vec<_> = plan.discounts().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(applied, ["SUMMER30", "FIXED20"]);

        let amounts: Vec<_> = plan.discounts().iter().map(|d| d.amount).collect();
        assert_eq!(amounts, [dec!(30), dec!(20)]);

        let reversed = plan_discounts(&[summer, fixed], dec!(100), now())?;
        assert_eq!(plan, reversed);

        Ok(())
    }

    #[test]
    fn larger_percentages_apply_first() -> TestResult {
        let ten = coupon("TEN", CouponDiscount::PercentageOff(dec!(10)), true)?;
        let fifty = coupon("FIFTY", CouponDiscount::PercentageOff(dec!(50)), true)?;

        let plan = plan_discounts(&[ten, fifty], dec!(200), now())?;

        let amounts: Vec<_> = plan.discounts().iter().map(|d| d.amount).collect();

        // 50% of 200, then 10% of the remaining 100
        assert_eq!(amounts, [dec!(100), dec!(10)]);
        assert_eq!(plan.final_amount(), dec!(90));

        Ok(())
    }

    #[test]
    fn fixed_discounts_never_push_remaining_below_zero() -> TestResult {
        let a = coupon("A", CouponDiscount::FixedAmountOff(dec!(60)), true)?;
        let b = coupon("B", CouponDiscount::FixedAmountOff(dec!(50)), true)?;

        let plan = plan_discounts(&[b, a], dec!(100), now())?;

        let amounts: Vec<_> = plan.discounts().iter().map(|d| d.amount).collect();

        assert_eq!(amounts, [dec!(60), dec!(40)]);
        assert_eq!(plan.total_discount(), dec!(100));
        assert_eq!(plan.final_amount(), Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn equal_coupons_are_ordered_by_code() -> TestResult {
        let b = coupon("BETA", CouponDiscount::FixedAmountOff(dec!(5)), true)?;
        let a = coupon("ALPHA", CouponDiscount::FixedAmountOff(dec!(5)), true)?;

        let plan = plan_discounts(&[b, a], dec!(100), now())?;

        let applied: Vec<_> = plan.discounts().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(applied, ["ALPHA", "BETA"]);

        Ok(())
    }

    #[test]
    fn non_stackable_coupon_alone_succeeds() -> TestResult {
        let solo = coupon("SOLO", CouponDiscount::PercentageOff(dec!(10)), false)?;

        let plan = plan_discounts(&[solo], dec!(100), now())?;

        assert_eq!(plan.final_amount(), dec!(90));

        Ok(())
    }

    #[test]
    fn non_stackable_coupon_with_another_fails() -> TestResult {
        let stackable = coupon("STACK", CouponDiscount::PercentageOff(dec!(10)), true)?;
        let solo = coupon("SOLO", CouponDiscount::FixedAmountOff(dec!(5)), false)?;
        let other = coupon("OTHER", CouponDiscount::FixedAmountOff(dec!(5)), false)?;

        let result = plan_discounts(&[stackable, solo, other], dec!(100), now());

        assert_eq!(
            result,
            Err(ValidationError::NotStackable(CouponCode::parse("SOLO")?))
        );

        Ok(())
    }

    #[test]
    fn duplicated_non_stackable_coupon_conflicts_with_itself() -> TestResult {
        let solo = coupon("SOLO", CouponDiscount::PercentageOff(dec!(10)), false)?;

        let result = plan_discounts(&[solo.clone(), solo], dec!(100), now());

        assert_eq!(
            result,
            Err(ValidationError::NotStackable(CouponCode::parse("SOLO")?))
        );

        Ok(())
    }

    #[test]
    fn expired_coupon_is_rejected() -> TestResult {
        let mut expired = coupon("OLD", CouponDiscount::FixedAmountOff(dec!(5)), true)?;
        expired.expires_at = Some(now().checked_sub(1.hour())?);

        let result = plan_discounts(&[expired], dec!(100), now());

        assert_eq!(
            result,
            Err(ValidationError::Expired(CouponCode::parse("OLD")?))
        );

        Ok(())
    }

    #[test]
    fn coupon_expiring_later_is_accepted() -> TestResult {
        let mut fresh = coupon("FRESH", CouponDiscount::FixedAmountOff(dec!(5)), true)?;
        fresh.expires_at = Some(now().checked_add(1.hour())?);

        assert!(plan_discounts(&[fresh], dec!(100), now()).is_ok());

        Ok(())
    }

    #[test]
    fn expiry_is_checked_before_usage_and_stacking() -> TestResult {
        let mut exhausted = coupon("USED", CouponDiscount::FixedAmountOff(dec!(5)), false)?;
        exhausted.usage_limit = Some(1);
        exhausted.current_usage = 1;

        let mut expired = coupon("OLD", CouponDiscount::FixedAmountOff(dec!(5)), false)?;
        expired.expires_at = Some(now().checked_sub(1.second())?);

        let result = plan_discounts(&[exhausted, expired], dec!(100), now());

        assert_eq!(
            result,
            Err(ValidationError::Expired(CouponCode::parse("OLD")?))
        );

        Ok(())
    }

    #[test]
    fn exhausted_coupon_is_rejected() -> TestResult {
        let mut limited = coupon("LIMITED", CouponDiscount::FixedAmountOff(dec!(5)), true)?;
        limited.usage_limit = Some(3);
        limited.current_usage = 3;

        let result = plan_discounts(&[limited.clone()], dec!(100), now());

        assert_eq!(
            result,
            Err(ValidationError::UsageLimitReached(CouponCode::parse(
                "LIMITED"
            )?))
        );

        limited.current_usage = 2;
        assert!(plan_discounts(&[limited], dec!(100), now()).is_ok());

        Ok(())
    }

    #[test]
    fn non_positive_order_amount_is_rejected() -> TestResult {
        let fixed = coupon("FIXED", CouponDiscount::FixedAmountOff(dec!(5)), true)?;

        assert_eq!(
            plan_discounts(std::slice::from_ref(&fixed), Decimal::ZERO, now()),
            Err(ValidationError::InvalidOrderAmount(Decimal::ZERO))
        );
        assert_eq!(
            plan_discounts(&[fixed], dec!(-1), now()),
            Err(ValidationError::InvalidOrderAmount(dec!(-1)))
        );

        Ok(())
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(
            plan_discounts(&[], dec!(100), now()),
            Err(ValidationError::NoCodes)
        );
    }

    #[test]
    fn normalise_codes_keeps_duplicates() -> TestResult {
        let codes = normalise_codes(&["summer30", " SUMMER30 "], 3)?;

        assert_eq!(codes.len(), 2);
        assert_eq!(codes.first(), codes.get(1));

        Ok(())
    }

    #[test]
    fn normalise_codes_enforces_batch_bounds() {
        let empty: [&str; 0] = [];

        assert_eq!(normalise_codes(&empty, 3), Err(ValidationError::NoCodes));
        assert_eq!(
            normalise_codes(&["A", "B", "C", "D"], 3),
            Err(ValidationError::TooManyCodes { max: 3 })
        );
        assert_eq!(
            normalise_codes(&["A", "  "], 3),
            Err(ValidationError::InvalidCode)
        );
    }
}
