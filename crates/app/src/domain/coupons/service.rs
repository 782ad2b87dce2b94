//! Coupons Service

use std::{fmt, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use coupons::prelude::{
    Coupon, CouponCode, CouponUuid, PlannedDiscount, UsageRecord, UsageSummary, ValidationError,
    ValidationPlan, normalise_codes, plan_discounts,
};
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;
use tokio::time::timeout;
use tracing::{Span, info, warn};

use crate::domain::coupons::{
    CouponsServiceError, StoreError,
    store::{CouponLookup, CouponStore},
};

/// Default cap on codes per order.
pub const DEFAULT_MAX_CODES: usize = 3;

/// Default bound on a single store round-trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Engine knobs supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum number of codes accepted in one batch.
    pub max_codes: usize,

    /// Bound on every lookup and store call.
    pub store_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_codes: DEFAULT_MAX_CODES,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// One coupon committed by [`CouponsService::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    /// Coupon that was applied.
    pub coupon: CouponUuid,

    /// Its normalised code.
    pub code: CouponCode,

    /// Discount granted by this coupon.
    pub amount: Decimal,

    /// Coupon usage count after this application.
    pub usage_count: u64,

    /// The usage record written for this application.
    pub record: UsageRecord,
}

/// Outcome of a fully applied plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationResult {
    /// Committed coupons, in plan order.
    pub applied: SmallVec<[AppliedCoupon; 3]>,

    /// Sum of all applied discounts.
    pub total_discount: Decimal,

    /// Order amount after every discount.
    pub final_amount: Decimal,
}

/// Validates coupon batches and applies validated plans.
///
/// Holds no mutable state of its own: the usage limit is enforced by the
/// store's conditional increment, so any number of engines may share one
/// store.
#[derive(Clone)]
pub struct CouponsEngine {
    lookup: Arc<dyn CouponLookup>,
    store: Arc<dyn CouponStore>,
    settings: EngineSettings,
}

impl fmt::Debug for CouponsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouponsEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CouponsEngine {
    #[must_use]
    pub fn new(
        lookup: Arc<dyn CouponLookup>,
        store: Arc<dyn CouponStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            lookup,
            store,
            settings,
        }
    }

    /// Run one store round-trip under the configured timeout.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        timeout(self.settings.store_timeout, operation)
            .await
            .map_err(|_elapsed| StoreError::TimedOut)?
    }

    async fn resolve(&self, code: &CouponCode) -> Result<Coupon, CouponsServiceError> {
        let coupon = self.bounded(self.lookup.find_active_by_code(code)).await?;

        match coupon {
            Some(coupon) if coupon.is_active && coupon.code == *code => Ok(coupon),
            _ => {
                warn!(coupon_code = %code, "coupon code did not resolve");

                Err(ValidationError::InvalidCode.into())
            }
        }
    }
}

#[async_trait]
impl CouponsService for CouponsEngine {
    #[tracing::instrument(
        name = "coupons.service.validate",
        skip(self, codes),
        fields(
            code_count = codes.len(),
            order_amount = %order_amount,
            total_discount = tracing::field::Empty,
            final_amount = tracing::field::Empty
        ),
        err
    )]
    async fn validate(
        &self,
        codes: &[String],
        order_amount: Decimal,
    ) -> Result<ValidationPlan, CouponsServiceError> {
        if order_amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidOrderAmount(order_amount).into());
        }

        let codes = normalise_codes(codes, self.settings.max_codes)?;

        let mut resolved: SmallVec<[Coupon; 3]> = SmallVec::with_capacity(codes.len());

        for code in &codes {
            resolved.push(self.resolve(code).await?);
        }

        let plan = plan_discounts(&resolved, order_amount, Timestamp::now())?;

        let span = Span::current();

        span.record(
            "total_discount",
            tracing::field::display(plan.total_discount()),
        );

        span.record("final_amount", tracing::field::display(plan.final_amount()));

        Ok(plan)
    }

    #[tracing::instrument(
        name = "coupons.service.apply",
        skip(self, plan),
        fields(
            order_amount = %order_amount,
            coupon_count = plan.discounts().len(),
            applied_count = tracing::field::Empty
        ),
        err
    )]
    async fn apply(
        &self,
        plan: &ValidationPlan,
        order_amount: Decimal,
    ) -> Result<ApplicationResult, CouponsServiceError> {
        if order_amount != plan.order_amount() {
            return Err(CouponsServiceError::PlanMismatch {
                planned: plan.order_amount(),
                requested: order_amount,
            });
        }

        let used_at = Timestamp::now();
        let span = Span::current();

        let mut applied: SmallVec<[AppliedCoupon; 3]> =
            SmallVec::with_capacity(plan.discounts().len());

        for (index, discount) in plan.discounts().iter().enumerate() {
            let record = UsageRecord::for_discount(plan, discount, used_at);

            match self.bounded(self.store.redeem(&record)).await {
                Ok(usage_count) => {
                    info!(
                        coupon_uuid = %discount.coupon,
                        coupon_code = %discount.code,
                        amount = %discount.amount,
                        usage_count,
                        "applied coupon"
                    );

                    applied.push(AppliedCoupon {
                        coupon: discount.coupon,
                        code: discount.code.clone(),
                        amount: discount.amount,
                        usage_count,
                        record,
                    });
                }
                Err(error) => {
                    span.record("applied_count", applied.len());

                    let cause = CouponsServiceError::from_store(error, &discount.code);

                    if applied.is_empty() {
                        return Err(cause);
                    }

                    let unapplied: Vec<PlannedDiscount> =
                        plan.discounts().iter().skip(index).cloned().collect();

                    warn!(
                        applied = applied.len(),
                        unapplied = unapplied.len(),
                        "coupon application partially failed"
                    );

                    return Err(CouponsServiceError::PartialApplicationFailure {
                        applied: applied.into_vec(),
                        unapplied,
                        cause: Box::new(cause),
                    });
                }
            }
        }

        span.record("applied_count", applied.len());

        Ok(ApplicationResult {
            applied,
            total_discount: plan.total_discount(),
            final_amount: plan.final_amount(),
        })
    }

    #[tracing::instrument(name = "coupons.service.usage_summary", skip(self), err)]
    async fn usage_summary(&self, code: &str) -> Result<UsageSummary, CouponsServiceError> {
        let code = CouponCode::parse(code).map_err(|_blank| ValidationError::InvalidCode)?;

        let coupon = self
            .bounded(self.lookup.find_by_code(&code))
            .await?
            .ok_or(CouponsServiceError::CouponNotFound(code))?;

        let records = self
            .bounded(self.store.usage_records(coupon.uuid))
            .await?;

        Ok(UsageSummary::from_records(&records))
    }
}

/// Coupon validation and application.
///
/// `apply` is best-effort, not atomic across coupons: each coupon is
/// committed on its own, in plan order, and a failure part-way through
/// reports [`CouponsServiceError::PartialApplicationFailure`] without rolling
/// back the coupons already committed. Retry only the unapplied remainder;
/// re-applying a committed coupon counts it again.
#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Resolve `codes` and compute the discount plan for `order_amount`.
    ///
    /// Has no side effects and may be called repeatedly, e.g. for previews.
    async fn validate(
        &self,
        codes: &[String],
        order_amount: Decimal,
    ) -> Result<ValidationPlan, CouponsServiceError>;

    /// Record and count each planned coupon's usage.
    ///
    /// `order_amount` must match the amount the plan was validated for.
    async fn apply(
        &self,
        plan: &ValidationPlan,
        order_amount: Decimal,
    ) -> Result<ApplicationResult, CouponsServiceError>;

    /// Aggregate usage of the coupon with `code`, active or not.
    async fn usage_summary(&self, code: &str) -> Result<UsageSummary, CouponsServiceError>;
}
