//! Coupons store and service errors.

use coupons::prelude::{CouponCode, CouponError, PlannedDiscount, ValidationError};
use rust_decimal::Decimal;
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::coupons::service::AppliedCoupon;

/// Errors reported by coupon lookup and store collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional increment refused because the usage limit was reached.
    #[error("usage limit reached")]
    Rejected,

    /// The coupon does not exist, or vanished mid-operation.
    #[error("coupon not found")]
    NotFound,

    /// Another coupon already uses the code.
    #[error("coupon already exists")]
    AlreadyExists,

    /// A constraint or conversion rejected the values.
    #[error("invalid data")]
    InvalidData,

    /// A stored coupon no longer satisfies the coupon invariants.
    #[error("stored coupon is invalid")]
    Corrupt(#[source] CouponError),

    /// The round-trip did not finish within the engine's timeout.
    #[error("store round-trip timed out")]
    TimedOut,

    /// Any other database failure.
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::NotFound,
            Some(ErrorKind::NotNullViolation | ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<CouponError> for StoreError {
    fn from(error: CouponError) -> Self {
        Self::Corrupt(error)
    }
}

/// Errors returned by [`CouponsService`](crate::domain::coupons::CouponsService).
#[derive(Debug, Error)]
pub enum CouponsServiceError {
    /// The batch was rejected before anything was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store lost the race for the coupon's last application.
    #[error("coupon {0} has reached its usage limit")]
    UsageLimitReached(CouponCode),

    /// The coupon disappeared between validation and application.
    #[error("coupon {0} not found")]
    CouponNotFound(CouponCode),

    /// The plan was computed for a different order amount.
    #[error("plan was computed for an order of {planned}, not {requested}")]
    PlanMismatch {
        /// Amount the plan was validated against.
        planned: Decimal,

        /// Amount passed to `apply`.
        requested: Decimal,
    },

    /// A store round-trip exceeded the configured timeout.
    #[error("coupon store timed out")]
    Timeout,

    /// The store failed for a reason other than the coupon's state.
    #[error("coupon store unavailable")]
    StoreUnavailable(#[source] StoreError),

    /// Some coupons were committed before a later one failed. Committed
    /// coupons are not rolled back; retry only `unapplied`.
    #[error("applied {} coupon(s) before failing: {cause}", .applied.len())]
    PartialApplicationFailure {
        /// Coupons whose usage was recorded and counted.
        applied: Vec<AppliedCoupon>,

        /// Coupons that were not applied, starting with the one that failed.
        unapplied: Vec<PlannedDiscount>,

        /// Why the first unapplied coupon failed.
        #[source]
        cause: Box<CouponsServiceError>,
    },
}

impl CouponsServiceError {
    /// Map a store failure for `code` onto the service taxonomy.
    pub(crate) fn from_store(error: StoreError, code: &CouponCode) -> Self {
        match error {
            StoreError::Rejected => Self::UsageLimitReached(code.clone()),
            StoreError::NotFound => Self::CouponNotFound(code.clone()),
            StoreError::TimedOut => Self::Timeout,
            error => Self::StoreUnavailable(error),
        }
    }

    /// Whether the coupon had no applications left, whether that was seen
    /// during validation or when the store refused the increment.
    #[must_use]
    pub fn is_usage_limit_reached(&self) -> bool {
        matches!(
            self,
            Self::UsageLimitReached(_)
                | Self::Validation(ValidationError::UsageLimitReached(_))
        )
    }
}

impl From<StoreError> for CouponsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::TimedOut => Self::Timeout,
            error => Self::StoreUnavailable(error),
        }
    }
}
