//! Coupons

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::uuids::TypedUuid;

/// Coupon UUID
pub type CouponUuid = TypedUuid<Coupon>;

/// Errors raised while constructing coupon values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// The code was empty once surrounding whitespace was removed.
    #[error("coupon code cannot be empty")]
    EmptyCode,

    /// Discount values must be strictly positive.
    #[error("discount value must be positive, got {0}")]
    NonPositiveValue(Decimal),

    /// Percentage discounts cannot exceed 100.
    #[error("percentage discount must be at most 100, got {0}")]
    PercentageOutOfRange(Decimal),

    /// Usage limits, when present, must be at least one.
    #[error("usage limit must be positive")]
    ZeroUsageLimit,
}

/// A case-normalised coupon code.
///
/// Codes are trimmed and ASCII upper-cased on construction, so two codes
/// compare equal exactly when a case-insensitive lookup would match them.
/// Non-ASCII letters are kept as submitted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalise a raw, user-submitted code.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::EmptyCode`] when nothing but whitespace was given.
    pub fn parse(raw: &str) -> Result<Self, CouponError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(CouponError::EmptyCode);
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalised code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CouponCode {
    type Err = CouponError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CouponCode> for String {
    fn from(value: CouponCode) -> Self {
        value.0
    }
}

/// Discount kind, used for ordering and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage of the remaining order amount.
    Percentage,

    /// Fixed amount off the remaining order amount.
    Fixed,
}

impl DiscountKind {
    /// Stable storage name.
    #[must_use]
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Coupon discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// Take this percentage (0, 100] off the remaining amount.
    PercentageOff(Decimal),

    /// Take this amount off the remaining amount, clamped at zero.
    FixedAmountOff(Decimal),
}

impl CouponDiscount {
    /// Build a percentage discount.
    ///
    /// # Errors
    ///
    /// Returns an error when `percentage` is not in `(0, 100]`.
    pub fn percentage_off(percentage: Decimal) -> Result<Self, CouponError> {
        if percentage <= Decimal::ZERO {
            return Err(CouponError::NonPositiveValue(percentage));
        }

        if percentage > Decimal::ONE_HUNDRED {
            return Err(CouponError::PercentageOutOfRange(percentage));
        }

        Ok(Self::PercentageOff(percentage))
    }

    /// Build a fixed amount discount.
    ///
    /// # Errors
    ///
    /// Returns an error when `amount` is zero or negative.
    pub fn fixed_amount_off(amount: Decimal) -> Result<Self, CouponError> {
        if amount <= Decimal::ZERO {
            return Err(CouponError::NonPositiveValue(amount));
        }

        Ok(Self::FixedAmountOff(amount))
    }

    /// Build a discount from its persisted kind and value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is out of range for the kind.
    pub fn from_parts(kind: DiscountKind, value: Decimal) -> Result<Self, CouponError> {
        match kind {
            DiscountKind::Percentage => Self::percentage_off(value),
            DiscountKind::Fixed => Self::fixed_amount_off(value),
        }
    }

    /// Discount kind.
    #[must_use]
    pub const fn kind(&self) -> DiscountKind {
        match self {
            Self::PercentageOff(_) => DiscountKind::Percentage,
            Self::FixedAmountOff(_) => DiscountKind::Fixed,
        }
    }

    /// Raw discount value: a percentage or an amount depending on kind.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::PercentageOff(value) | Self::FixedAmountOff(value) => *value,
        }
    }

    /// Discount this coupon takes off `remaining`.
    ///
    /// Never more than `remaining`. Returns `None` only if the arithmetic
    /// overflows.
    #[must_use]
    pub fn amount_off(&self, remaining: Decimal) -> Option<Decimal> {
        match self {
            Self::PercentageOff(percentage) => remaining
                .checked_mul(percentage.checked_div(Decimal::ONE_HUNDRED)?)
                .map(|amount| amount.min(remaining)),
            Self::FixedAmountOff(amount) => Some((*amount).min(remaining)),
        }
    }
}

/// Coupon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Stable identifier.
    pub uuid: CouponUuid,

    /// Unique, normalised code.
    pub code: CouponCode,

    /// Free-text description shown to administrators.
    pub description: String,

    /// What the coupon takes off an order.
    pub discount: CouponDiscount,

    /// Instant after which the coupon no longer validates; `None` never expires.
    pub expires_at: Option<Timestamp>,

    /// Whether the coupon may be combined with others.
    pub allow_stacking: bool,

    /// Maximum number of applications; `None` is unlimited.
    pub usage_limit: Option<u64>,

    /// Number of successful applications so far.
    pub current_usage: u64,

    /// Inactive coupons are invisible to validation.
    pub is_active: bool,

    /// Author of the coupon.
    pub created_by: String,

    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl Coupon {
    /// Whether the coupon's expiry is strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Whether the usage limit, if any, has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.current_usage >= limit)
    }
}
