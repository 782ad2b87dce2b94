//! Coupons Repository

use coupons::prelude::{Coupon, CouponCode, CouponDiscount, CouponUuid, DiscountKind};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::coupons::{StoreError, data::NewCoupon};

const FIND_ACTIVE_COUPON_BY_CODE_SQL: &str = include_str!("sql/find_active_coupon_by_code.sql");
const FIND_COUPON_BY_CODE_SQL: &str = include_str!("sql/find_coupon_by_code.sql");
const CREATE_COUPON_SQL: &str = include_str!("sql/create_coupon.sql");
const INCREMENT_COUPON_USAGE_SQL: &str = include_str!("sql/increment_coupon_usage.sql");
const COUPON_EXISTS_SQL: &str = include_str!("sql/coupon_exists.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_active_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &CouponCode,
    ) -> Result<Option<Coupon>, StoreError> {
        let row = query_as::<Postgres, CouponRow>(FIND_ACTIVE_COUPON_BY_CODE_SQL)
            .bind(code.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    pub(crate) async fn find_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &CouponCode,
    ) -> Result<Option<Coupon>, StoreError> {
        let row = query_as::<Postgres, CouponRow>(FIND_COUPON_BY_CODE_SQL)
            .bind(code.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: NewCoupon,
    ) -> Result<Coupon, StoreError> {
        let usage_limit = coupon
            .usage_limit
            .map(i64::try_from)
            .transpose()
            .map_err(|_overflow| StoreError::InvalidData)?;

        let created_at: SqlxTimestamp = query_scalar(CREATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(coupon.code.as_str())
            .bind(&coupon.description)
            .bind(coupon.discount.kind().to_str())
            .bind(coupon.discount.value())
            .bind(coupon.expires_at.map(SqlxTimestamp::from))
            .bind(coupon.allow_stacking)
            .bind(usage_limit)
            .bind(coupon.is_active)
            .bind(&coupon.created_by)
            .fetch_one(&mut **tx)
            .await?;

        Ok(coupon.into_coupon(created_at.to_jiff()))
    }

    /// Conditionally increment usage; `None` when the limit refused it or
    /// the coupon does not exist.
    pub(crate) async fn increment_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<Option<u64>, StoreError> {
        let usage: Option<i64> = query_scalar(INCREMENT_COUPON_USAGE_SQL)
            .bind(coupon.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        usage
            .map(|usage| u64::try_from(usage).map_err(|_negative| StoreError::InvalidData))
            .transpose()
    }

    pub(crate) async fn exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<bool, StoreError> {
        let exists: bool = query_scalar(COUPON_EXISTS_SQL)
            .bind(coupon.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(exists)
    }
}

/// Raw `coupons` row, before the coupon invariants are re-checked.
#[derive(Debug)]
struct CouponRow {
    uuid: Uuid,
    code: String,
    description: String,
    discount_kind: String,
    discount_value: Decimal,
    expires_at: Option<SqlxTimestamp>,
    allow_stacking: bool,
    usage_limit: Option<i64>,
    current_usage: i64,
    is_active: bool,
    created_by: String,
    created_at: SqlxTimestamp,
}

impl<'r> FromRow<'r, PgRow> for CouponRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            code: row.try_get("code")?,
            description: row.try_get("description")?,
            discount_kind: row.try_get("discount_kind")?,
            discount_value: row.try_get("discount_value")?,
            expires_at: row.try_get("expires_at")?,
            allow_stacking: row.try_get("allow_stacking")?,
            usage_limit: row.try_get("usage_limit")?,
            current_usage: row.try_get("current_usage")?,
            is_active: row.try_get("is_active")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let kind = match row.discount_kind.as_str() {
            "percentage" => DiscountKind::Percentage,
            "fixed" => DiscountKind::Fixed,
            _ => return Err(StoreError::InvalidData),
        };

        let usage_limit = row
            .usage_limit
            .map(u64::try_from)
            .transpose()
            .map_err(|_negative| StoreError::InvalidData)?;

        let current_usage =
            u64::try_from(row.current_usage).map_err(|_negative| StoreError::InvalidData)?;

        Ok(Self {
            uuid: CouponUuid::from_uuid(row.uuid),
            code: CouponCode::parse(&row.code)?,
            description: row.description,
            discount: CouponDiscount::from_parts(kind, row.discount_value)?,
            expires_at: row.expires_at.map(SqlxTimestamp::to_jiff),
            allow_stacking: row.allow_stacking,
            usage_limit,
            current_usage,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at.to_jiff(),
        })
    }
}
