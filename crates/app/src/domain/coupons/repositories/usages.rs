//! Coupon Usages Repository

use coupons::prelude::{CouponUuid, UsageRecord, UsageRecordUuid};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::coupons::StoreError;

const CREATE_USAGE_RECORD_SQL: &str = include_str!("sql/create_usage_record.sql");
const LIST_USAGE_RECORDS_SQL: &str = include_str!("sql/list_usage_records.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgUsagesRepository;

impl PgUsagesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_usage_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &UsageRecord,
    ) -> Result<(), StoreError> {
        query(CREATE_USAGE_RECORD_SQL)
            .bind(record.uuid.into_uuid())
            .bind(record.coupon.into_uuid())
            .bind(SqlxTimestamp::from(record.used_at))
            .bind(record.order_amount)
            .bind(record.discount_amount)
            .bind(record.final_amount)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn list_usage_records(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        let rows = query_as::<Postgres, UsageRow>(LIST_USAGE_RECORDS_SQL)
            .bind(coupon.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}

struct UsageRow(UsageRecord);

impl<'r> FromRow<'r, PgRow> for UsageRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(UsageRecord {
            uuid: UsageRecordUuid::from_uuid(row.try_get("uuid")?),
            coupon: CouponUuid::from_uuid(row.try_get("coupon_uuid")?),
            used_at: row.try_get::<SqlxTimestamp, _>("used_at")?.to_jiff(),
            order_amount: row.try_get("order_amount")?,
            discount_amount: row.try_get("discount_amount")?,
            final_amount: row.try_get("final_amount")?,
        }))
    }
}
