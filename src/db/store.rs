use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::day::{DailyRecord, DayChange};
use crate::services::calendar;

/// Per-user access to daily records. Every read is scoped to one user.
#[async_trait]
pub trait DayStore: Send + Sync + 'static {
    async fn get(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyRecord>, sqlx::Error>;

    /// Records of one calendar month, ordered by date.
    async fn list_month(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyRecord>, sqlx::Error>;

    /// Records in `[start, end]`, ordered by date.
    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, sqlx::Error>;

    /// Most recent record strictly before `date` whose weight is not null.
    async fn find_latest_weighed_before(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, sqlx::Error>;

    /// Dates up to and including `date` with any logged field, newest first.
    async fn logged_dates_through(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, sqlx::Error>;

    /// Insert or update a single field of the (user, date) record.
    async fn upsert_field(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        change: &DayChange,
    ) -> Result<DailyRecord, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}

const RECORD_COLUMNS: &str =
    "id, user_id, date, weight::float8 AS weight, effort_level, notes, created_at, updated_at";

pub struct PgDayStore {
    db: PgPool,
}

impl PgDayStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DayStore for PgDayStore {
    async fn get(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyRecord>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM days WHERE user_id = $1 AND date = $2"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await
    }

    async fn list_month(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyRecord>, sqlx::Error> {
        let Some((start, end)) = calendar::month_bounds(year, month) else {
            return Ok(Vec::new());
        };
        self.list_range(user_id, start, end).await
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM days
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
    }

    async fn find_latest_weighed_before(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM days
            WHERE user_id = $1 AND date < $2 AND weight IS NOT NULL
            ORDER BY date DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await
    }

    async fn logged_dates_through(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT date FROM days
            WHERE user_id = $1 AND date <= $2
              AND (weight IS NOT NULL
                   OR effort_level IS NOT NULL
                   OR NULLIF(BTRIM(notes), '') IS NOT NULL)
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await
    }

    async fn upsert_field(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        change: &DayChange,
    ) -> Result<DailyRecord, sqlx::Error> {
        let column = change.field().column();
        let value_expr = match change {
            DayChange::Weight(_) => "$4::numeric",
            DayChange::EffortLevel(_) | DayChange::Notes(_) => "$4",
        };
        // Only the named column is written; the rest of an existing row stays as is.
        let sql = format!(
            r#"
            INSERT INTO days (id, user_id, date, {column})
            VALUES ($1, $2, $3, {value_expr})
            ON CONFLICT (user_id, date) DO UPDATE SET
                {column} = EXCLUDED.{column},
                updated_at = NOW()
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let query = sqlx::query_as::<_, DailyRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(date);
        let query = match change {
            DayChange::Weight(w) => query.bind(*w),
            DayChange::EffortLevel(e) => query.bind(*e),
            DayChange::Notes(n) => query.bind(n.clone()),
        };

        query.fetch_one(&self.db).await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await
            .map(|_| ())
    }
}
