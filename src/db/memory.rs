//! In-memory `DayStore` used by unit and router tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::DayStore;
use crate::models::day::{DailyRecord, DayChange};
use crate::services::calendar;

#[derive(Clone, Default)]
pub struct InMemoryDayStore {
    records: Arc<Mutex<BTreeMap<(Uuid, NaiveDate), DailyRecord>>>,
    month_reads: Arc<AtomicUsize>,
}

impl InMemoryDayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a weight directly, bypassing validation.
    pub async fn put_weight(&self, user_id: Uuid, date: NaiveDate, weight: Option<f64>) {
        self.upsert_field(user_id, date, &DayChange::Weight(weight))
            .await
            .unwrap();
    }

    /// Number of `list_month` calls served so far.
    pub fn month_reads(&self) -> usize {
        self.month_reads.load(Ordering::SeqCst)
    }

    async fn collect(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyRecord> {
        let records = self.records.lock().await;
        records
            .range((user_id, start)..=(user_id, end))
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl DayStore for InMemoryDayStore {
    async fn get(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyRecord>, sqlx::Error> {
        Ok(self.records.lock().await.get(&(user_id, date)).cloned())
    }

    async fn list_month(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyRecord>, sqlx::Error> {
        self.month_reads.fetch_add(1, Ordering::SeqCst);
        let Some((start, end)) = calendar::month_bounds(year, month) else {
            return Ok(Vec::new());
        };
        Ok(self.collect(user_id, start, end).await)
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, sqlx::Error> {
        if end < start {
            return Ok(Vec::new());
        }
        Ok(self.collect(user_id, start, end).await)
    }

    async fn find_latest_weighed_before(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, sqlx::Error> {
        let records = self.records.lock().await;
        Ok(records
            .range((user_id, NaiveDate::MIN)..(user_id, date))
            .rev()
            .map(|(_, r)| r)
            .find(|r| r.weight.is_some())
            .cloned())
    }

    async fn logged_dates_through(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        let records = self.records.lock().await;
        Ok(records
            .range((user_id, NaiveDate::MIN)..=(user_id, date))
            .rev()
            .filter(|(_, r)| r.has_logged_field())
            .map(|((_, d), _)| *d)
            .collect())
    }

    async fn upsert_field(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        change: &DayChange,
    ) -> Result<DailyRecord, sqlx::Error> {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        let record = records.entry((user_id, date)).or_insert_with(|| DailyRecord {
            id: Uuid::new_v4(),
            user_id,
            date,
            weight: None,
            effort_level: None,
            notes: None,
            created_at: now,
            updated_at: now,
        });
        record.apply(change);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn upsert_touches_only_the_named_field() {
        let store = InMemoryDayStore::new();
        let user = Uuid::new_v4();
        let date = d(2025, 3, 4);

        store.put_weight(user, date, Some(180.4)).await;
        store
            .upsert_field(user, date, &DayChange::Notes(Some("long walk".into())))
            .await
            .unwrap();
        let record = store
            .upsert_field(user, date, &DayChange::EffortLevel(Some(3)))
            .await
            .unwrap();

        assert_eq!(record.weight, Some(180.4));
        assert_eq!(record.notes.as_deref(), Some("long walk"));
        assert_eq!(record.effort_level, Some(3));
    }

    #[tokio::test]
    async fn reads_are_scoped_to_one_user() {
        let store = InMemoryDayStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.put_weight(alice, d(2025, 1, 10), Some(150.0)).await;
        store.put_weight(bob, d(2025, 1, 20), Some(210.0)).await;

        let latest = store
            .find_latest_weighed_before(alice, d(2025, 2, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.date, d(2025, 1, 10));
        assert_eq!(store.list_month(bob, 2025, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_notes_are_not_a_logged_field() {
        let store = InMemoryDayStore::new();
        let user = Uuid::new_v4();

        store
            .upsert_field(user, d(2025, 1, 2), &DayChange::Notes(Some("   ".into())))
            .await
            .unwrap();
        store
            .upsert_field(user, d(2025, 1, 3), &DayChange::EffortLevel(Some(0)))
            .await
            .unwrap();

        let dates = store.logged_dates_through(user, d(2025, 1, 31)).await.unwrap();
        assert_eq!(dates, vec![d(2025, 1, 3)]);
    }
}
