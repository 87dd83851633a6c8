use std::{collections::HashMap, sync::Arc};

use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::DayStore;
use crate::services::{calendar, trend};

/// (user, year, month)
type MonthKey = (Uuid, i32, u32);

#[derive(Default)]
struct CacheState {
    seeds: HashMap<MonthKey, f64>,
    /// Bumped by every invalidation of the key. A seed computed from a read
    /// that started under an older generation is not stored.
    generations: HashMap<MonthKey, u64>,
}

/// Memoized "last trend of month M" per user, used to seed the month after.
///
/// Entries only depend on the records of their own month, so writing a record
/// invalidates exactly one entry. In-memory state (for single-instance
/// deployments).
#[derive(Clone)]
pub struct TrendCache {
    state: Arc<Mutex<CacheState>>,
    max_lookback_months: u32,
}

impl TrendCache {
    pub fn new(max_lookback_months: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            max_lookback_months,
        }
    }

    /// Carry-forward seed for the month starting at `month_start`.
    ///
    /// Looks up the latest weighed record before the month and returns the
    /// last trend of that record's month, recomputed from scratch. Returns 0
    /// when there is no earlier weight or it lies beyond the lookback cap.
    pub async fn seed_for_month(
        &self,
        store: &dyn DayStore,
        user_id: Uuid,
        month_start: NaiveDate,
    ) -> Result<f64, sqlx::Error> {
        let Some(latest) = store.find_latest_weighed_before(user_id, month_start).await? else {
            return Ok(0.0);
        };

        let gap = calendar::months_between(latest.date, month_start);
        if gap > self.max_lookback_months as i32 {
            tracing::debug!(
                user_id = %user_id,
                month = %month_start.format("%Y-%m"),
                last_weighed = %latest.date,
                gap_months = gap,
                "Carry-forward beyond lookback cap, seeding from zero"
            );
            return Ok(0.0);
        }

        let key = (user_id, latest.date.year(), latest.date.month());
        let generation = {
            let state = self.state.lock().await;
            if let Some(seed) = state.seeds.get(&key).copied() {
                return Ok(seed);
            }
            state.generations.get(&key).copied().unwrap_or(0)
        };

        let records = store.list_month(user_id, key.1, key.2).await?;
        let seed = trend::last_trend(&records);

        let mut state = self.state.lock().await;
        let current = state.generations.get(&key).copied().unwrap_or(0);
        if current == generation {
            state.seeds.insert(key, seed);
        }
        drop(state);

        tracing::debug!(
            user_id = %user_id,
            month = %month_start.format("%Y-%m"),
            source_month = %latest.date.format("%Y-%m"),
            seed = seed,
            stored = current == generation,
            "Computed carry-forward seed"
        );

        Ok(seed)
    }

    /// Drop the cached trend of the month containing `date`. Seeds still being
    /// computed for that month from earlier reads will not be stored.
    pub async fn invalidate(&self, user_id: Uuid, date: NaiveDate) {
        let key = (user_id, date.year(), date.month());
        let mut state = self.state.lock().await;
        state.seeds.remove(&key);
        *state.generations.entry(key).or_insert(0) += 1;
    }
}
