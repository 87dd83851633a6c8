use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DayStore;
use crate::models::day::DailyRecord;
use crate::services::calendar;
use crate::services::trend::{round1, MonthTrend, TrendPoint};
use crate::services::trend_cache::TrendCache;

/// Longest explicit range a single request may assemble.
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("end_date {end} is before start_date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("range {start}..{end} exceeds {} days", MAX_RANGE_DAYS)]
    RangeTooLong { start: NaiveDate, end: NaiveDate },

    #[error("{year}-{month:02} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Dates to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpec {
    Month { year: i32, month: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

impl WindowSpec {
    pub fn month_of(date: NaiveDate) -> Self {
        WindowSpec::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Inclusive first and last date of the window.
    pub fn bounds(&self) -> Result<(NaiveDate, NaiveDate), WindowError> {
        match *self {
            WindowSpec::Month { year, month } => calendar::month_bounds(year, month)
                .ok_or(WindowError::InvalidMonth { year, month }),
            WindowSpec::Range { start, end } => {
                if end < start {
                    return Err(WindowError::EndBeforeStart { start, end });
                }
                if (end - start).num_days() >= MAX_RANGE_DAYS {
                    return Err(WindowError::RangeTooLong { start, end });
                }
                Ok((start, end))
            }
        }
    }
}

/// One calendar cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub day: u32,
    pub name: String,
    pub date: NaiveDate,
    pub weight: Option<String>,
    pub trend: Option<f64>,
    pub variation: Option<f64>,
    pub effort_level: Option<i32>,
    pub notes: Option<String>,
    pub is_editable: bool,
}

impl DayView {
    fn new(
        date: NaiveDate,
        record: Option<&DailyRecord>,
        point: Option<TrendPoint>,
        is_future: bool,
    ) -> Self {
        Self {
            day: date.day(),
            name: display_name(date),
            date,
            weight: record.and_then(|r| r.weight).map(format_weight),
            trend: point.and_then(|p| p.trend),
            variation: point.and_then(|p| p.variation),
            effort_level: record.and_then(|r| r.effort_level),
            notes: record.and_then(|r| r.notes.clone()),
            is_editable: !is_future,
        }
    }
}

/// Parallel series for the trend chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub weights: Vec<Option<f64>>,
    pub trends: Vec<Option<f64>>,
}

impl ChartData {
    fn from_days(days: &[DayView]) -> Self {
        let nonzero = |v: f64| (v != 0.0).then_some(v);
        Self {
            labels: days.iter().map(|d| d.day.to_string()).collect(),
            weights: days
                .iter()
                .map(|d| d.weight.as_deref().and_then(|w| w.parse().ok()).and_then(nonzero))
                .collect(),
            trends: days.iter().map(|d| d.trend.and_then(nonzero)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub days: Vec<DayView>,
    pub chart: ChartData,
}

/// Whole numbers print without decimals, everything else with one.
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        format!("{:.1}", round1(weight))
    }
}

/// `Mon, 1st` style label.
pub fn display_name(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}, {}{}", date.format("%a"), day, suffix)
}

/// Build the per-day views and chart series for `span`.
///
/// Days after `today` are never editable and never carry a trend. Days
/// without a record carry neither trend nor variation. Each month touched is
/// smoothed once, seeded from the month before it with data.
pub async fn assemble_window(
    store: &dyn DayStore,
    cache: &TrendCache,
    user_id: Uuid,
    span: WindowSpec,
    today: NaiveDate,
) -> Result<Window, WindowError> {
    let (start, end) = span.bounds()?;

    let records: BTreeMap<NaiveDate, DailyRecord> = store
        .list_range(user_id, start, end)
        .await?
        .into_iter()
        .map(|r| (r.date, r))
        .collect();

    let mut months: HashMap<(i32, u32), MonthTrend> = HashMap::new();
    let mut days = Vec::new();

    for date in start.iter_days().take_while(|d| *d <= end) {
        let record = records.get(&date);
        let is_future = date > today;

        let point = match record {
            Some(_) if !is_future => {
                let key = (date.year(), date.month());
                if !months.contains_key(&key) {
                    let month = month_trend(store, cache, user_id, date).await?;
                    months.insert(key, month);
                }
                months.get(&key).and_then(|m| m.point(date)).copied()
            }
            _ => None,
        };

        days.push(DayView::new(date, record, point, is_future));
    }

    let chart = ChartData::from_days(&days);

    tracing::debug!(
        user_id = %user_id,
        start = %start,
        end = %end,
        records = records.len(),
        months_smoothed = months.len(),
        "Assembled window"
    );

    Ok(Window { days, chart })
}

async fn month_trend(
    store: &dyn DayStore,
    cache: &TrendCache,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<MonthTrend, WindowError> {
    let seed = cache
        .seed_for_month(store, user_id, calendar::month_start(date))
        .await?;
    let records = store.list_month(user_id, date.year(), date.month()).await?;
    Ok(MonthTrend::compute(&records, seed))
}
