use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::services::trend::round1;
use crate::services::window::ChartData;

/// 30 days expressed in weeks.
const WEEKS_PER_THIRTY_DAYS: f64 = 4.286;

/// Trailing window the summary is computed over, including today.
pub const SUMMARY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub current_weight: Option<f64>,
    pub current_trend: Option<f64>,
    pub current_variation: Option<f64>,
    pub thirty_day_change: Option<f64>,
    pub weekly_average: Option<f64>,
    pub total_days_logged: usize,
    pub tracking_streak: u32,
}

impl SummaryStats {
    pub fn from_chart(chart: &ChartData, tracking_streak: u32) -> Self {
        let current_weight = last_present(&chart.weights);
        let current_trend = last_present(&chart.trends);
        let current_variation = match (current_weight, current_trend) {
            (Some(w), Some(t)) => Some(round1(w - t)),
            _ => None,
        };

        let thirty_day_change = thirty_day_change(&chart.trends);
        let weekly_average = thirty_day_change.map(|c| round1(c / WEEKS_PER_THIRTY_DAYS));

        Self {
            current_weight,
            current_trend,
            current_variation,
            thirty_day_change,
            weekly_average,
            total_days_logged: chart.weights.iter().filter(|w| w.is_some()).count(),
            tracking_streak,
        }
    }
}

/// First day of the summary window ending on `today`.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(SUMMARY_WINDOW_DAYS - 1)
}

fn last_present(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().find_map(|v| *v)
}

/// Change between the positional first and last trend entries.
///
/// Null endpoints are not skipped: a window that opens on a day without a
/// trend has no change.
fn thirty_day_change(trends: &[Option<f64>]) -> Option<f64> {
    match (trends.first(), trends.last()) {
        (Some(Some(first)), Some(Some(last))) => Some(round1(last - first)),
        _ => None,
    }
}

/// Consecutive days with any logged field, ending today.
///
/// `logged_dates` must be newest first. If today has nothing logged yet the
/// streak may still end yesterday.
pub fn tracking_streak(logged_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut dates = logged_dates.iter().copied().skip_while(|d| *d > today).peekable();

    let mut expected = today;
    if dates.peek() != Some(&today) {
        expected = today - Duration::days(1);
    }

    let mut streak = 0;
    for date in dates {
        if date == expected {
            streak += 1;
            expected -= Duration::days(1);
        } else if date < expected {
            break;
        }
    }
    streak
}
