//! Weight trend smoothing.
//!
//! The trend is an exponential moving average that moves 10% of the way
//! toward each new weight sample:
//!
//! > trend = trend + (weight - trend) / 10
//!
//! Smoothing is scoped to one calendar month. A month starts either from a
//! carry-forward seed (the last trend of the previous month with data) or,
//! without one, from its own first valid weight. Days without a valid weight
//! leave the trend where it was.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::day::DailyRecord;

/// Share of the distance to each new sample the trend moves.
const SMOOTHING_DIVISOR: f64 = 10.0;

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_valid(weight: Option<f64>) -> Option<f64> {
    weight.filter(|w| *w > 0.0)
}

/// Smooth one month of weights, in date order.
///
/// Returns one entry per input position. Entries stay `None` when no seed was
/// carried forward and the month holds no valid weight. The running value
/// keeps full precision; only emitted values are rounded.
pub fn calculate_trend(weights: &[Option<f64>], carry_forward: f64) -> Vec<Option<f64>> {
    let mut trend = carry_forward;

    if trend == 0.0 {
        if let Some(first) = weights.iter().copied().find_map(is_valid) {
            trend = first;
        }
    }

    if trend <= 0.0 {
        return vec![None; weights.len()];
    }

    weights
        .iter()
        .map(|weight| {
            if let Some(w) = is_valid(*weight) {
                trend += (w - trend) / SMOOTHING_DIVISOR;
            }
            (trend > 0.0).then(|| round1(trend))
        })
        .collect()
}

/// Difference between a day's weight and its trend.
///
/// Without a valid weight the previous in-month variation is carried; with
/// neither, a known trend means "on trend" (zero).
pub fn calculate_variation(
    weight: Option<f64>,
    trend: Option<f64>,
    previous_variation: Option<f64>,
) -> Option<f64> {
    if let (Some(w), Some(t)) = (is_valid(weight), trend) {
        return Some(round1(w - t));
    }
    if previous_variation.is_some() {
        return previous_variation;
    }
    trend.map(|_| 0.0)
}

/// Trend of a month run from scratch, as used to seed the following month.
pub fn last_trend(records: &[DailyRecord]) -> f64 {
    let weights: Vec<Option<f64>> = records.iter().map(|r| r.weight).collect();
    calculate_trend(&weights, 0.0)
        .last()
        .copied()
        .flatten()
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub trend: Option<f64>,
    pub variation: Option<f64>,
}

/// Trend and variation for every record of one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthTrend {
    points: BTreeMap<NaiveDate, TrendPoint>,
}

impl MonthTrend {
    /// `records` must belong to a single month and be ordered by date.
    pub fn compute(records: &[DailyRecord], seed: f64) -> Self {
        let weights: Vec<Option<f64>> = records.iter().map(|r| r.weight).collect();
        let trends = calculate_trend(&weights, seed);

        let mut points = BTreeMap::new();
        // Variation of the latest earlier day that had a valid weight.
        let mut last_weighed_variation: Option<f64> = None;

        for ((record, weight), trend) in records.iter().zip(weights).zip(trends) {
            let variation = calculate_variation(weight, trend, last_weighed_variation);
            if is_valid(weight).is_some() {
                last_weighed_variation = calculate_variation(weight, trend, None);
            }
            points.insert(
                record.date,
                TrendPoint {
                    date: record.date,
                    trend,
                    variation,
                },
            );
        }

        Self { points }
    }

    pub fn point(&self, date: NaiveDate) -> Option<&TrendPoint> {
        self.points.get(&date)
    }
}
