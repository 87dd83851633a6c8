//! # WeightArc — Request/Response DTOs
//!
//! API contract types for the dashboard endpoints.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Query`    → deserialized from query params
//! - `*Response` → serialized to client JSON
//! - Validation is expressed via `validator` derive macros

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::models::day::{DailyRecord, DayChange, DayField};
use crate::services::summary::SummaryStats;
use crate::services::window::{ChartData, DayView, Window};

/// Largest weight the `NUMERIC(5,2)` column holds.
const MAX_WEIGHT: f64 = 999.99;
const MAX_EFFORT_LEVEL: i64 = 99;
const MAX_NOTES_CHARS: usize = 5000;

// ============================================================================
// Queries
// ============================================================================

/// GET /api/dashboard
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    /// `YYYY-MM`. Default: the current month.
    pub month: Option<String>,
}

/// GET /api/dashboard/range
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// ============================================================================
// Dashboard responses
// ============================================================================

/// Month calendar with navigation to the neighbouring months.
#[derive(Debug, Serialize)]
pub struct MonthWindowResponse {
    pub days: Vec<DayView>,
    pub chart: ChartData,
    /// e.g. "February 2025"
    pub current_month_name: String,
    pub prev_month: String,
    pub next_month: String,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub days: Vec<DayView>,
    pub chart: ChartData,
}

impl From<Window> for WindowResponse {
    fn from(window: Window) -> Self {
        Self {
            days: window.days,
            chart: window.chart,
        }
    }
}

/// GET /api/dashboard/summary
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub days: Vec<DayView>,
    pub chart: ChartData,
    pub stats: SummaryStats,
}

// ============================================================================
// Day updates
// ============================================================================

/// POST /api/dashboard/update-day — single-field upsert.
///
/// A null `value` clears the field.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_update_day"))]
pub struct UpdateDayRequest {
    pub date: NaiveDate,
    pub field: DayField,
    #[serde(default)]
    pub value: Value,
}

impl UpdateDayRequest {
    /// Parse `value` into a typed change for `field`.
    pub fn change(&self) -> Result<DayChange, ValidationError> {
        match self.field {
            DayField::Weight => parse_weight(&self.value).map(DayChange::Weight),
            DayField::EffortLevel => parse_effort_level(&self.value).map(DayChange::EffortLevel),
            DayField::Notes => parse_notes(&self.value).map(DayChange::Notes),
        }
    }
}

fn validate_update_day(req: &UpdateDayRequest) -> Result<(), ValidationError> {
    req.change().map(|_| ())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn parse_weight(value: &Value) -> Result<Option<f64>, ValidationError> {
    let weight = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    match weight {
        Some(w) if w.is_finite() && w > 0.0 && w <= MAX_WEIGHT => Ok(Some(w)),
        _ => Err(invalid("weight", "Weight must be a number between 0 and 999.99")),
    }
}

fn parse_effort_level(value: &Value) -> Result<Option<i32>, ValidationError> {
    let level = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    match level {
        Some(l) if (0..=MAX_EFFORT_LEVEL).contains(&l) => Ok(Some(l as i32)),
        _ => Err(invalid("effort_level", "Effort level must be an integer between 0 and 99")),
    }
}

fn parse_notes(value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.chars().count() <= MAX_NOTES_CHARS => Ok(Some(s.clone())),
        Value::String(_) => Err(invalid("notes", "Notes must be under 5000 characters")),
        _ => Err(invalid("notes", "Notes must be text")),
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateDayResponse {
    pub success: bool,
    pub day: DailyRecord,
}

/// GET /api/days/:date — the stored fields of one day, empty when nothing
/// has been logged.
#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub effort_level: Option<i32>,
    pub notes: Option<String>,
    pub is_logged: bool,
}

impl DayResponse {
    pub fn new(date: NaiveDate, record: Option<DailyRecord>) -> Self {
        match record {
            Some(r) => Self {
                date,
                is_logged: r.has_logged_field(),
                weight: r.weight,
                effort_level: r.effort_level,
                notes: r.notes,
            },
            None => Self {
                date,
                weight: None,
                effort_level: None,
                notes: None,
                is_logged: false,
            },
        }
    }
}
