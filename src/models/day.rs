use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One logged day. Absent rows and rows with every optional field unset
/// mean the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub effort_level: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyRecord {
    /// Counts toward the tracking streak.
    pub fn has_logged_field(&self) -> bool {
        self.weight.is_some()
            || self.effort_level.is_some()
            || self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Apply a single-field change, leaving the other fields untouched.
    pub fn apply(&mut self, change: &DayChange) {
        match change {
            DayChange::Weight(w) => self.weight = *w,
            DayChange::EffortLevel(e) => self.effort_level = *e,
            DayChange::Notes(n) => self.notes = n.clone(),
        }
    }
}

/// Editable fields of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayField {
    Weight,
    #[serde(alias = "exercise_rung")]
    EffortLevel,
    Notes,
}

impl DayField {
    pub fn column(self) -> &'static str {
        match self {
            DayField::Weight => "weight",
            DayField::EffortLevel => "effort_level",
            DayField::Notes => "notes",
        }
    }
}

/// A parsed single-field write. `None` clears the field.
#[derive(Debug, Clone, PartialEq)]
pub enum DayChange {
    Weight(Option<f64>),
    EffortLevel(Option<i32>),
    Notes(Option<String>),
}

impl DayChange {
    pub fn field(&self) -> DayField {
        match self {
            DayChange::Weight(_) => DayField::Weight,
            DayChange::EffortLevel(_) => DayField::EffortLevel,
            DayChange::Notes(_) => DayField::Notes,
        }
    }
}
