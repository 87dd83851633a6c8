use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{
    MonthQuery, MonthWindowResponse, RangeQuery, SummaryResponse, UpdateDayRequest,
    UpdateDayResponse, WindowResponse,
};
use crate::error::{AppError, AppResult};
use crate::services::calendar;
use crate::services::summary::{self, SummaryStats};
use crate::services::window::{assemble_window, WindowSpec};
use crate::AppState;

pub async fn get_month(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> AppResult<Json<MonthWindowResponse>> {
    let Query(query) = query?;
    let today = Utc::now().date_naive();
    let month_start = match query.month.as_deref() {
        Some(month) => calendar::parse_year_month(month)
            .ok_or_else(|| AppError::Validation("month must be formatted as YYYY-MM".into()))?,
        None => calendar::month_start(today),
    };

    let prev_month = calendar::prev_month_start(month_start)
        .ok_or_else(|| anyhow::anyhow!("no month before {}", month_start))?;
    let next_month = calendar::next_month_start(month_start)
        .ok_or_else(|| anyhow::anyhow!("no month after {}", month_start))?;

    let window = assemble_window(
        state.store.as_ref(),
        &state.trend_cache,
        auth_user.id,
        WindowSpec::month_of(month_start),
        today,
    )
    .await?;

    Ok(Json(MonthWindowResponse {
        days: window.days,
        chart: window.chart,
        current_month_name: month_start.format("%B %Y").to_string(),
        prev_month: prev_month.format("%Y-%m").to_string(),
        next_month: next_month.format("%Y-%m").to_string(),
    }))
}

pub async fn get_range(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> AppResult<Json<WindowResponse>> {
    let Query(query) = query?;
    let window = assemble_window(
        state.store.as_ref(),
        &state.trend_cache,
        auth_user.id,
        WindowSpec::Range {
            start: query.start_date,
            end: query.end_date,
        },
        Utc::now().date_naive(),
    )
    .await?;

    Ok(Json(window.into()))
}

/// Trailing 30-day window with current values, change rates and streak.
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<SummaryResponse>> {
    let today = Utc::now().date_naive();

    let window = assemble_window(
        state.store.as_ref(),
        &state.trend_cache,
        auth_user.id,
        WindowSpec::Range {
            start: summary::window_start(today),
            end: today,
        },
        today,
    )
    .await?;

    let logged_dates = state
        .store
        .logged_dates_through(auth_user.id, today)
        .await?;
    let streak = summary::tracking_streak(&logged_dates, today);

    let stats = SummaryStats::from_chart(&window.chart, streak);

    Ok(Json(SummaryResponse {
        days: window.days,
        chart: window.chart,
        stats,
    }))
}

pub async fn update_day(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Result<Json<UpdateDayRequest>, JsonRejection>,
) -> AppResult<Json<UpdateDayResponse>> {
    let Json(body) = body?;
    body.validate()?;
    let change = body
        .change()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let today = Utc::now().date_naive();
    if body.date > today {
        return Err(AppError::Validation("Future days cannot be edited".into()));
    }

    let day = state
        .store
        .upsert_field(auth_user.id, body.date, &change)
        .await?;

    // The month's trend now differs, and so does the seed it hands on.
    state.trend_cache.invalidate(auth_user.id, body.date).await;

    tracing::info!(
        user_id = %auth_user.id,
        date = %body.date,
        field = body.field.column(),
        "Day updated"
    );

    Ok(Json(UpdateDayResponse { success: true, day }))
}
