use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension, Json,
};
use chrono::NaiveDate;

use crate::auth::middleware::AuthUser;
use crate::dto::DayResponse;
use crate::error::AppResult;
use crate::AppState;

pub async fn get_day(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> AppResult<Json<DayResponse>> {
    let Path(date) = date?;
    let record = state.store.get(auth_user.id, date).await?;
    Ok(Json(DayResponse::new(date, record)))
}
