use axum::extract::State;
use axum::response::Json;

use eqlens_db::{AssessmentFilter, AssessmentStats};

use super::{internal, ApiError, AppState};

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<AssessmentStats>, ApiError> {
    let stats = state
        .db
        .assessments()
        .stats(&AssessmentFilter::default())
        .map_err(internal)?;

    Ok(Json(stats))
}
