use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::SetEnrollmentRequest;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_pilots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let pilots = state.manager.list_pilots_for_feature(&id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(pilots)))
}

pub async fn set_enrollment(
    State(state): State<Arc<AppState>>,
    Path((id, external_id)): Path<(String, String)>,
    Json(req): Json<SetEnrollmentRequest>,
) -> impl IntoResponse {
    let pilot = state
        .manager
        .set_pilot_enrollment_for_feature(&id, &external_id, req.enrolled)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(pilot)))
}

pub async fn unset_enrollment(
    State(state): State<Arc<AppState>>,
    Path((id, external_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state
        .manager
        .unset_pilot_enrollment_for_feature(&id, &external_id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
