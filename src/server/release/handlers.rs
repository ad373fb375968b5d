use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{GlobalStateResponse, PilotStatesRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn get_global_state(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let enabled = state.checker.is_feature_globally_enabled(&name)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(GlobalStateResponse {
        name,
        enabled,
    })))
}

pub async fn get_pilot_states(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PilotStatesRequest>,
) -> impl IntoResponse {
    if req.pilot_id.is_empty() {
        return Err(ApiError::bad_request("pilot_id is required"));
    }

    let states = state
        .checker
        .get_pilot_flag_states(&req.pilot_id, &req.release_flags)
        .await?;

    Ok(Json(ApiResponse::success(states)))
}
