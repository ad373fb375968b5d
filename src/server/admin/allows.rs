use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::AllowIpRequest;
use crate::server::response::{ApiError, ApiResponse};

pub async fn create_allow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AllowIpRequest>,
) -> impl IntoResponse {
    let allow = state.manager.allow_ip_addr_for_flag(&id, &req.ip_addr)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(allow))))
}

pub async fn list_allows(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let allows = state.manager.list_allows_for_flag(&id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(allows)))
}
