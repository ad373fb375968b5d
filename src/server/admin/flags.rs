use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{CreateFlagRequest, UpdateFlagRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn create_flag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFlagRequest>,
) -> impl IntoResponse {
    let flag = state.manager.create_feature_flag(req.into())?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(flag))))
}

pub async fn list_flags(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let flags = state.manager.list_feature_flags()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(flags)))
}

pub async fn get_flag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let flag = state.manager.get_feature_flag(&id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(flag)))
}

pub async fn update_flag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFlagRequest>,
) -> impl IntoResponse {
    let mut flag = state.manager.get_feature_flag(&id)?;
    req.apply(&mut flag);
    let flag = state.manager.update_feature_flag(flag)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(flag)))
}

pub async fn delete_flag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.manager.delete_feature_flag(&id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
