mod allows;
mod flags;
mod pilots;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Flag routes
        .route("/flags", post(flags::create_flag))
        .route("/flags", get(flags::list_flags))
        .route("/flags/{id}", put(flags::update_flag))
        .route("/flags/{id}", get(flags::get_flag).delete(flags::delete_flag))
        // Pilot routes
        .route("/flags/{id}/pilots", get(pilots::list_pilots))
        .route(
            "/flags/{id}/pilots/{external_id}",
            put(pilots::set_enrollment).delete(pilots::unset_enrollment),
        )
        // Allow-list routes
        .route("/flags/{id}/allows", post(allows::create_allow))
        .route("/flags/{id}/allows", get(allows::list_allows))
}
