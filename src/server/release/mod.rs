mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn release_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/flags/{name}/global", get(handlers::get_global_state))
        .route("/pilot/states", post(handlers::get_pilot_states))
}
