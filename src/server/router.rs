use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::release::release_router;
use crate::config::DecisionConfig;
use crate::error::Result;
use crate::rollout::{FlagChecker, RolloutManager};
use crate::store::Store;

pub struct AppState {
    pub manager: RolloutManager,
    pub checker: FlagChecker,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, decision: &DecisionConfig) -> Result<Self> {
        Ok(Self {
            manager: RolloutManager::new(store.clone()),
            checker: FlagChecker::with_config(store, decision)?,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/release", release_router())
        .nest("/api/v1/admin", admin_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
