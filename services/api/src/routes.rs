use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::{json, Value};
use smp_review::workflows::review::{
    review_router, AuditSink, ReviewPortal, ReviewRepository, SettingsRepository, UserRepository,
};

use crate::infra::AppState;

pub(crate) fn with_portal_routes<U, R, S, A>(portal: ReviewPortal<U, R, S, A>) -> axum::Router
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    review_router(portal)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

/// Liveness endpoint. Carries the build version so a rollout is visible
/// from the check output alone.
pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness gate: false until the listener is bound and the account store
/// has been seeded.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> Response {
    if state.readiness.load(std::sync::atomic::Ordering::Acquire) {
        Json(json!({ "ready": true })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false })),
        )
            .into_response()
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
