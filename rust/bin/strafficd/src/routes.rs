//! Route registration: module routes plus system endpoints.

use axum::Router;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::routing::get;

use straffic_core::ServiceError;

/// Build the complete router: every module under `/api`, plus system
/// endpoints and a JSON 404 fallback.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut api = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    // Modules own their full sub-paths (`/parking/...`, `/route/...`),
    // so they merge rather than nest under their name.
    for (name, router) in module_routes {
        tracing::debug!(module = name, "mounting routes");
        api = api.merge(router);
    }

    Router::new().nest("/api", api).fallback(not_found)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "OK",
        "service": "S-MaaS",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "strafficd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found(uri: Uri) -> ServiceError {
    ServiceError::NotFound(format!("no route for {}", uri.path()))
}
