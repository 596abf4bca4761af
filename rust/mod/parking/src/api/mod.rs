mod lot;
mod records;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};

use crate::error::ParkingError;
use crate::service::ParkingLifecycleService;

/// Shared handler state.
pub type AppState = Arc<ParkingLifecycleService>;

/// Build the parking router.
///
/// Routes (relative to `/api`):
/// - `GET  /parking/status`: every spot + counts
/// - `POST /parking/entry`: park a vehicle
/// - `POST /parking/exit`: release a spot and bill it
/// - `POST /parking/calculate`: stepped-tariff quote
/// - `GET  /parking/records`: ledger, newest first
/// - `GET  /parking/records/count`: entries in `[start, end)`
pub fn router(service: AppState) -> Router {
    Router::new()
        .nest(
            "/parking",
            Router::new().merge(lot::routes()).merge(records::routes()),
        )
        .with_state(service)
}

/// Run a store-touching closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ParkingError>
where
    F: FnOnce() -> Result<T, ParkingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ParkingError::Internal(format!("storage worker failed: {e}")))?
}

/// Unwrap a JSON body, turning axum's rejection into the error envelope.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ParkingError> {
    body.map(|Json(v)| v)
        .map_err(|e| ParkingError::InvalidRequest(e.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ParkingError> {
    query
        .map(|Query(v)| v)
        .map_err(|e| ParkingError::InvalidRequest(e.body_text()))
}

/// Accept a JSON string or number as text; ids arrive both ways.
fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
