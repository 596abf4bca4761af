use std::collections::BTreeMap;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use straffic_core::format_display;

use super::{AppState, blocking, json_body, string_or_number};
use crate::error::ParkingError;
use crate::model::ParkingSpot;
use crate::tariff::parse_client_time;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/entry", post(entry))
        .route("/exit", post(exit))
        .route("/calculate", post(calculate))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRequest {
    #[serde(default)]
    plate_number: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    spot_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExitRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    spot_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    #[serde(default)]
    entry_time: Option<String>,
    #[serde(default)]
    exit_time: Option<String>,
    #[serde(default)]
    car_type: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /parking/status
// ---------------------------------------------------------------------------

async fn status(State(svc): State<AppState>) -> Result<Json<serde_json::Value>, ParkingError> {
    let status = blocking(move || svc.status()).await?;
    let spots: BTreeMap<String, ParkingSpot> = status
        .spots
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "spots": spots,
        "statistics": status.statistics,
    })))
}

// ---------------------------------------------------------------------------
// POST /parking/entry
// ---------------------------------------------------------------------------

async fn entry(
    State(svc): State<AppState>,
    body: Result<Json<EntryRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ParkingError> {
    let req = json_body(body)?;
    let plate = req.plate_number.unwrap_or_default();
    let spot_id = req.spot_id.unwrap_or_default();

    let receipt = blocking(move || svc.entry(&spot_id, &plate)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("{} 구역에 입차 완료", receipt.spot.id),
        "spot": receipt.spot,
        "entryTime": format_display(&receipt.entry_time),
    })))
}

// ---------------------------------------------------------------------------
// POST /parking/exit
// ---------------------------------------------------------------------------

async fn exit(
    State(svc): State<AppState>,
    body: Result<Json<ExitRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ParkingError> {
    let req = json_body(body)?;
    let spot_id = req.spot_id.unwrap_or_default();

    let receipt = blocking(move || svc.exit(&spot_id)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "출차 완료",
        "plateNumber": receipt.plate_number,
        "duration": format!("{}분", receipt.duration_minutes),
        "fee": receipt.fee,
        "exitTime": format_display(&receipt.exit_time),
    })))
}

// ---------------------------------------------------------------------------
// POST /parking/calculate
// ---------------------------------------------------------------------------

async fn calculate(
    State(svc): State<AppState>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ParkingError> {
    let req = json_body(body)?;
    let entry = parse_client_time(req.entry_time.as_deref().unwrap_or_default())?;
    let exit = parse_client_time(req.exit_time.as_deref().unwrap_or_default())?;
    let quote = svc.quote(entry, exit, req.car_type.as_deref())?;

    let mut body = serde_json::to_value(&quote)
        .map_err(|e| ParkingError::Internal(format!("quote serialization failed: {e}")))?;
    body["success"] = serde_json::Value::Bool(true);
    Ok(Json(body))
}
