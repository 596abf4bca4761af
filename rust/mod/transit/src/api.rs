use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::TransitError;
use crate::model::{RouteRequest, SearchMode};
use crate::service::TransitService;

type AppState = Arc<TransitService>;

/// Build the transit router.
///
/// Routes (relative to `/api`), all answering 200 with either the upstream
/// JSON or `{"error": ...}`:
/// - `POST /route/search`: combined path search
/// - `POST /route/subway`: subway-only path search
/// - `POST /route/bus`: bus-only path search
/// - `GET  /bus/detail`: `?busID=`
/// - `GET  /bus/station/realtime`: `?stationID=`
/// - `GET  /subway/realtime`: `?stationName=`
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/route/search", post(search_all))
        .route("/route/subway", post(search_subway))
        .route("/route/bus", post(search_bus))
        .route("/bus/detail", get(bus_detail))
        .route("/bus/station/realtime", get(bus_station_realtime))
        .route("/subway/realtime", get(subway_realtime))
        .with_state(service)
}

#[derive(Deserialize)]
struct BusQuery {
    #[serde(rename = "busID")]
    bus_id: Option<String>,
}

#[derive(Deserialize)]
struct StationQuery {
    #[serde(rename = "stationID")]
    station_id: Option<String>,
}

#[derive(Deserialize)]
struct SubwayQuery {
    #[serde(rename = "stationName")]
    station_name: Option<String>,
}

fn render(result: Result<Value, TransitError>) -> Json<Value> {
    Json(result.unwrap_or_else(|e| json!({ "error": e.to_string() })))
}

// ---------------------------------------------------------------------------
// Path search
// ---------------------------------------------------------------------------

async fn search(
    svc: &TransitService,
    body: Result<Json<RouteRequest>, JsonRejection>,
    mode: SearchMode,
) -> Result<Value, TransitError> {
    let Json(req) = body.map_err(|e| TransitError::InvalidRequest(e.body_text()))?;
    svc.search_route(&req, mode).await
}

async fn search_all(
    State(svc): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Json<Value> {
    match search(&svc, body, SearchMode::All).await {
        Ok(v) => Json(v),
        Err(e) => Json(json!({ "error": e.to_string(), "status": "failed" })),
    }
}

async fn search_subway(
    State(svc): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Json<Value> {
    render(search(&svc, body, SearchMode::Subway).await)
}

async fn search_bus(
    State(svc): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Json<Value> {
    render(search(&svc, body, SearchMode::Bus).await)
}

// ---------------------------------------------------------------------------
// Realtime lookups
// ---------------------------------------------------------------------------

async fn bus_detail(State(svc): State<AppState>, Query(q): Query<BusQuery>) -> Json<Value> {
    render(svc.bus_detail(q.bus_id.as_deref().unwrap_or_default()).await)
}

async fn bus_station_realtime(
    State(svc): State<AppState>,
    Query(q): Query<StationQuery>,
) -> Json<Value> {
    render(
        svc.bus_station_realtime(q.station_id.as_deref().unwrap_or_default())
            .await,
    )
}

async fn subway_realtime(
    State(svc): State<AppState>,
    Query(q): Query<SubwayQuery>,
) -> Json<Value> {
    render(svc.subway_realtime(q.station_name.as_deref().unwrap_or_default()).await)
}
