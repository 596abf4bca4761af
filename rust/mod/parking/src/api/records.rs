use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use straffic_core::{ListParams, format_display};

use super::{AppState, blocking, query_params};
use crate::error::ParkingError;
use crate::tariff::parse_client_time;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/count", get(count_records))
}

#[derive(Deserialize)]
struct CountQuery {
    start: String,
    end: String,
}

async fn list_records(
    State(svc): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ParkingError> {
    let params = query_params(query)?;
    let page = blocking(move || svc.records(&params)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "items": page.items,
        "total": page.total,
    })))
}

async fn count_records(
    State(svc): State<AppState>,
    query: Result<Query<CountQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ParkingError> {
    let q = query_params(query)?;
    let start = parse_client_time(&q.start)?;
    let end = parse_client_time(&q.end)?;
    let count = blocking(move || svc.count_entries_between(start, end)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "start": format_display(&start),
        "end": format_display(&end),
        "count": count,
    })))
}
