use serde_json::Value;
use tracing::{info, warn};

use crate::client::TransitClient;
use crate::error::TransitError;
use crate::model::{RouteRequest, SearchMode, normalize_station_name};

/// Validates lookups, normalizes inputs and forwards them upstream.
pub struct TransitService {
    client: TransitClient,
}

impl TransitService {
    pub fn new(client: TransitClient) -> Self {
        Self { client }
    }

    pub async fn search_route(
        &self,
        req: &RouteRequest,
        mode: SearchMode,
    ) -> Result<Value, TransitError> {
        let coords = req.coordinates()?;
        info!(
            mode = mode.as_str(),
            start = req.start_name.as_deref().unwrap_or(""),
            end = req.end_name.as_deref().unwrap_or(""),
            "route search"
        );
        self.client
            .search_path(coords, mode)
            .await
            .inspect_err(|e| warn!(mode = mode.as_str(), error = %e, "route search failed"))
    }

    pub async fn bus_detail(&self, bus_id: &str) -> Result<Value, TransitError> {
        let bus_id = required(bus_id, "busID")?;
        self.client
            .bus_lane_detail(bus_id)
            .await
            .inspect_err(|e| warn!(bus_id, error = %e, "bus lane lookup failed"))
    }

    pub async fn bus_station_realtime(&self, station_id: &str) -> Result<Value, TransitError> {
        let station_id = required(station_id, "stationID")?;
        self.client
            .bus_station_realtime(station_id)
            .await
            .inspect_err(|e| warn!(station_id, error = %e, "bus arrival lookup failed"))
    }

    pub async fn subway_realtime(&self, station_name: &str) -> Result<Value, TransitError> {
        let name = normalize_station_name(required(station_name, "stationName")?);
        if name.is_empty() {
            return Err(TransitError::InvalidRequest("stationName is required".into()));
        }
        info!(station = name, "subway arrivals");
        self.client
            .subway_realtime(name)
            .await
            .inspect_err(|e| warn!(station = name, error = %e, "subway arrival lookup failed"))
    }
}

fn required<'a>(value: &'a str, name: &str) -> Result<&'a str, TransitError> {
    match value.trim() {
        "" => Err(TransitError::InvalidRequest(format!("{name} is required"))),
        v => Ok(v),
    }
}
