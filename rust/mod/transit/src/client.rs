use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{ProviderConfig, TransitConfig};
use crate::error::TransitError;
use crate::model::{Coordinates, SearchMode};

const ODSAY: &str = "odsay";
const SEOUL: &str = "seoul";

/// Longest upstream error body kept in a [`TransitError::Upstream`].
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

struct Provider {
    base: Url,
    api_key: String,
}

impl Provider {
    fn new(name: &'static str, config: &ProviderConfig) -> Result<Self, TransitError> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| TransitError::Config(format!("{name}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(TransitError::Config(format!(
                "{name}: {} cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            base,
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base always has a hierarchical path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

// ---------------------------------------------------------------------------
// TransitClient
// ---------------------------------------------------------------------------

/// HTTP client for the ODsay and Seoul open-data APIs.
///
/// Every call returns the upstream JSON untouched.
pub struct TransitClient {
    http: reqwest::Client,
    odsay: Provider,
    seoul: Provider,
}

impl TransitClient {
    /// Build a client whose requests time out after `config.timeout_secs`.
    pub fn new(config: &TransitConfig) -> Result<Self, TransitError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransitError::Config(e.to_string()))?;
        Self::with_http(config, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_http(config: &TransitConfig, http: reqwest::Client) -> Result<Self, TransitError> {
        Ok(Self {
            http,
            odsay: Provider::new(ODSAY, &config.odsay)?,
            seoul: Provider::new(SEOUL, &config.seoul)?,
        })
    }

    /// ODsay public-transport path search.
    pub async fn search_path(
        &self,
        coords: Coordinates<'_>,
        mode: SearchMode,
    ) -> Result<Value, TransitError> {
        let mut url = self.odsay.url(&["searchPubTransPathT"]);
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("SX", coords.sx)
                .append_pair("SY", coords.sy)
                .append_pair("EX", coords.ex)
                .append_pair("EY", coords.ey);
            if let Some(t) = mode.search_type() {
                q.append_pair("SearchType", t);
            }
            q.append_pair("apiKey", &self.odsay.api_key);
        }
        self.get_json(ODSAY, "searchPubTransPathT", url).await
    }

    /// ODsay bus lane detail (route and stops of one bus line).
    pub async fn bus_lane_detail(&self, bus_id: &str) -> Result<Value, TransitError> {
        let mut url = self.odsay.url(&["busLaneDetail"]);
        url.query_pairs_mut()
            .append_pair("busID", bus_id)
            .append_pair("apiKey", &self.odsay.api_key);
        self.get_json(ODSAY, "busLaneDetail", url).await
    }

    /// ODsay realtime arrivals at one bus stop.
    pub async fn bus_station_realtime(&self, station_id: &str) -> Result<Value, TransitError> {
        let mut url = self.odsay.url(&["realtimeStation"]);
        url.query_pairs_mut()
            .append_pair("stationID", station_id)
            .append_pair("apiKey", &self.odsay.api_key);
        self.get_json(ODSAY, "realtimeStation", url).await
    }

    /// Seoul realtime subway arrivals; the first ten entries for `station`.
    ///
    /// `station` is used as given. The key travels in the path.
    pub async fn subway_realtime(&self, station: &str) -> Result<Value, TransitError> {
        let url = self.seoul.url(&[
            self.seoul.api_key.as_str(),
            "json",
            "realtimeStationArrival",
            "0",
            "10",
            station,
        ]);
        self.get_json(SEOUL, "realtimeStationArrival", url).await
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// GET `url` and decode JSON. `op` is logged instead of the URL, which
    /// carries the API key.
    async fn get_json(
        &self,
        provider: &'static str,
        op: &'static str,
        url: Url,
    ) -> Result<Value, TransitError> {
        debug!(provider, op, "GET");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransitError::transport(provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransitError::Upstream {
                provider,
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                TransitError::decode(provider, e)
            } else {
                TransitError::transport(provider, e)
            }
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}
