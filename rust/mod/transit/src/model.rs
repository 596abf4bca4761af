use serde::{Deserialize, Deserializer};

use crate::error::TransitError;

/// Which modes a path search may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Subway, bus and rail together.
    All,
    Subway,
    Bus,
}

impl SearchMode {
    /// ODsay `SearchType` parameter, if any.
    pub fn search_type(&self) -> Option<&'static str> {
        match self {
            SearchMode::All => None,
            SearchMode::Subway => Some("1"),
            SearchMode::Bus => Some("2"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::All => "all",
            SearchMode::Subway => "subway",
            SearchMode::Bus => "bus",
        }
    }
}

/// Path search request. Coordinates are longitude (X) / latitude (Y).
///
/// Coordinates are accepted as JSON strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_x: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_y: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub end_x: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub end_y: Option<String>,
    #[serde(default)]
    pub start_name: Option<String>,
    #[serde(default)]
    pub end_name: Option<String>,
    #[serde(default)]
    pub search_type: Option<String>,
}

/// Start and end coordinates, all present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates<'a> {
    pub sx: &'a str,
    pub sy: &'a str,
    pub ex: &'a str,
    pub ey: &'a str,
}

impl RouteRequest {
    pub fn coordinates(&self) -> Result<Coordinates<'_>, TransitError> {
        match (
            present(&self.start_x),
            present(&self.start_y),
            present(&self.end_x),
            present(&self.end_y),
        ) {
            (Some(sx), Some(sy), Some(ex), Some(ey)) => Ok(Coordinates { sx, sy, ex, ey }),
            _ => Err(TransitError::InvalidRequest(
                "startX, startY, endX and endY are required".into(),
            )),
        }
    }
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Drop one trailing `역` ("station"); the Seoul API indexes bare names.
pub fn normalize_station_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_suffix('역').unwrap_or(name)
}

fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
