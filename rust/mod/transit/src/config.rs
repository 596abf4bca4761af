use serde::Deserialize;

/// One upstream data provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Transit provider settings, read from the `[transit]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    /// ODsay: path search, bus lanes, bus stop arrivals.
    pub odsay: ProviderConfig,
    /// Seoul open data: realtime subway arrivals.
    pub seoul: ProviderConfig,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            odsay: ProviderConfig {
                base_url: "https://api.odsay.com/v1/api".to_string(),
                api_key: String::new(),
            },
            seoul: ProviderConfig {
                base_url: "http://swopenAPI.seoul.go.kr/api/subway".to_string(),
                api_key: String::new(),
            },
            timeout_secs: 10,
        }
    }
}
