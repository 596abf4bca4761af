//! Public transit lookups proxied from ODsay and the Seoul open-data API.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use straffic_core::{Module, ServiceError};

pub use client::TransitClient;
pub use config::TransitConfig;
pub use error::TransitError;
pub use service::TransitService;

/// The Transit module.
pub struct TransitModule {
    service: Arc<TransitService>,
}

impl TransitModule {
    pub fn new(config: &TransitConfig) -> Result<Self, ServiceError> {
        let client = TransitClient::new(config).map_err(|e| ServiceError::Validation(e.to_string()))?;
        if config.odsay.api_key.is_empty() {
            warn!("transit.odsay.api_key is empty; route and bus lookups will fail upstream");
        }
        if config.seoul.api_key.is_empty() {
            warn!("transit.seoul.api_key is empty; subway arrivals will fail upstream");
        }
        info!(timeout_secs = config.timeout_secs, "transit module ready");
        Ok(Self {
            service: Arc::new(TransitService::new(client)),
        })
    }
}

impl Module for TransitModule {
    fn name(&self) -> &str {
        "transit"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
