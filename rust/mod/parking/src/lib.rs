//! Parking lot occupancy: spot inventory, entry/exit lifecycle, billing ledger.

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod model;
pub mod range;
pub mod service;
pub mod tariff;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use straffic_core::{Clock, Module, ServiceError, SystemClock};
use straffic_sql::SQLStore;

pub use config::ParkingConfig;
pub use error::ParkingError;
pub use service::ParkingLifecycleService;

/// The Parking module.
///
/// Construction reconciles the spot inventory, so once `new` returns the
/// routes are safe to serve.
pub struct ParkingModule {
    service: Arc<ParkingLifecycleService>,
}

impl ParkingModule {
    /// Create the module on the wall clock.
    pub fn new(db: Arc<dyn SQLStore>, config: &ParkingConfig) -> Result<Self, ServiceError> {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    /// Create with an explicit clock.
    pub fn with_clock(
        db: Arc<dyn SQLStore>,
        config: &ParkingConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::Validation)?;

        let inventory = inventory::SpotInventory::new(Arc::clone(&db), config.spot_range())
            .map_err(storage_err)?;
        let ledger = ledger::OccupancyLedger::new(db).map_err(storage_err)?;
        let service = ParkingLifecycleService::new(inventory, ledger, clock, config);

        let plan = service.reconcile().map_err(storage_err)?;
        info!(
            spots = config.spot_range().len(),
            deleted = plan.to_delete.len(),
            created = plan.to_create.len(),
            "parking inventory ready"
        );

        Ok(Self {
            service: Arc::new(service),
        })
    }

    pub fn service(&self) -> &Arc<ParkingLifecycleService> {
        &self.service
    }
}

fn storage_err(e: ParkingError) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

impl Module for ParkingModule {
    fn name(&self) -> &str {
        "parking"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
