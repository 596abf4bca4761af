use serde::Deserialize;

use crate::range::SpotRange;
use crate::tariff::Tariff;

/// Most spots one lot may configure; the inventory is seeded row by row at
/// startup and listed in full by `/parking/status`.
pub const MAX_SPOTS: u64 = 10_000;

/// Parking lot settings, read from the `[parking]` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParkingConfig {
    /// Id prefix shared by every spot.
    pub spot_prefix: String,
    /// First valid spot number (inclusive).
    pub first_spot: u32,
    /// Last valid spot number (inclusive).
    pub last_spot: u32,
    /// Billing rate applied on exit.
    pub rate_per_minute: i64,
    /// Vehicle type written to every ledger record.
    pub default_vehicle_type: String,
    /// Stepped tariff for fee quotes.
    pub tariff: Tariff,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            spot_prefix: "A-".to_string(),
            first_spot: 1,
            last_spot: 10,
            rate_per_minute: 50,
            default_vehicle_type: "일반".to_string(),
            tariff: Tariff::default(),
        }
    }
}

impl ParkingConfig {
    pub fn spot_range(&self) -> SpotRange {
        SpotRange::new(self.spot_prefix.clone(), self.first_spot, self.last_spot)
    }

    /// Reject settings the lot cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.spot_prefix.is_empty() {
            return Err("parking.spot_prefix is empty".into());
        }
        if self.first_spot > self.last_spot {
            return Err(format!(
                "parking.first_spot ({}) is greater than parking.last_spot ({})",
                self.first_spot, self.last_spot
            ));
        }
        let count = u64::from(self.last_spot) - u64::from(self.first_spot) + 1;
        if count > MAX_SPOTS {
            return Err(format!(
                "parking spot range holds {count} spots, more than the limit of {MAX_SPOTS}"
            ));
        }
        if self.rate_per_minute <= 0 {
            return Err("parking.rate_per_minute must be positive".into());
        }
        Ok(())
    }
}
