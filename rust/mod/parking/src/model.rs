use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use straffic_core::format_display;

// ---------------------------------------------------------------------------
// ParkingSpot
// ---------------------------------------------------------------------------

/// One parking space and who is in it.
///
/// ```text
/// FREE → OCCUPIED → FREE
/// ```
///
/// `plate_number` and `entry_time` are `Some` exactly when `occupied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpot {
    #[serde(rename = "spotId")]
    pub id: String,
    pub occupied: bool,
    pub plate_number: Option<String>,
    #[serde(serialize_with = "display_time_opt")]
    pub entry_time: Option<NaiveDateTime>,
}

impl ParkingSpot {
    /// An unoccupied spot.
    pub fn free(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            occupied: false,
            plate_number: None,
            entry_time: None,
        }
    }

    pub fn occupied_by(id: impl Into<String>, plate: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            occupied: true,
            plate_number: Some(plate.into()),
            entry_time: Some(at),
        }
    }
}

// ---------------------------------------------------------------------------
// ParkingSession: ledger record
// ---------------------------------------------------------------------------

/// A completed entry/exit pair. Written once on exit, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSession {
    /// Ledger row id; `None` until stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub spot_id: String,
    pub plate_number: String,
    pub vehicle_type: String,
    #[serde(serialize_with = "display_time")]
    pub entry_time: NaiveDateTime,
    #[serde(serialize_with = "display_time")]
    pub exit_time: NaiveDateTime,
    /// Whole minutes parked, at least 1.
    pub duration_minutes: i64,
    pub fee: i64,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Occupancy counts across the whole inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub occupied: usize,
    pub available: usize,
}

impl Statistics {
    pub fn of(spots: &[ParkingSpot]) -> Self {
        let total = spots.len();
        let occupied = spots.iter().filter(|s| s.occupied).count();
        Self {
            total,
            occupied,
            available: total - occupied,
        }
    }
}

fn display_time<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_display(ts))
}

fn display_time_opt<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => display_time(ts, s),
        None => s.serialize_none(),
    }
}
