use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDateTime;

use straffic_core::{format_storage, parse_storage};
use straffic_sql::{Row, SQLStore, Value};

use crate::error::ParkingError;
use crate::model::ParkingSpot;
use crate::range::SpotRange;

/// SQL schema for the spot table.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS parking_spots (
    spot_id       TEXT PRIMARY KEY,
    occupied      INTEGER NOT NULL DEFAULT 0,
    plate_number  TEXT,
    entry_time    TEXT
);
";

// ---------------------------------------------------------------------------
// Reconciliation plan
// ---------------------------------------------------------------------------

/// What startup reconciliation has to change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Stored ids outside the valid range.
    pub to_delete: Vec<String>,
    /// Valid ids with no stored row.
    pub to_create: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}

/// Diff the stored ids against the valid range. No I/O.
pub fn plan_reconcile(current: &[String], range: &SpotRange) -> ReconcilePlan {
    let to_delete = current
        .iter()
        .filter(|id| !range.contains(id))
        .cloned()
        .collect();

    let present: BTreeSet<&str> = current.iter().map(String::as_str).collect();
    let to_create = range
        .ids()
        .filter(|id| !present.contains(id.as_str()))
        .collect();

    ReconcilePlan { to_delete, to_create }
}

// ---------------------------------------------------------------------------
// SpotInventory
// ---------------------------------------------------------------------------

/// The canonical set of spots and their occupancy, backed by SQLStore.
///
/// State changes go through conditional UPDATEs so two requests racing on
/// the same spot cannot both win.
pub struct SpotInventory {
    db: Arc<dyn SQLStore>,
    range: SpotRange,
}

impl SpotInventory {
    /// Create the inventory and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>, range: SpotRange) -> Result<Self, ParkingError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ParkingError::Persistence(format!("spot schema init: {e}")))?;
        Ok(Self { db, range })
    }

    pub fn range(&self) -> &SpotRange {
        &self.range
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Every stored spot, ordered by id.
    pub fn list_all(&self) -> Result<Vec<ParkingSpot>, ParkingError> {
        let rows = self.db.query(
            "SELECT spot_id, occupied, plate_number, entry_time \
             FROM parking_spots ORDER BY spot_id",
            &[],
        )?;
        rows.iter().map(row_to_spot).collect()
    }

    pub fn get(&self, id: &str) -> Result<Option<ParkingSpot>, ParkingError> {
        let rows = self.db.query(
            "SELECT spot_id, occupied, plate_number, entry_time \
             FROM parking_spots WHERE spot_id = ?1",
            &[Value::Text(id.to_string())],
        )?;
        rows.first().map(row_to_spot).transpose()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a free spot for a valid id that has no row yet.
    ///
    /// An id that already exists is returned as stored, so concurrent
    /// self-heals of the same spot converge on one row.
    pub fn ensure_valid_and_create(&self, id: &str) -> Result<ParkingSpot, ParkingError> {
        if !self.range.contains(id) {
            return Err(ParkingError::InvalidSpotId(id.to_string()));
        }
        self.db.exec(
            "INSERT OR IGNORE INTO parking_spots (spot_id, occupied) VALUES (?1, 0)",
            &[Value::Text(id.to_string())],
        )?;
        self.get(id)?
            .ok_or_else(|| ParkingError::Persistence(format!("spot {id} vanished after create")))
    }

    /// Upsert the full state of a spot.
    ///
    /// A free spot is always written with NULL plate and entry time.
    pub fn save(&self, spot: &ParkingSpot) -> Result<(), ParkingError> {
        let (plate, entry) = if spot.occupied {
            (
                Value::opt_text(spot.plate_number.as_deref()),
                Value::opt_text(spot.entry_time.as_ref().map(format_storage).as_deref()),
            )
        } else {
            (Value::Null, Value::Null)
        };

        self.db.exec(
            "INSERT INTO parking_spots (spot_id, occupied, plate_number, entry_time) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(spot_id) DO UPDATE SET \
                 occupied = excluded.occupied, \
                 plate_number = excluded.plate_number, \
                 entry_time = excluded.entry_time",
            &[
                Value::Text(spot.id.clone()),
                Value::Integer(spot.occupied as i64),
                plate,
                entry,
            ],
        )?;
        Ok(())
    }

    /// FREE → OCCUPIED. Returns `false` if the spot was not free (or not there).
    pub fn occupy(&self, id: &str, plate: &str, at: NaiveDateTime) -> Result<bool, ParkingError> {
        let affected = self.db.exec(
            "UPDATE parking_spots SET occupied = 1, plate_number = ?2, entry_time = ?3 \
             WHERE spot_id = ?1 AND occupied = 0",
            &[
                Value::Text(id.to_string()),
                Value::Text(plate.to_string()),
                Value::Text(format_storage(&at)),
            ],
        )?;
        Ok(affected == 1)
    }

    /// OCCUPIED → FREE, only for the occupancy identified by plate and entry time.
    ///
    /// Returns `false` if that occupancy is no longer current.
    pub fn release(
        &self,
        id: &str,
        plate: &str,
        entry_time: NaiveDateTime,
    ) -> Result<bool, ParkingError> {
        let affected = self.db.exec(
            "UPDATE parking_spots SET occupied = 0, plate_number = NULL, entry_time = NULL \
             WHERE spot_id = ?1 AND occupied = 1 AND plate_number = ?2 AND entry_time = ?3",
            &[
                Value::Text(id.to_string()),
                Value::Text(plate.to_string()),
                Value::Text(format_storage(&entry_time)),
            ],
        )?;
        Ok(affected == 1)
    }

    pub fn delete(&self, id: &str) -> Result<bool, ParkingError> {
        let affected = self.db.exec(
            "DELETE FROM parking_spots WHERE spot_id = ?1",
            &[Value::Text(id.to_string())],
        )?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Startup
    // -----------------------------------------------------------------------

    /// Align the stored spots with the valid range.
    ///
    /// Must finish before any entry/exit is served. Spots that survive keep
    /// their occupancy.
    pub fn reconcile(&self) -> Result<ReconcilePlan, ParkingError> {
        let rows = self.db.query("SELECT spot_id FROM parking_spots", &[])?;
        let current: Vec<String> = rows
            .iter()
            .filter_map(|r| r.get_str("spot_id").map(str::to_string))
            .collect();

        let plan = plan_reconcile(&current, &self.range);
        for id in &plan.to_delete {
            self.delete(id)?;
        }
        for id in &plan.to_create {
            self.save(&ParkingSpot::free(id.as_str()))?;
        }
        Ok(plan)
    }
}

fn row_to_spot(row: &Row) -> Result<ParkingSpot, ParkingError> {
    let id = row
        .get_str("spot_id")
        .ok_or_else(|| ParkingError::Persistence("spot row without id".into()))?
        .to_string();

    let occupied = row.get_bool("occupied").unwrap_or(false);
    if !occupied {
        return Ok(ParkingSpot::free(id));
    }

    let entry_time = match row.get_str("entry_time") {
        Some(s) => Some(parse_storage(s).ok_or_else(|| {
            ParkingError::Persistence(format!("spot {id}: corrupt entry_time '{s}'"))
        })?),
        None => None,
    };

    Ok(ParkingSpot {
        plate_number: row.get_str("plate_number").map(str::to_string),
        entry_time,
        occupied,
        id,
    })
}
