use std::sync::Arc;

use chrono::NaiveDateTime;

use straffic_core::{ListParams, ListResult, format_storage, parse_storage};
use straffic_sql::{Row, SQLStore, Value};

use crate::error::ParkingError;
use crate::model::ParkingSession;

/// SQL schema for the session ledger.
///
/// `(spot_id, entry_time)` identifies one occupancy; it can be billed once.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS parking_records (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    spot_id           TEXT NOT NULL,
    plate_number      TEXT NOT NULL,
    vehicle_type      TEXT NOT NULL,
    entry_time        TEXT NOT NULL,
    exit_time         TEXT NOT NULL,
    duration_minutes  INTEGER NOT NULL,
    fee               INTEGER NOT NULL,
    UNIQUE (spot_id, entry_time)
);
CREATE INDEX IF NOT EXISTS idx_parking_records_entry_time ON parking_records(entry_time);
CREATE INDEX IF NOT EXISTS idx_parking_records_exit_time ON parking_records(exit_time);
";

const COLUMNS: &str =
    "id, spot_id, plate_number, vehicle_type, entry_time, exit_time, duration_minutes, fee";

/// Largest page `recent` returns.
pub const MAX_PAGE: usize = 1000;

/// Append-only record of completed parking sessions.
pub struct OccupancyLedger {
    db: Arc<dyn SQLStore>,
}

impl OccupancyLedger {
    /// Create the ledger and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ParkingError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ParkingError::Persistence(format!("ledger schema init: {e}")))?;
        Ok(Self { db })
    }

    /// Store a completed session.
    ///
    /// Returns `false` when the occupancy is already ledgered; the stored
    /// record is left untouched.
    pub fn append(&self, session: &ParkingSession) -> Result<bool, ParkingError> {
        let inserted = self
            .db
            .exec(
                "INSERT INTO parking_records \
                 (spot_id, plate_number, vehicle_type, entry_time, exit_time, duration_minutes, fee) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                &[
                    Value::Text(session.spot_id.clone()),
                    Value::Text(session.plate_number.clone()),
                    Value::Text(session.vehicle_type.clone()),
                    Value::Text(format_storage(&session.entry_time)),
                    Value::Text(format_storage(&session.exit_time)),
                    Value::Integer(session.duration_minutes),
                    Value::Integer(session.fee),
                ],
            );
        match inserted {
            Ok(_) => Ok(true),
            Err(e) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(ParkingError::Persistence(e.to_string())),
        }
    }

    /// The session recorded for one occupancy, if any.
    pub fn find(
        &self,
        spot_id: &str,
        entry_time: NaiveDateTime,
    ) -> Result<Option<ParkingSession>, ParkingError> {
        let rows = self.db.query(
            &format!(
                "SELECT {COLUMNS} FROM parking_records WHERE spot_id = ?1 AND entry_time = ?2"
            ),
            &[
                Value::Text(spot_id.to_string()),
                Value::Text(format_storage(&entry_time)),
            ],
        )?;
        rows.first().map(row_to_session).transpose()
    }

    /// Sessions whose entry time is in `[start, end)`.
    pub fn count_entries_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<i64, ParkingError> {
        let rows = self.db.query(
            "SELECT COUNT(*) AS cnt FROM parking_records \
             WHERE entry_time >= ?1 AND entry_time < ?2",
            &[
                Value::Text(format_storage(&start)),
                Value::Text(format_storage(&end)),
            ],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// Most recent sessions first (by exit time).
    pub fn recent(&self, params: &ListParams) -> Result<ListResult<ParkingSession>, ParkingError> {
        let count_rows = self
            .db
            .query("SELECT COUNT(*) AS cnt FROM parking_records", &[])?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let rows = self.db.query(
            &format!(
                "SELECT {COLUMNS} FROM parking_records \
                 ORDER BY exit_time DESC, id DESC LIMIT ?1 OFFSET ?2"
            ),
            &[
                Value::Integer(params.limit.min(MAX_PAGE) as i64),
                Value::Integer(params.offset.min(i64::MAX as usize) as i64),
            ],
        )?;

        let items = rows
            .iter()
            .map(row_to_session)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult { items, total })
    }
}

fn row_to_session(row: &Row) -> Result<ParkingSession, ParkingError> {
    let text = |col: &str| -> Result<String, ParkingError> {
        row.get_str(col)
            .map(str::to_string)
            .ok_or_else(|| ParkingError::Persistence(format!("ledger row missing {col}")))
    };
    let time = |col: &str| -> Result<NaiveDateTime, ParkingError> {
        let raw = text(col)?;
        parse_storage(&raw)
            .ok_or_else(|| ParkingError::Persistence(format!("ledger row: corrupt {col} '{raw}'")))
    };

    Ok(ParkingSession {
        id: row.get_i64("id"),
        spot_id: text("spot_id")?,
        plate_number: text("plate_number")?,
        vehicle_type: text("vehicle_type")?,
        entry_time: time("entry_time")?,
        exit_time: time("exit_time")?,
        duration_minutes: row.get_i64("duration_minutes").unwrap_or(0),
        fee: row.get_i64("fee").unwrap_or(0),
    })
}
