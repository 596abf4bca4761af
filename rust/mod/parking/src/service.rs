use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use straffic_core::{Clock, ListParams, ListResult};

use crate::config::ParkingConfig;
use crate::error::ParkingError;
use crate::inventory::{ReconcilePlan, SpotInventory};
use crate::ledger::OccupancyLedger;
use crate::model::{ParkingSession, ParkingSpot, Statistics};
use crate::tariff::{FeeQuote, Tariff, billable_minutes};

/// Outcome of a successful entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReceipt {
    pub spot: ParkingSpot,
    pub entry_time: NaiveDateTime,
}

/// Outcome of a successful exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReceipt {
    pub spot_id: String,
    pub plate_number: String,
    pub duration_minutes: i64,
    pub fee: i64,
    pub exit_time: NaiveDateTime,
}

/// Current occupancy of the whole lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotStatus {
    pub spots: Vec<ParkingSpot>,
    pub statistics: Statistics,
}

// ---------------------------------------------------------------------------
// ParkingLifecycleService: the entry/exit state machine
// ---------------------------------------------------------------------------

/// Drives spots through FREE → OCCUPIED → FREE.
///
/// A failed transition leaves no trace, with one exception: if exit has
/// already written the ledger record and then fails to free the spot, the
/// spot stays occupied with its session billed. That window is reported,
/// not retried automatically; a later exit on the spot frees it and returns
/// the bill already on the ledger.
pub struct ParkingLifecycleService {
    inventory: SpotInventory,
    ledger: OccupancyLedger,
    clock: Arc<dyn Clock>,
    rate_per_minute: i64,
    default_vehicle_type: String,
    tariff: Tariff,
}

impl ParkingLifecycleService {
    pub fn new(
        inventory: SpotInventory,
        ledger: OccupancyLedger,
        clock: Arc<dyn Clock>,
        config: &ParkingConfig,
    ) -> Self {
        Self {
            inventory,
            ledger,
            clock,
            rate_per_minute: config.rate_per_minute,
            default_vehicle_type: config.default_vehicle_type.clone(),
            tariff: config.tariff.clone(),
        }
    }

    pub fn inventory(&self) -> &SpotInventory {
        &self.inventory
    }

    pub fn ledger(&self) -> &OccupancyLedger {
        &self.ledger
    }

    /// Startup reconciliation. Call once, before serving entry/exit.
    pub fn reconcile(&self) -> Result<ReconcilePlan, ParkingError> {
        let plan = self.inventory.reconcile()?;
        if plan.is_empty() {
            info!("parking inventory consistent");
        } else {
            info!(
                deleted = ?plan.to_delete,
                created = ?plan.to_create,
                "parking inventory reconciled"
            );
        }
        Ok(plan)
    }

    pub fn status(&self) -> Result<LotStatus, ParkingError> {
        let spots = self.inventory.list_all()?;
        let statistics = Statistics::of(&spots);
        Ok(LotStatus { spots, statistics })
    }

    // =======================================================================
    // Entry
    // =======================================================================

    /// Park `plate` in `spot_id`.
    pub fn entry(&self, spot_id: &str, plate: &str) -> Result<EntryReceipt, ParkingError> {
        let plate = plate.trim();
        if plate.is_empty() {
            return Err(ParkingError::MissingPlate);
        }
        if spot_id.trim().is_empty() {
            return Err(ParkingError::MissingSpot);
        }

        let spot = match self.inventory.get(spot_id)? {
            Some(spot) => spot,
            None if self.inventory.range().contains(spot_id) => {
                info!(spot = spot_id, "spot missing from inventory, recreating");
                self.inventory.ensure_valid_and_create(spot_id)?
            }
            None => {
                warn!(spot = spot_id, "entry to unknown spot");
                return Err(ParkingError::UnknownSpot(spot_id.to_string()));
            }
        };

        if spot.occupied {
            return Err(already_occupied(&spot));
        }

        let now = self.clock.now();
        let committed = self.inventory.occupy(spot_id, plate, now).map_err(|e| {
            error!(spot = spot_id, "entry not saved: {e}");
            e
        })?;

        if !committed {
            // Lost a race: someone occupied (or removed) the spot after our read.
            return match self.inventory.get(spot_id)? {
                Some(current) if current.occupied => Err(already_occupied(&current)),
                _ => Err(ParkingError::UnknownSpot(spot_id.to_string())),
            };
        }

        info!(spot = spot_id, plate, "vehicle entered");
        Ok(EntryReceipt {
            spot: ParkingSpot::occupied_by(spot_id, plate, now),
            entry_time: now,
        })
    }

    // =======================================================================
    // Exit
    // =======================================================================

    /// Release `spot_id`, bill the stay and ledger it.
    pub fn exit(&self, spot_id: &str) -> Result<ExitReceipt, ParkingError> {
        if spot_id.trim().is_empty() {
            return Err(ParkingError::MissingSpot);
        }

        // No self-heal here: a missing spot has nobody to bill.
        let spot = self
            .inventory
            .get(spot_id)?
            .ok_or_else(|| ParkingError::UnknownSpot(spot_id.to_string()))?;

        if !spot.occupied {
            return Err(ParkingError::NotOccupied(spot_id.to_string()));
        }
        let (Some(plate), Some(entry_time)) = (spot.plate_number, spot.entry_time) else {
            return Err(ParkingError::Persistence(format!(
                "spot {spot_id} is occupied without plate or entry time"
            )));
        };

        let exit_time = self.clock.now();
        let duration_minutes = billable_minutes(entry_time, exit_time);
        let session = ParkingSession {
            id: None,
            spot_id: spot_id.to_string(),
            plate_number: plate.clone(),
            vehicle_type: self.default_vehicle_type.clone(),
            entry_time,
            exit_time,
            duration_minutes,
            fee: duration_minutes * self.rate_per_minute,
        };

        // Ledger first: a session is never lost, at worst a spot stays occupied.
        let fresh = self.ledger.append(&session).map_err(|e| {
            error!(spot = spot_id, "session not ledgered, spot left occupied: {e}");
            e
        })?;

        // Already ledgered by an earlier exit whose clear failed, or by a
        // concurrent exit. Either way the stored bill stands.
        let session = if fresh {
            session
        } else {
            match self.ledger.find(spot_id, entry_time)? {
                Some(stored) => {
                    info!(spot = spot_id, plate = %plate, "session already ledgered, releasing spot");
                    stored
                }
                None => {
                    return Err(ParkingError::Persistence(format!(
                        "ledger rejected session for {spot_id} but holds none"
                    )));
                }
            }
        };

        match self.inventory.release(spot_id, &plate, entry_time) {
            Ok(true) => {}
            // Another exit freed this occupancy first and owns the receipt.
            Ok(false) => {
                if fresh {
                    warn!(spot = spot_id, plate = %plate, "spot freed by another exit after ledgering");
                }
                return Err(ParkingError::NotOccupied(spot_id.to_string()));
            }
            Err(e) => {
                error!(
                    spot = spot_id,
                    plate = %plate,
                    fee = session.fee,
                    "session ledgered but spot not freed: {e}"
                );
                return Err(e);
            }
        }

        info!(
            spot = spot_id,
            plate = %plate,
            duration_minutes = session.duration_minutes,
            fee = session.fee,
            "vehicle exited"
        );
        Ok(ExitReceipt {
            spot_id: spot_id.to_string(),
            plate_number: plate,
            duration_minutes: session.duration_minutes,
            fee: session.fee,
            exit_time: session.exit_time,
        })
    }

    // =======================================================================
    // Reporting
    // =======================================================================

    pub fn count_entries_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<i64, ParkingError> {
        if end < start {
            return Err(ParkingError::InvalidInterval);
        }
        self.ledger.count_entries_between(start, end)
    }

    pub fn records(&self, params: &ListParams) -> Result<ListResult<ParkingSession>, ParkingError> {
        self.ledger.recent(params)
    }

    /// Stepped-tariff quote. Informational only; exit bills per minute.
    pub fn quote(
        &self,
        entry: NaiveDateTime,
        exit: NaiveDateTime,
        vehicle_type: Option<&str>,
    ) -> Result<FeeQuote, ParkingError> {
        let vehicle_type = vehicle_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_vehicle_type.as_str());
        self.tariff.quote(entry, exit, vehicle_type)
    }
}

fn already_occupied(spot: &ParkingSpot) -> ParkingError {
    ParkingError::AlreadyOccupied {
        spot: spot.id.clone(),
        plate: spot.plate_number.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    use chrono::{Duration, NaiveDate};
    use straffic_core::ManualClock;
    use straffic_sql::{Row, SQLError, SQLStore, SqliteStore, Value};

    /// SqliteStore that can be told to fail statements containing a needle.
    struct FaultyStore {
        inner: SqliteStore,
        fail_on: Mutex<Option<&'static str>>,
    }

    impl FaultyStore {
        fn new() -> Self {
            Self {
                inner: SqliteStore::open_in_memory().unwrap(),
                fail_on: Mutex::new(None),
            }
        }

        fn fail_on(&self, needle: &'static str) {
            *self.fail_on.lock().unwrap() = Some(needle);
        }

        fn check(&self, sql: &str) -> Result<(), SQLError> {
            match *self.fail_on.lock().unwrap() {
                Some(needle) if sql.contains(needle) => {
                    Err(SQLError::Execution("disk I/O error".into()))
                }
                _ => Ok(()),
            }
        }
    }

    impl SQLStore for FaultyStore {
        fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
            self.check(sql)?;
            self.inner.query(sql, params)
        }

        fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
            self.check(sql)?;
            self.inner.exec(sql, params)
        }

        fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
            self.inner.exec_batch(sql)
        }
    }

    const OCCUPY_SQL: &str = "SET occupied = 1";
    const RELEASE_SQL: &str = "SET occupied = 0";
    const LEDGER_SQL: &str = "INSERT INTO parking_records";

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 20).unwrap().and_hms_opt(14, 0, 0).unwrap()
    }

    struct Lot {
        svc: ParkingLifecycleService,
        clock: Arc<ManualClock>,
        store: Arc<FaultyStore>,
    }

    fn lot() -> Lot {
        let store = Arc::new(FaultyStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let config = ParkingConfig::default();
        let inventory = SpotInventory::new(store.clone(), config.spot_range()).unwrap();
        let ledger = OccupancyLedger::new(store.clone()).unwrap();
        let svc = ParkingLifecycleService::new(inventory, ledger, clock.clone(), &config);
        svc.reconcile().unwrap();
        Lot { svc, clock, store }
    }

    fn spot(lot: &Lot, id: &str) -> Option<ParkingSpot> {
        lot.svc.inventory().get(id).unwrap()
    }

    fn ledger_total(lot: &Lot) -> usize {
        lot.svc.records(&ListParams::default()).unwrap().total
    }

    // ── status ──

    #[test]
    fn status_after_reconcile() {
        let lot = lot();
        let status = lot.svc.status().unwrap();
        assert_eq!(status.spots.len(), 10);
        assert_eq!(
            status.statistics,
            Statistics { total: 10, occupied: 0, available: 10 }
        );

        lot.svc.entry("A-3", "X").unwrap();
        let status = lot.svc.status().unwrap();
        assert_eq!(status.statistics.occupied, 1);
        assert_eq!(status.statistics.available, 9);
    }

    // ── entry ──

    #[test]
    fn entry_then_exit_scenario() {
        let lot = lot();
        let receipt = lot.svc.entry("A-1", "12가3456").unwrap();
        assert_eq!(receipt.entry_time, t0());
        assert_eq!(receipt.spot, ParkingSpot::occupied_by("A-1", "12가3456", t0()));
        assert_eq!(spot(&lot, "A-1"), Some(receipt.spot.clone()));

        lot.clock.advance(Duration::seconds(125));
        let out = lot.svc.exit("A-1").unwrap();
        assert_eq!(out.plate_number, "12가3456");
        assert_eq!(out.duration_minutes, 2);
        assert_eq!(out.fee, 100);
        assert_eq!(out.exit_time, t0() + Duration::seconds(125));
        assert_eq!(spot(&lot, "A-1"), Some(ParkingSpot::free("A-1")));

        let records = lot.svc.records(&ListParams::default()).unwrap();
        assert_eq!(records.total, 1);
        let rec = &records.items[0];
        assert_eq!(rec.spot_id, "A-1");
        assert_eq!(rec.plate_number, "12가3456");
        assert_eq!(rec.vehicle_type, "일반");
        assert_eq!(rec.duration_minutes, 2);
        assert_eq!(rec.fee, 100);
    }

    #[test]
    fn immediate_exit_bills_one_minute() {
        let lot = lot();
        lot.svc.entry("A-2", "X").unwrap();
        let out = lot.svc.exit("A-2").unwrap();
        assert_eq!(out.duration_minutes, 1);
        assert_eq!(out.fee, 50);
    }

    #[test]
    fn entry_trims_plate() {
        let lot = lot();
        let r = lot.svc.entry("A-1", "  12가3456 ").unwrap();
        assert_eq!(r.spot.plate_number.as_deref(), Some("12가3456"));
    }

    #[test]
    fn entry_on_occupied_spot_fails_and_changes_nothing() {
        let lot = lot();
        lot.svc.entry("A-5", "first").unwrap();
        let before = spot(&lot, "A-5");

        lot.clock.advance(Duration::minutes(3));
        let err = lot.svc.entry("A-5", "second").unwrap_err();
        assert_eq!(
            err,
            ParkingError::AlreadyOccupied { spot: "A-5".into(), plate: "first".into() }
        );
        assert!(err.to_string().contains("first"));
        assert_eq!(spot(&lot, "A-5"), before);
    }

    #[test]
    fn blank_inputs_fail_fast() {
        let lot = lot();
        let before = lot.svc.status().unwrap();
        assert_eq!(lot.svc.entry("A-1", "   "), Err(ParkingError::MissingPlate));
        assert_eq!(lot.svc.entry("A-1", ""), Err(ParkingError::MissingPlate));
        assert_eq!(lot.svc.entry("", "X"), Err(ParkingError::MissingSpot));
        assert_eq!(lot.svc.entry(" ", "X"), Err(ParkingError::MissingSpot));
        // Plate is checked before spot.
        assert_eq!(lot.svc.entry("", ""), Err(ParkingError::MissingPlate));
        assert_eq!(lot.svc.exit(" "), Err(ParkingError::MissingSpot));
        assert_eq!(lot.svc.status().unwrap(), before);
    }

    #[test]
    fn entry_out_of_range_is_unknown() {
        let lot = lot();
        assert_eq!(
            lot.svc.entry("A-99", "X"),
            Err(ParkingError::UnknownSpot("A-99".into()))
        );
        assert_eq!(spot(&lot, "A-99"), None);
        assert_eq!(lot.svc.status().unwrap().spots.len(), 10);
    }

    #[test]
    fn entry_self_heals_deleted_valid_spot() {
        let lot = lot();
        assert!(lot.svc.inventory().delete("A-7").unwrap());
        assert_eq!(spot(&lot, "A-7"), None);

        let r = lot.svc.entry("A-7", "X").unwrap();
        assert!(r.spot.occupied);
        assert_eq!(spot(&lot, "A-7").map(|s| s.occupied), Some(true));
    }

    #[test]
    fn entry_persistence_failure_leaves_spot_free() {
        let lot = lot();
        lot.store.fail_on(OCCUPY_SQL);
        assert!(matches!(lot.svc.entry("A-1", "X"), Err(ParkingError::Persistence(_))));
        assert_eq!(spot(&lot, "A-1"), Some(ParkingSpot::free("A-1")));
    }

    #[test]
    fn concurrent_entries_on_one_spot_commit_once() {
        let lot = lot();
        let svc = Arc::new(lot.svc);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || svc.entry("A-4", &format!("car-{i}")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let wins: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(wins.len(), 1);
        let winner = wins[0].spot.plate_number.clone().unwrap();
        for r in &results {
            if let Err(e) = r {
                assert_eq!(
                    e,
                    &ParkingError::AlreadyOccupied { spot: "A-4".into(), plate: winner.clone() }
                );
            }
        }
    }

    #[test]
    fn entries_on_distinct_spots_are_independent() {
        let lot = lot();
        for n in 1..=10 {
            lot.svc.entry(&format!("A-{n}"), &format!("car-{n}")).unwrap();
        }
        assert_eq!(lot.svc.status().unwrap().statistics.available, 0);
    }

    // ── exit ──

    #[test]
    fn exit_unoccupied_fails() {
        let lot = lot();
        assert_eq!(lot.svc.exit("A-1"), Err(ParkingError::NotOccupied("A-1".into())));
        assert_eq!(ledger_total(&lot), 0);
    }

    #[test]
    fn exit_missing_spot_does_not_self_heal() {
        let lot = lot();
        lot.svc.inventory().delete("A-7").unwrap();
        assert_eq!(lot.svc.exit("A-7"), Err(ParkingError::UnknownSpot("A-7".into())));
        assert_eq!(spot(&lot, "A-7"), None);
        assert_eq!(lot.svc.exit("A-99"), Err(ParkingError::UnknownSpot("A-99".into())));
    }

    #[test]
    fn exit_ledger_failure_keeps_spot_occupied() {
        let lot = lot();
        lot.svc.entry("A-1", "X").unwrap();
        lot.store.fail_on(LEDGER_SQL);

        assert!(matches!(lot.svc.exit("A-1"), Err(ParkingError::Persistence(_))));
        assert_eq!(spot(&lot, "A-1").map(|s| s.occupied), Some(true));

        lot.store.fail_on("nothing matches this");
        assert_eq!(ledger_total(&lot), 0);
    }

    #[test]
    fn exit_clear_failure_leaves_billed_occupied_spot() {
        let lot = lot();
        lot.svc.entry("A-1", "X").unwrap();
        lot.clock.advance(Duration::minutes(3));
        lot.store.fail_on(RELEASE_SQL);

        assert!(matches!(lot.svc.exit("A-1"), Err(ParkingError::Persistence(_))));
        lot.store.fail_on("nothing matches this");
        assert_eq!(ledger_total(&lot), 1);
        assert_eq!(spot(&lot, "A-1").map(|s| s.occupied), Some(true));
    }

    #[test]
    fn retried_exit_frees_spot_without_billing_twice() {
        let lot = lot();
        lot.svc.entry("A-1", "X").unwrap();
        lot.clock.advance(Duration::minutes(3));
        lot.store.fail_on(RELEASE_SQL);
        assert!(lot.svc.exit("A-1").is_err());
        lot.store.fail_on("nothing matches this");

        // Hours later the retry settles the stay at its original bill.
        lot.clock.advance(Duration::hours(5));
        let out = lot.svc.exit("A-1").unwrap();
        assert_eq!(out.plate_number, "X");
        assert_eq!(out.duration_minutes, 3);
        assert_eq!(out.fee, 150);
        assert_eq!(out.exit_time, t0() + Duration::minutes(3));
        assert_eq!(spot(&lot, "A-1"), Some(ParkingSpot::free("A-1")));
        assert_eq!(ledger_total(&lot), 1);

        assert_eq!(lot.svc.exit("A-1"), Err(ParkingError::NotOccupied("A-1".into())));
        lot.svc.entry("A-1", "Y").unwrap();
        assert_eq!(spot(&lot, "A-1").and_then(|s| s.plate_number), Some("Y".into()));
    }

    #[test]
    fn concurrent_exits_bill_once() {
        let lot = lot();
        lot.svc.entry("A-6", "X").unwrap();
        lot.clock.advance(Duration::minutes(4));
        let svc = Arc::new(lot.svc);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || svc.exit("A-6"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        for r in &results {
            if let Err(e) = r {
                assert_eq!(e, &ParkingError::NotOccupied("A-6".into()));
            }
        }
        assert_eq!(svc.records(&ListParams::default()).unwrap().total, 1);
        assert_eq!(svc.inventory().get("A-6").unwrap(), Some(ParkingSpot::free("A-6")));
    }

    #[test]
    fn spot_is_reusable_after_exit() {
        let lot = lot();
        lot.svc.entry("A-1", "X").unwrap();
        lot.clock.advance(Duration::minutes(10));
        lot.svc.exit("A-1").unwrap();
        lot.clock.advance(Duration::minutes(1));
        lot.svc.entry("A-1", "Y").unwrap();
        lot.clock.advance(Duration::minutes(30));
        let out = lot.svc.exit("A-1").unwrap();
        assert_eq!(out.plate_number, "Y");
        assert_eq!(out.fee, 30 * 50);
        assert_eq!(ledger_total(&lot), 2);
    }

    // ── reporting ──

    #[test]
    fn count_entries_in_window() {
        let lot = lot();
        lot.svc.entry("A-1", "X").unwrap();
        lot.clock.advance(Duration::minutes(5));
        lot.svc.exit("A-1").unwrap();

        let n = lot
            .svc
            .count_entries_between(t0(), t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            lot.svc.count_entries_between(t0(), t0() - Duration::hours(1)),
            Err(ParkingError::InvalidInterval)
        );
    }

    #[test]
    fn quote_defaults_vehicle_type() {
        let lot = lot();
        let q = lot.svc.quote(t0(), t0() + Duration::minutes(45), None).unwrap();
        assert_eq!(q.final_fee, 2000);
        let q = lot
            .svc
            .quote(t0(), t0() + Duration::minutes(45), Some("경차"))
            .unwrap();
        assert_eq!(q.final_fee, 1000);
    }
}
