use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ParkingError;

/// Stepped tariff used for fee quotes.
///
/// The first `base_minutes` cost `base_fee`; every started `step_minutes`
/// after that adds `step_fee`. Vehicle types may carry a percentage discount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tariff {
    pub base_minutes: i64,
    pub base_fee: i64,
    pub step_minutes: i64,
    pub step_fee: i64,
    /// Vehicle type → discount in percent (0..=100).
    pub discount_percent: BTreeMap<String, u32>,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            base_minutes: 30,
            base_fee: 1000,
            step_minutes: 10,
            step_fee: 500,
            discount_percent: BTreeMap::from([
                ("경차".to_string(), 50),
                ("전기차".to_string(), 30),
                ("장애인".to_string(), 100),
            ]),
        }
    }
}

/// Result of [`Tariff::quote`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub duration_minutes: i64,
    pub base_fee: i64,
    /// Fraction taken off, e.g. `0.3`.
    pub discount: f64,
    pub final_fee: i64,
}

/// Whole minutes parked, never less than one.
pub fn billable_minutes(entry: NaiveDateTime, exit: NaiveDateTime) -> i64 {
    (exit - entry).num_minutes().max(1)
}

impl Tariff {
    pub fn base_fee_for(&self, minutes: i64) -> i64 {
        if minutes <= self.base_minutes {
            return self.base_fee;
        }
        let extra = minutes - self.base_minutes;
        let step = self.step_minutes.max(1);
        let steps = (extra + step - 1) / step;
        self.base_fee + steps * self.step_fee
    }

    pub fn discount_for(&self, vehicle_type: &str) -> u32 {
        self.discount_percent
            .get(vehicle_type)
            .copied()
            .unwrap_or(0)
            .min(100)
    }

    /// Quote a stay. Fails if `exit` is before `entry`.
    pub fn quote(
        &self,
        entry: NaiveDateTime,
        exit: NaiveDateTime,
        vehicle_type: &str,
    ) -> Result<FeeQuote, ParkingError> {
        if exit < entry {
            return Err(ParkingError::InvalidInterval);
        }
        let minutes = billable_minutes(entry, exit);
        let base_fee = self.base_fee_for(minutes);
        let pct = self.discount_for(vehicle_type);
        let final_fee = base_fee * i64::from(100 - pct) / 100;

        Ok(FeeQuote {
            duration_minutes: minutes,
            base_fee,
            discount: f64::from(pct) / 100.0,
            final_fee,
        })
    }
}

/// Parse a client-supplied timestamp.
///
/// Accepts `yyyy-MM-ddTHH:mm:ss[.fff]` and `yyyy-MM-dd HH:mm:ss[.fff]`.
pub fn parse_client_time(raw: &str) -> Result<NaiveDateTime, ParkingError> {
    let s = raw.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| ParkingError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn minutes_floor_with_minimum_one() {
        assert_eq!(billable_minutes(t0(), t0()), 1);
        assert_eq!(billable_minutes(t0(), t0() + Duration::seconds(59)), 1);
        assert_eq!(billable_minutes(t0(), t0() + Duration::seconds(125)), 2);
        assert_eq!(billable_minutes(t0(), t0() + Duration::seconds(3599)), 59);
    }

    #[test]
    fn base_fee_steps() {
        let t = Tariff::default();
        assert_eq!(t.base_fee_for(1), 1000);
        assert_eq!(t.base_fee_for(30), 1000);
        assert_eq!(t.base_fee_for(31), 1500);
        assert_eq!(t.base_fee_for(40), 1500);
        assert_eq!(t.base_fee_for(41), 2000);
        assert_eq!(t.base_fee_for(90), 4000);
    }

    #[test]
    fn quote_applies_discount() {
        let t = Tariff::default();
        let q = t.quote(t0(), t0() + Duration::minutes(45), "전기차").unwrap();
        assert_eq!(q.duration_minutes, 45);
        assert_eq!(q.base_fee, 2000);
        assert_eq!(q.discount, 0.3);
        assert_eq!(q.final_fee, 1400);

        let q = t.quote(t0(), t0() + Duration::minutes(10), "장애인").unwrap();
        assert_eq!(q.final_fee, 0);

        let q = t.quote(t0(), t0() + Duration::minutes(10), "일반").unwrap();
        assert_eq!(q.discount, 0.0);
        assert_eq!(q.final_fee, 1000);
    }

    #[test]
    fn quote_rejects_reversed_interval() {
        let t = Tariff::default();
        assert_eq!(
            t.quote(t0(), t0() - Duration::minutes(1), "일반"),
            Err(ParkingError::InvalidInterval)
        );
    }

    #[test]
    fn parse_both_layouts() {
        assert_eq!(parse_client_time("2026-02-01T10:00:00").unwrap(), t0());
        assert_eq!(parse_client_time("2026-02-01 10:00:00").unwrap(), t0());
        assert_eq!(
            parse_client_time("2026-02-01T10:00:00.250").unwrap(),
            t0() + Duration::milliseconds(250)
        );
        assert!(matches!(
            parse_client_time("10:00"),
            Err(ParkingError::InvalidTimestamp(_))
        ));
    }
}
