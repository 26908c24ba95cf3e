//! Time alignment of consumption readings and spot prices.
//!
//! Price timestamps are first rounded to the nearest hour, then both sources
//! are indexed by timestamp and joined under the requested [`JoinPolicy`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use energy_core::models::{ConsumptionRecord, JoinPolicy, PriceRecord, UnifiedRecord};
use energy_core::time_utils::round_to_nearest_hour;
use serde::Serialize;
use tracing::{debug, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// Counters describing how the two sources lined up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentStats {
    /// Consumption rows overwritten by a later row with the same timestamp.
    pub consumption_duplicates: usize,
    /// Price rows overwritten after hour rounding collapsed them together.
    pub price_duplicates: usize,
    /// Hours present in both sources.
    pub matched: usize,
    /// Hours with a reading but no price.
    pub consumption_only: usize,
    /// Hours with a price but no reading.
    pub price_only: usize,
}

/// Output of [`align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Unified records ordered by timestamp. `hourly_bill_eur` is not yet
    /// derived.
    pub records: Vec<UnifiedRecord>,
    pub stats: AlignmentStats,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Join `consumption` and `prices` on exact (hour-normalised) timestamp.
///
/// * [`JoinPolicy::Inner`] keeps only hours present in both sources.
/// * [`JoinPolicy::Outer`] keeps every hour from either source, leaving the
///   fields of the absent side empty.
///
/// When several rows of one source share a timestamp the last one in input
/// order wins; each collapse is counted in [`AlignmentStats`].
pub fn align(
    consumption: &[ConsumptionRecord],
    prices: &[PriceRecord],
    policy: JoinPolicy,
) -> Alignment {
    let mut stats = AlignmentStats::default();

    let mut readings: BTreeMap<NaiveDateTime, &ConsumptionRecord> = BTreeMap::new();
    for record in consumption {
        if readings.insert(record.timestamp, record).is_some() {
            stats.consumption_duplicates += 1;
        }
    }

    let mut price_by_hour: BTreeMap<NaiveDateTime, Option<f64>> = BTreeMap::new();
    for record in prices {
        let hour = round_to_nearest_hour(record.timestamp);
        if price_by_hour
            .insert(hour, record.price_cents_per_kwh)
            .is_some()
        {
            stats.price_duplicates += 1;
        }
    }

    if stats.consumption_duplicates > 0 {
        warn!(
            "{} duplicate consumption timestamps; keeping the last reading of each",
            stats.consumption_duplicates
        );
    }
    if stats.price_duplicates > 0 {
        warn!(
            "{} price rows collapsed onto an existing hour; keeping the last price of each",
            stats.price_duplicates
        );
    }

    let keys: BTreeSet<NaiveDateTime> = readings
        .keys()
        .chain(price_by_hour.keys())
        .copied()
        .collect();

    let mut records = Vec::with_capacity(keys.len());
    for ts in keys {
        let reading = readings.get(&ts).copied();
        let price = price_by_hour.get(&ts).copied();

        match (reading, price) {
            (Some(_), Some(_)) => stats.matched += 1,
            (Some(_), None) => stats.consumption_only += 1,
            (None, Some(_)) => stats.price_only += 1,
            (None, None) => {}
        }

        if policy == JoinPolicy::Inner && (reading.is_none() || price.is_none()) {
            continue;
        }

        records.push(unify(ts, reading, price.flatten()));
    }

    debug!(
        "Aligned {} records ({} join): {} matched, {} consumption-only, {} price-only",
        records.len(),
        policy,
        stats.matched,
        stats.consumption_only,
        stats.price_only
    );

    Alignment { records, stats }
}

fn unify(
    timestamp: NaiveDateTime,
    reading: Option<&ConsumptionRecord>,
    price_cents_per_kwh: Option<f64>,
) -> UnifiedRecord {
    UnifiedRecord {
        timestamp,
        energy_total_kwh: reading.and_then(|r| r.energy_total_kwh),
        energy_night_kwh: reading.and_then(|r| r.energy_night_kwh),
        energy_day_kwh: reading.and_then(|r| r.energy_day_kwh),
        temperature_c: reading.and_then(|r| r.temperature_c),
        price_cents_per_kwh,
        hourly_bill_eur: None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn reading(ts: NaiveDateTime, energy: f64) -> ConsumptionRecord {
        ConsumptionRecord {
            timestamp: ts,
            energy_total_kwh: Some(energy),
            energy_night_kwh: None,
            energy_day_kwh: None,
            temperature_c: Some(-5.0),
        }
    }

    fn price(ts: NaiveDateTime, cents: Option<f64>) -> PriceRecord {
        PriceRecord {
            timestamp: ts,
            price_cents_per_kwh: cents,
        }
    }

    // ── inner join ────────────────────────────────────────────────────────────

    #[test]
    fn test_inner_keeps_only_shared_hours() {
        let consumption = vec![reading(at(1, 10, 0), 2.5), reading(at(1, 11, 0), 1.0)];
        let prices = vec![price(at(1, 10, 0), Some(10.0)), price(at(1, 12, 0), Some(8.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);

        assert_eq!(aligned.records.len(), 1);
        let rec = &aligned.records[0];
        assert_eq!(rec.timestamp, at(1, 10, 0));
        assert_eq!(rec.energy_total_kwh, Some(2.5));
        assert_eq!(rec.temperature_c, Some(-5.0));
        assert_eq!(rec.price_cents_per_kwh, Some(10.0));
        assert_eq!(rec.hourly_bill_eur, None);
    }

    #[test]
    fn test_inner_membership_matches_intersection() {
        let consumption: Vec<_> = (0..24).step_by(2).map(|h| reading(at(2, h, 0), 1.0)).collect();
        let prices: Vec<_> = (0..24).step_by(3).map(|h| price(at(2, h, 0), Some(5.0))).collect();

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);

        let hours: Vec<u32> = aligned
            .records
            .iter()
            .map(|r| chrono::Timelike::hour(&r.timestamp))
            .collect();
        assert_eq!(hours, vec![0, 6, 12, 18]);
        assert_eq!(aligned.stats.matched, 4);
    }

    #[test]
    fn test_inner_keeps_null_price_row() {
        let consumption = vec![reading(at(1, 10, 0), 2.5)];
        let prices = vec![price(at(1, 10, 0), None)];

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);
        assert_eq!(aligned.records.len(), 1);
        assert_eq!(aligned.records[0].price_cents_per_kwh, None);
    }

    // ── outer join ────────────────────────────────────────────────────────────

    #[test]
    fn test_outer_keeps_union_with_nulls() {
        let consumption = vec![reading(at(1, 10, 0), 2.5)];
        let prices = vec![price(at(1, 11, 0), Some(8.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Outer);

        assert_eq!(aligned.records.len(), 2);
        assert_eq!(aligned.records[0].price_cents_per_kwh, None);
        assert_eq!(aligned.records[1].energy_total_kwh, None);
        assert_eq!(aligned.records[1].temperature_c, None);
        assert_eq!(aligned.stats.consumption_only, 1);
        assert_eq!(aligned.stats.price_only, 1);
    }

    #[test]
    fn test_output_sorted_by_timestamp() {
        let consumption = vec![reading(at(3, 5, 0), 1.0), reading(at(1, 5, 0), 1.0)];
        let prices = vec![price(at(2, 5, 0), Some(1.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Outer);
        let ts: Vec<_> = aligned.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![at(1, 5, 0), at(2, 5, 0), at(3, 5, 0)]);
    }

    // ── normalisation ─────────────────────────────────────────────────────────

    #[test]
    fn test_price_rounded_to_hour_before_join() {
        let consumption = vec![reading(at(1, 11, 0), 1.0)];
        let prices = vec![price(at(1, 10, 45), Some(7.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);
        assert_eq!(aligned.records.len(), 1);
        assert_eq!(aligned.records[0].price_cents_per_kwh, Some(7.0));
    }

    #[test]
    fn test_price_collapse_last_write_wins() {
        let consumption = vec![reading(at(1, 11, 0), 1.0)];
        let prices = vec![price(at(1, 10, 50), Some(7.0)), price(at(1, 11, 10), Some(9.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);
        assert_eq!(aligned.records[0].price_cents_per_kwh, Some(9.0));
        assert_eq!(aligned.stats.price_duplicates, 1);
    }

    #[test]
    fn test_duplicate_consumption_is_counted() {
        let consumption = vec![reading(at(1, 3, 0), 1.0), reading(at(1, 3, 0), 2.0)];
        let prices = vec![price(at(1, 3, 0), Some(4.0))];

        let aligned = align(&consumption, &prices, JoinPolicy::Inner);
        assert_eq!(aligned.records.len(), 1);
        assert_eq!(aligned.records[0].energy_total_kwh, Some(2.0));
        assert_eq!(aligned.stats.consumption_duplicates, 1);
    }

    #[test]
    fn test_empty_inputs() {
        let aligned = align(&[], &[], JoinPolicy::Outer);
        assert!(aligned.records.is_empty());
        assert_eq!(aligned.stats, AlignmentStats::default());
    }
}
