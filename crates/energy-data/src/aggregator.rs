//! Aggregation of unified hourly records over day, week and month windows.
//!
//! Energy and bill are summed; price and temperature are averaged over the
//! non-missing values. Periods without records are not emitted.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use energy_core::calculations::{CostCalculator, MeanAccumulator};
use energy_core::models::{AggregateBucket, Granularity, UnifiedRecord};
use energy_core::time_utils::{period_label, period_start};
use serde::Serialize;

// ── BucketStats ───────────────────────────────────────────────────────────────

/// Running reductions for one period.
#[derive(Debug, Clone, Default)]
struct BucketStats {
    record_count: usize,
    energy_sum_kwh: f64,
    bill_sum_eur: f64,
    price: MeanAccumulator,
    temperature: MeanAccumulator,
}

impl BucketStats {
    fn add_record(&mut self, record: &UnifiedRecord) {
        self.record_count += 1;
        self.energy_sum_kwh += record.energy_total_kwh.unwrap_or(0.0);
        self.bill_sum_eur += record.hourly_bill_eur.unwrap_or(0.0);
        self.price.push(record.price_cents_per_kwh);
        self.temperature.push(record.temperature_c);
    }

    fn into_bucket(self, start: NaiveDateTime, granularity: Granularity) -> AggregateBucket {
        AggregateBucket {
            period_start: start,
            label: period_label(start, granularity),
            record_count: self.record_count,
            energy_sum_kwh: self.energy_sum_kwh,
            bill_sum_eur: self.bill_sum_eur,
            price_mean_cents: self.price.mean(),
            temperature_mean_c: self.temperature.mean(),
        }
    }
}

// ── PeriodTotals ──────────────────────────────────────────────────────────────

/// Totals over a whole record series, shown beside the bucket table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub record_count: usize,
    pub total_energy_kwh: f64,
    pub total_bill_eur: f64,
    /// Mean hourly spot price over the non-missing prices.
    pub average_price_cents: Option<f64>,
    /// Total bill divided by total energy, in cents per kWh.
    pub average_paid_price_cents: Option<f64>,
}

// ── RecordAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that groups unified records by calendar period.
pub struct RecordAggregator;

impl RecordAggregator {
    /// Aggregate `records` by calendar day.
    pub fn aggregate_daily(records: &[UnifiedRecord]) -> Vec<AggregateBucket> {
        Self::aggregate(records, Granularity::Day)
    }

    /// Aggregate `records` by Monday-starting week.
    pub fn aggregate_weekly(records: &[UnifiedRecord]) -> Vec<AggregateBucket> {
        Self::aggregate(records, Granularity::Week)
    }

    /// Aggregate `records` by calendar month (labelled by month end).
    pub fn aggregate_monthly(records: &[UnifiedRecord]) -> Vec<AggregateBucket> {
        Self::aggregate(records, Granularity::Month)
    }

    /// Partition `records` into `granularity` periods and reduce each.
    ///
    /// Returns one bucket per period that received at least one record,
    /// ascending by `period_start`.
    pub fn aggregate(records: &[UnifiedRecord], granularity: Granularity) -> Vec<AggregateBucket> {
        let mut map: BTreeMap<NaiveDateTime, BucketStats> = BTreeMap::new();

        for record in records {
            map.entry(period_start(record.timestamp, granularity))
                .or_default()
                .add_record(record);
        }

        map.into_iter()
            .map(|(start, stats)| stats.into_bucket(start, granularity))
            .collect()
    }

    /// Totals over every record in `records`.
    pub fn calculate_totals(records: &[UnifiedRecord]) -> PeriodTotals {
        let mut stats = BucketStats::default();
        for record in records {
            stats.add_record(record);
        }
        PeriodTotals {
            record_count: stats.record_count,
            total_energy_kwh: stats.energy_sum_kwh,
            total_bill_eur: stats.bill_sum_eur,
            average_price_cents: stats.price.mean(),
            average_paid_price_cents: CostCalculator::average_paid_price(
                stats.bill_sum_eur,
                stats.energy_sum_kwh,
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
