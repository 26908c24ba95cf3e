//! Main pipeline for the energy bill report.
//!
//! Aligns the parsed sources, derives the hourly bill, applies the date-range
//! filter and aggregates into the requested periods. Every call starts from
//! its inputs; nothing is cached between runs.

use std::path::Path;

use energy_core::calculations::CostCalculator;
use energy_core::error::Result;
use energy_core::models::{
    AggregateBucket, ConsumptionRecord, Granularity, PipelineParams, PriceRecord, SourceFormat,
    UnifiedRecord,
};
use serde::Serialize;
use tracing::info;

use crate::aggregator::{PeriodTotals, RecordAggregator};
use crate::aligner::{align, AlignmentStats};
use crate::reader::{read_consumption_file, read_price_file};

// ── Public types ──────────────────────────────────────────────────────────────

/// Unified, costed and filtered hourly series ready for aggregation.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub records: Vec<UnifiedRecord>,
    pub alignment: AlignmentStats,
}

/// Buckets for one granularity plus totals over the filtered range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub granularity: Granularity,
    pub buckets: Vec<AggregateBucket>,
    pub totals: PeriodTotals,
}

/// Row counts gathered while loading the two input files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisMetadata {
    pub consumption_rows: usize,
    pub consumption_rejected: usize,
    pub price_rows: usize,
    pub price_rejected: usize,
    pub alignment: AlignmentStats,
    /// Unified records left after the date-range filter.
    pub records_in_range: usize,
}

/// The complete output of [`analyze_files`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub reports: Vec<PeriodReport>,
    pub totals: PeriodTotals,
    pub metadata: AnalysisMetadata,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Align, cost and filter the two record sets.
///
/// 1. Join on hour-normalised timestamp under `params.join`.
/// 2. Derive `hourly_bill_eur` on every unified record.
/// 3. Keep records inside `params.range` (inclusive).
pub fn prepare_series(
    consumption: &[ConsumptionRecord],
    prices: &[PriceRecord],
    params: &PipelineParams,
) -> PreparedSeries {
    let alignment = align(consumption, prices, params.join);

    let records: Vec<UnifiedRecord> = alignment
        .records
        .into_iter()
        .filter(|r| params.range.contains(&r.timestamp))
        .map(CostCalculator::derive)
        .collect();

    info!(
        "{} unified records in range ({} join)",
        records.len(),
        params.join
    );

    PreparedSeries {
        records,
        alignment: alignment.stats,
    }
}

impl PreparedSeries {
    /// Aggregate the series at `granularity`.
    pub fn report(&self, granularity: Granularity) -> PeriodReport {
        let buckets = RecordAggregator::aggregate(&self.records, granularity);
        info!("{} {} buckets", buckets.len(), granularity);
        PeriodReport {
            granularity,
            buckets,
            totals: self.totals(),
        }
    }

    pub fn totals(&self) -> PeriodTotals {
        RecordAggregator::calculate_totals(&self.records)
    }
}

/// Pipeline entry point: records in, ordered buckets and totals out.
pub fn analyze(
    consumption: &[ConsumptionRecord],
    prices: &[PriceRecord],
    params: &PipelineParams,
    granularity: Granularity,
) -> PeriodReport {
    prepare_series(consumption, prices, params).report(granularity)
}

/// Load both exports from disk and run the pipeline once per granularity.
///
/// Only unreadable files or inputs without a usable header fail; malformed
/// rows are dropped and counted in the metadata.
pub fn analyze_files(
    consumption_path: &Path,
    consumption_format: SourceFormat,
    price_path: &Path,
    price_format: SourceFormat,
    params: &PipelineParams,
    granularities: &[Granularity],
) -> Result<AnalysisResult> {
    let consumption = read_consumption_file(consumption_path, consumption_format)?;
    let prices = read_price_file(price_path, price_format)?;

    let series = prepare_series(&consumption.records, &prices.records, params);
    let reports = granularities.iter().map(|g| series.report(*g)).collect();

    let metadata = AnalysisMetadata {
        consumption_rows: consumption.records.len(),
        consumption_rejected: consumption.rejected_count(),
        price_rows: prices.records.len(),
        price_rejected: prices.rejected_count(),
        alignment: series.alignment.clone(),
        records_in_range: series.records.len(),
    };

    Ok(AnalysisResult {
        reports,
        totals: series.totals(),
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
