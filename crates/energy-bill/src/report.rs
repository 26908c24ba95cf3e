//! Console and JSON rendering of an [`AnalysisResult`].
//!
//! One table per granularity with a totals footer, followed by the summary
//! figures for the selected range.

use energy_core::formatting::{format_euro, format_number, format_optional, format_period_label};
use energy_data::aggregator::PeriodTotals;
use energy_data::analysis::{AnalysisMetadata, AnalysisResult, PeriodReport};
use unicode_width::UnicodeWidthStr;

const HEADERS: [&str; 5] = [
    "Period",
    "Energy (kWh)",
    "Bill (€)",
    "Price (c/kWh)",
    "Temp (°C)",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Render every period table plus the summary as plain text.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();
    for report in &result.reports {
        out.push_str(&render_table(report));
        out.push('\n');
    }
    out.push_str(&render_summary(&result.totals, &result.metadata));
    out
}

/// Serialise the whole result as pretty-printed JSON.
pub fn render_json(result: &AnalysisResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Render a single period table with a totals row.
pub fn render_table(report: &PeriodReport) -> String {
    let body: Vec<[String; 5]> = report
        .buckets
        .iter()
        .map(|b| {
            [
                format_period_label(b.label, report.granularity),
                format_number(b.energy_sum_kwh, 2),
                format_number(b.bill_sum_eur, 2),
                format_optional(b.price_mean_cents, 2),
                format_optional(b.temperature_mean_c, 1),
            ]
        })
        .collect();

    let totals = &report.totals;
    let total_row = [
        "Total".to_string(),
        format_number(totals.total_energy_kwh, 2),
        format_number(totals.total_bill_eur, 2),
        format_optional(totals.average_price_cents, 2),
        String::new(),
    ];

    let header = HEADERS.map(|h| h.to_string());
    let mut widths = [0usize; 5];
    for row in std::iter::once(&header)
        .chain(body.iter())
        .chain(std::iter::once(&total_row))
    {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.width());
        }
    }

    let mut out = format!(
        "{} consumption and bill ({} periods)\n",
        report.granularity.title(),
        report.buckets.len()
    );
    out.push_str(&format_row(&header, &widths));
    out.push_str(&separator(&widths));
    for row in &body {
        out.push_str(&format_row(row, &widths));
    }
    out.push_str(&separator(&widths));
    out.push_str(&format_row(&total_row, &widths));
    out
}

/// Render the range summary and data-quality counters.
pub fn render_summary(totals: &PeriodTotals, metadata: &AnalysisMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Total consumption over the period: {} kWh\n",
        format_number(totals.total_energy_kwh, 2)
    ));
    out.push_str(&format!(
        "Total bill over the period: {}\n",
        format_euro(totals.total_bill_eur)
    ));
    out.push_str(&format!(
        "Average hourly price: {} cents\n",
        format_optional(totals.average_price_cents, 2)
    ));
    out.push_str(&format!(
        "Average paid price: {} cents\n",
        format_optional(totals.average_paid_price_cents, 2)
    ));
    out.push_str(&format!(
        "Records: {} in range, {} consumption rows ({} dropped), {} price rows ({} dropped)\n",
        metadata.records_in_range,
        metadata.consumption_rows,
        metadata.consumption_rejected,
        metadata.price_rows,
        metadata.price_rejected
    ));
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Left-align the first column, right-align the numeric ones.
fn format_row(cells: &[String], widths: &[usize; 5]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        let pad = " ".repeat(width.saturating_sub(cell.width()));
        if i == 0 {
            line.push_str(cell);
            line.push_str(&pad);
        } else {
            line.push_str("  ");
            line.push_str(&pad);
            line.push_str(cell);
        }
    }
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

fn separator(widths: &[usize; 5]) -> String {
    let total = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    format!("{}\n", "─".repeat(total))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
