//! Delimited-text parsing for the consumption and spot-price exports.
//!
//! Turns raw CSV text into typed [`ConsumptionRecord`] and [`PriceRecord`]
//! values. Rows that cannot be parsed are dropped and listed in the returned
//! [`ParseReport`]; only an input with no usable header fails outright.

use std::fmt;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use energy_core::error::{EnergyError, Result};
use energy_core::models::{ConsumptionRecord, PriceRecord, SourceFormat};
use energy_core::time_utils::{parse_timestamp, CONSUMPTION_FORMATS, PRICE_FORMATS};
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Row outcomes ──────────────────────────────────────────────────────────────

/// Why a single row was left out of the typed record set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowIssue {
    #[error("invalid timestamp \"{0}\"")]
    InvalidTimestamp(String),

    #[error("invalid number in {column}: \"{value}\"")]
    InvalidNumber { column: &'static str, value: String },

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// A dropped row together with its 1-based line number in the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: u64,
    pub issue: RowIssue,
}

impl fmt::Display for RejectedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.issue)
    }
}

/// Records parsed from one source plus the rows that were dropped.
#[derive(Debug, Clone)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> ParseReport<T> {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

// ── Column resolution ─────────────────────────────────────────────────────────

/// Column indices of the consumption export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConsumptionColumns {
    timestamp: usize,
    total: usize,
    night: Option<usize>,
    day: Option<usize>,
    temperature: Option<usize>,
}

/// Column indices of the price export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceColumns {
    timestamp: usize,
    price: usize,
}

fn normalise_header(h: &str) -> String {
    h.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn is_timestamp_header(h: &str) -> bool {
    h.contains("time") || h.contains("date")
}

fn find_column(names: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    names.iter().position(|n| pred(n.as_str()))
}

/// Locate consumption columns by header name, falling back to the fixed
/// `[timestamp, total, night, day, temperature]` layout (or the short
/// `[timestamp, total, temperature]` one) when the names are unrecognised.
fn resolve_consumption_columns(headers: &StringRecord) -> Result<ConsumptionColumns> {
    let names: Vec<String> = headers.iter().map(normalise_header).collect();

    let timestamp = find_column(&names, is_timestamp_header);
    let night = find_column(&names, |n| n.contains("night"));
    let day = find_column(&names, |n| n.contains("day") && !is_timestamp_header(n));
    let temperature = find_column(&names, |n| n.contains("temp"));
    let total = find_column(&names, |n| {
        (n.contains("energy") || n.contains("kwh")) && !n.contains("night") && !n.contains("day")
    });

    if let (Some(timestamp), Some(total)) = (timestamp, total) {
        return Ok(ConsumptionColumns {
            timestamp,
            total,
            night,
            day,
            temperature,
        });
    }

    debug!("consumption header not recognised, using positional columns");
    match names.len() {
        n if n >= 5 => Ok(ConsumptionColumns {
            timestamp: 0,
            total: 1,
            night: Some(2),
            day: Some(3),
            temperature: Some(4),
        }),
        3 | 4 => Ok(ConsumptionColumns {
            timestamp: 0,
            total: 1,
            night: None,
            day: None,
            temperature: Some(2),
        }),
        2 => Ok(ConsumptionColumns {
            timestamp: 0,
            total: 1,
            night: None,
            day: None,
            temperature: None,
        }),
        _ => Err(EnergyError::MissingColumn {
            source_name: "consumption",
            column: "energy",
        }),
    }
}

/// Locate price columns by header name. Unnamed columns (a spreadsheet index)
/// are skipped; otherwise the first two named columns are used.
fn resolve_price_columns(headers: &StringRecord) -> Result<PriceColumns> {
    let names: Vec<String> = headers.iter().map(normalise_header).collect();

    let timestamp = find_column(&names, is_timestamp_header);
    let price = find_column(&names, |n| n.contains("price"));
    if let (Some(timestamp), Some(price)) = (timestamp, price) {
        return Ok(PriceColumns { timestamp, price });
    }

    let named: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.is_empty() && !n.starts_with("unnamed"))
        .map(|(i, _)| i)
        .collect();

    match named.as_slice() {
        [ts, value, ..] => Ok(PriceColumns {
            timestamp: *ts,
            price: *value,
        }),
        _ => Err(EnergyError::MissingColumn {
            source_name: "price",
            column: "price",
        }),
    }
}

// ── Field parsing ─────────────────────────────────────────────────────────────

/// Parse a decimal cell, accepting `,` as the decimal separator.
///
/// An empty cell is a missing value; anything else that is not a finite
/// number rejects the row.
pub fn parse_decimal(raw: &str, column: &'static str) -> std::result::Result<Option<f64>, RowIssue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let normalised = trimmed.replace(',', ".");
    match normalised.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(RowIssue::InvalidNumber {
            column,
            value: trimmed.to_string(),
        }),
    }
}

fn optional_decimal(
    record: &StringRecord,
    idx: Option<usize>,
    column: &'static str,
) -> std::result::Result<Option<f64>, RowIssue> {
    match idx.and_then(|i| record.get(i)) {
        Some(raw) => parse_decimal(raw, column),
        None => Ok(None),
    }
}

fn parse_consumption_row(
    record: &StringRecord,
    cols: &ConsumptionColumns,
) -> std::result::Result<ConsumptionRecord, RowIssue> {
    let raw_ts = record
        .get(cols.timestamp)
        .ok_or(RowIssue::MissingField("timestamp"))?;
    let timestamp = parse_timestamp(raw_ts, CONSUMPTION_FORMATS)
        .ok_or_else(|| RowIssue::InvalidTimestamp(raw_ts.trim().to_string()))?;

    let raw_total = record
        .get(cols.total)
        .ok_or(RowIssue::MissingField("energy_total"))?;

    Ok(ConsumptionRecord {
        timestamp,
        energy_total_kwh: parse_decimal(raw_total, "energy_total")?,
        energy_night_kwh: optional_decimal(record, cols.night, "energy_night")?,
        energy_day_kwh: optional_decimal(record, cols.day, "energy_day")?,
        temperature_c: optional_decimal(record, cols.temperature, "temperature")?,
    })
}

fn parse_price_row(
    record: &StringRecord,
    cols: &PriceColumns,
) -> std::result::Result<PriceRecord, RowIssue> {
    let raw_ts = record
        .get(cols.timestamp)
        .ok_or(RowIssue::MissingField("timestamp"))?;
    let timestamp = parse_timestamp(raw_ts, PRICE_FORMATS)
        .ok_or_else(|| RowIssue::InvalidTimestamp(raw_ts.trim().to_string()))?;

    Ok(PriceRecord {
        timestamp,
        price_cents_per_kwh: optional_decimal(record, Some(cols.price), "price")?,
    })
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse the consumption export held in `input`.
pub fn parse_consumption(input: &str, format: SourceFormat) -> Result<ParseReport<ConsumptionRecord>> {
    parse_rows(
        input,
        format,
        "consumption",
        resolve_consumption_columns,
        parse_consumption_row,
    )
}

/// Parse the spot-price export held in `input`.
pub fn parse_prices(input: &str, format: SourceFormat) -> Result<ParseReport<PriceRecord>> {
    parse_rows(input, format, "price", resolve_price_columns, parse_price_row)
}

/// Read and parse a consumption export from disk.
pub fn read_consumption_file(
    path: &Path,
    format: SourceFormat,
) -> Result<ParseReport<ConsumptionRecord>> {
    let input = read_text(path)?;
    parse_consumption(&input, format)
}

/// Read and parse a spot-price export from disk.
pub fn read_price_file(path: &Path, format: SourceFormat) -> Result<ParseReport<PriceRecord>> {
    let input = read_text(path)?;
    parse_prices(&input, format)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Read `path` as text, replacing invalid UTF-8 (older exports are Latin-1).
fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| EnergyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Return `input` without its first `n` lines.
fn skip_lines(input: &str, n: usize) -> &str {
    let mut rest = input;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

/// Generic driver shared by both sources.
///
/// `resolve` maps the header row to column indices; `parse_row` turns one
/// record into a typed value or a [`RowIssue`].
fn parse_rows<T, C>(
    input: &str,
    format: SourceFormat,
    source_name: &'static str,
    resolve: impl FnOnce(&StringRecord) -> Result<C>,
    parse_row: impl Fn(&StringRecord, &C) -> std::result::Result<T, RowIssue>,
) -> Result<ParseReport<T>> {
    let body = skip_lines(input, format.skip_rows);
    let line_offset = format.skip_rows as u64;

    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(EnergyError::EmptyInput(source_name));
    }
    let columns = resolve(&headers)?;

    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for result in reader.records() {
        match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0) + line_offset;
                match parse_row(&record, &columns) {
                    Ok(value) => records.push(value),
                    Err(issue) => {
                        debug!("Dropping {} row at line {}: {}", source_name, line, issue);
                        rejected.push(RejectedRow { line, issue });
                    }
                }
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0) + line_offset;
                debug!("Dropping unreadable {} row at line {}: {}", source_name, line, e);
                rejected.push(RejectedRow {
                    line,
                    issue: RowIssue::Malformed(e.to_string()),
                });
            }
        }
    }

    info!(
        "Parsed {} {} records ({} rejected)",
        records.len(),
        source_name,
        rejected.len()
    );
    if !rejected.is_empty() {
        warn!(
            "{} {} rows dropped; first: {}",
            rejected.len(),
            source_name,
            rejected[0]
        );
    }

    Ok(ParseReport { records, rejected })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    const CONSUMPTION_CSV: &str = "\
Time;Energy (kWh);Energy night (kWh);Energy day (kWh);Temperature
01.01.2024 10:00;2,5;0;2,5;-5,0
01.01.2024 11:00;3,0;0;3,0;-4,5
";

    const PRICE_CSV: &str = "\
Time,Price(cent/kWh)
01-01-2024 10:00:00,10.0
01-01-2024 11:00:00,10.0
";

    // ── parse_decimal ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_decimal_comma_matches_period() {
        let comma = parse_decimal("2,75", "energy_total").unwrap();
        let period = parse_decimal("2.75", "energy_total").unwrap();
        assert_eq!(comma, Some(2.75));
        assert_eq!(comma, period);
    }

    #[test]
    fn test_parse_decimal_negative_and_empty() {
        assert_eq!(parse_decimal("-1,25", "price").unwrap(), Some(-1.25));
        assert_eq!(parse_decimal("  ", "price").unwrap(), None);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        let err = parse_decimal("abc", "temperature").unwrap_err();
        assert_eq!(
            err,
            RowIssue::InvalidNumber {
                column: "temperature",
                value: "abc".to_string()
            }
        );
        assert!(parse_decimal("NaN", "price").is_err());
    }

    // ── parse_consumption ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_consumption_five_columns() {
        let report = parse_consumption(CONSUMPTION_CSV, SourceFormat::CONSUMPTION).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.rejected_count(), 0);

        let first = &report.records[0];
        assert_eq!(first.timestamp, at(2024, 1, 1, 10));
        assert_eq!(first.energy_total_kwh, Some(2.5));
        assert_eq!(first.energy_night_kwh, Some(0.0));
        assert_eq!(first.energy_day_kwh, Some(2.5));
        assert_eq!(first.temperature_c, Some(-5.0));
    }

    #[test]
    fn test_parse_consumption_short_variant_by_header() {
        let csv = "Time;Energy(kWh);Temperature\n15.03.2023 07:00;1,2;3,4\n";
        let report = parse_consumption(csv, SourceFormat::CONSUMPTION).unwrap();

        let rec = &report.records[0];
        assert_eq!(rec.energy_total_kwh, Some(1.2));
        assert_eq!(rec.energy_night_kwh, None);
        assert_eq!(rec.energy_day_kwh, None);
        assert_eq!(rec.temperature_c, Some(3.4));
    }

    #[test]
    fn test_parse_consumption_positional_fallback() {
        let csv = "Aika;Energia;Yö;Päivä;Lämpötila\n01.02.2024 00:00;1,0;1,0;0;-10\n";
        let report = parse_consumption(csv, SourceFormat::CONSUMPTION).unwrap();

        let rec = &report.records[0];
        assert_eq!(rec.timestamp, at(2024, 2, 1, 0));
        assert_eq!(rec.energy_night_kwh, Some(1.0));
        assert_eq!(rec.temperature_c, Some(-10.0));
    }

    #[test]
    fn test_parse_consumption_drops_bad_timestamp() {
        let csv = "\
Time;Energy (kWh);Energy night (kWh);Energy day (kWh);Temperature
01.01.2024 10:00;2,5;0;2,5;-5,0
2024-01-01 11:00;3,0;0;3,0;-4,5
";
        let report = parse_consumption(csv, SourceFormat::CONSUMPTION).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 3);
        assert!(matches!(
            report.rejected[0].issue,
            RowIssue::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn test_parse_consumption_drops_bad_number() {
        let csv = "\
Time;Energy (kWh);Energy night (kWh);Energy day (kWh);Temperature
01.01.2024 10:00;x;0;2,5;-5,0
";
        let report = parse_consumption(csv, SourceFormat::CONSUMPTION).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(
            report.rejected[0].issue,
            RowIssue::InvalidNumber {
                column: "energy_total",
                value: "x".to_string()
            }
        );
    }

    #[test]
    fn test_parse_consumption_empty_cells_are_missing() {
        let csv = "\
Time;Energy (kWh);Energy night (kWh);Energy day (kWh);Temperature
01.01.2024 10:00;;0;;
";
        let report = parse_consumption(csv, SourceFormat::CONSUMPTION).unwrap();
        let rec = &report.records[0];
        assert_eq!(rec.energy_total_kwh, None);
        assert_eq!(rec.energy_day_kwh, None);
        assert_eq!(rec.temperature_c, None);
    }

    #[test]
    fn test_parse_consumption_empty_input_fails() {
        let err = parse_consumption("", SourceFormat::CONSUMPTION).unwrap_err();
        assert!(matches!(err, EnergyError::EmptyInput("consumption")));
    }

    #[test]
    fn test_parse_consumption_single_column_fails() {
        let err = parse_consumption("Readings\n1\n", SourceFormat::CONSUMPTION).unwrap_err();
        assert!(matches!(err, EnergyError::MissingColumn { .. }));
    }

    // ── parse_prices ──────────────────────────────────────────────────────────

    #[test]
    fn test_parse_prices_day_first() {
        let report = parse_prices(PRICE_CSV, SourceFormat::PRICE).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].timestamp, at(2024, 1, 1, 10));
        assert_eq!(report.records[0].price_cents_per_kwh, Some(10.0));
    }

    #[test]
    fn test_parse_prices_spreadsheet_export() {
        let csv = "\
Spot prices
Source: exchange
VAT 24%
,Aika,Hinta
0,2024-10-31 05:00:00,\"4,12\"
1,2024-10-31 06:00:00,
";
        let format = SourceFormat {
            delimiter: b',',
            skip_rows: 3,
        };
        let report = parse_prices(csv, format).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].timestamp, at(2024, 10, 31, 5));
        assert_eq!(report.records[0].price_cents_per_kwh, Some(4.12));
        assert_eq!(report.records[1].price_cents_per_kwh, None);
    }

    #[test]
    fn test_parse_prices_negative_price() {
        let csv = "Time,Price\n2024-05-05 13:00:00,-0.52\n";
        let report = parse_prices(csv, SourceFormat::PRICE).unwrap();
        assert_eq!(report.records[0].price_cents_per_kwh, Some(-0.52));
    }

    #[test]
    fn test_parse_prices_reports_line_after_skip() {
        let csv = "banner\nTime,Price\nnot a time,1.0\n";
        let format = SourceFormat {
            delimiter: b',',
            skip_rows: 1,
        };
        let report = parse_prices(csv, format).unwrap();
        assert_eq!(report.rejected[0].line, 3);
    }

    // ── file reading ──────────────────────────────────────────────────────────

    #[test]
    fn test_read_consumption_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("consumption.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", CONSUMPTION_CSV).unwrap();

        let report = read_consumption_file(&path, SourceFormat::CONSUMPTION).unwrap();
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn test_read_price_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = read_price_file(&dir.path().join("nope.csv"), SourceFormat::PRICE).unwrap_err();
        assert!(matches!(err, EnergyError::FileRead { .. }));
    }
}
