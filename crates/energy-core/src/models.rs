use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EnergyError;

/// One hourly reading from the household consumption export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// Local wall-clock time of the reading, minute resolution.
    pub timestamp: NaiveDateTime,
    /// Energy consumed during the hour.
    pub energy_total_kwh: Option<f64>,
    /// Night-tariff share; absent in the single-column export.
    #[serde(default)]
    pub energy_night_kwh: Option<f64>,
    /// Day-tariff share; absent in the single-column export.
    #[serde(default)]
    pub energy_day_kwh: Option<f64>,
    /// Outdoor temperature in degrees Celsius.
    pub temperature_c: Option<f64>,
}

/// One spot-price tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Local wall-clock time the price applies to, as found in the source.
    pub timestamp: NaiveDateTime,
    /// Spot price in euro cents per kWh; may be negative.
    pub price_cents_per_kwh: Option<f64>,
}

/// A consumption reading and a spot price aligned on the same hour.
///
/// Under an outer join either side may be missing, in which case the fields
/// of that side are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub timestamp: NaiveDateTime,
    pub energy_total_kwh: Option<f64>,
    pub energy_night_kwh: Option<f64>,
    pub energy_day_kwh: Option<f64>,
    pub temperature_c: Option<f64>,
    pub price_cents_per_kwh: Option<f64>,
    /// `energy_total_kwh * price / 100`, rounded to cents. `None` whenever
    /// either operand is missing.
    pub hourly_bill_eur: Option<f64>,
}

/// Which timestamps survive alignment of the two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Only hours present in both sources (batch report).
    #[default]
    Inner,
    /// Every hour present in either source (dashboard).
    Outer,
}

impl FromStr for JoinPolicy {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inner" => Ok(JoinPolicy::Inner),
            "outer" => Ok(JoinPolicy::Outer),
            other => Err(EnergyError::InvalidJoinPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPolicy::Inner => write!(f, "inner"),
            JoinPolicy::Outer => write!(f, "outer"),
        }
    }
}

/// Calendar period used to bucket unified records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// All granularities in report order.
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// Adjective used in report headings, e.g. `"Daily"`.
    pub fn title(&self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
        }
    }
}

impl FromStr for Granularity {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" | "d" => Ok(Granularity::Day),
            "week" | "weekly" | "w" => Ok(Granularity::Week),
            "month" | "monthly" | "m" => Ok(Granularity::Month),
            other => Err(EnergyError::InvalidGranularity(other.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

/// Reduced values for one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// First instant of the period; buckets are ordered by this.
    pub period_start: NaiveDateTime,
    /// Display label. Equal to `period_start` for days and weeks, the
    /// month-end date for months.
    pub label: NaiveDateTime,
    /// Number of unified records that fell into the period.
    pub record_count: usize,
    /// Sum of `energy_total_kwh`, nulls skipped.
    pub energy_sum_kwh: f64,
    /// Sum of `hourly_bill_eur`, nulls skipped.
    pub bill_sum_eur: f64,
    /// Mean of the non-null prices, `None` if there were none.
    pub price_mean_cents: Option<f64>,
    /// Mean of the non-null temperatures, `None` if there were none.
    pub temperature_mean_c: Option<f64>,
}

/// Inclusive timestamp bounds applied to the unified series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Whether `ts` lies within both bounds (missing bounds are open).
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.start.map_or(true, |s| *ts >= s) && self.end.map_or(true, |e| *ts <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Layout of a delimited input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    /// Single-byte field delimiter.
    pub delimiter: u8,
    /// Lines to discard before the header row.
    pub skip_rows: usize,
}

impl SourceFormat {
    /// Consumption export: semicolon separated, header on the first line.
    pub const CONSUMPTION: SourceFormat = SourceFormat {
        delimiter: b';',
        skip_rows: 0,
    };

    /// Price export: comma separated, header on the first line.
    pub const PRICE: SourceFormat = SourceFormat {
        delimiter: b',',
        skip_rows: 0,
    };

    /// Build a format from a delimiter character, which must be ASCII.
    pub fn new(delimiter: char, skip_rows: usize) -> Result<Self, EnergyError> {
        if !delimiter.is_ascii() {
            return Err(EnergyError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                delimiter
            )));
        }
        Ok(Self {
            delimiter: delimiter as u8,
            skip_rows,
        })
    }
}

/// Parameters of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineParams {
    pub join: JoinPolicy,
    pub range: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    // ── JoinPolicy ────────────────────────────────────────────────────────────

    #[test]
    fn test_join_policy_from_str() {
        assert_eq!("inner".parse::<JoinPolicy>().unwrap(), JoinPolicy::Inner);
        assert_eq!("OUTER".parse::<JoinPolicy>().unwrap(), JoinPolicy::Outer);
        assert!("left".parse::<JoinPolicy>().is_err());
    }

    #[test]
    fn test_join_policy_display_round_trips() {
        for policy in [JoinPolicy::Inner, JoinPolicy::Outer] {
            assert_eq!(policy.to_string().parse::<JoinPolicy>().unwrap(), policy);
        }
    }

    // ── Granularity ───────────────────────────────────────────────────────────

    #[test]
    fn test_granularity_accepts_aliases() {
        assert_eq!("daily".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("W".parse::<Granularity>().unwrap(), Granularity::Week);
        assert_eq!("month".parse::<Granularity>().unwrap(), Granularity::Month);
        assert!("hourly".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_granularity_serde_lowercase() {
        let json = serde_json::to_string(&Granularity::Week).unwrap();
        assert_eq!(json, "\"week\"");
    }

    // ── DateRange ─────────────────────────────────────────────────────────────

    #[test]
    fn test_date_range_inclusive_bounds() {
        let range = DateRange::new(Some(at(2024, 1, 1, 0)), Some(at(2024, 1, 31, 0)));
        assert!(range.contains(&at(2024, 1, 1, 0)));
        assert!(range.contains(&at(2024, 1, 31, 0)));
        assert!(!range.contains(&at(2024, 1, 31, 1)));
        assert!(!range.contains(&at(2023, 12, 31, 23)));
    }

    #[test]
    fn test_date_range_open_bounds() {
        let range = DateRange::default();
        assert!(range.is_unbounded());
        assert!(range.contains(&at(1999, 1, 1, 0)));

        let from = DateRange::new(Some(at(2024, 6, 1, 0)), None);
        assert!(from.contains(&at(2030, 1, 1, 0)));
        assert!(!from.contains(&at(2024, 5, 31, 23)));
    }
}
