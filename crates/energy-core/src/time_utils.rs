use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::error::{EnergyError, Result};
use crate::models::Granularity;

// ── Timestamp layouts ─────────────────────────────────────────────────────────

/// Layouts used by the consumption export (`dd.mm.yyyy HH:MM`).
pub const CONSUMPTION_FORMATS: &[&str] = &["%d.%m.%Y %H:%M", "%d.%m.%Y %H:%M:%S"];

/// Layouts used by the two price exports: the day-first CSV and the
/// ISO-like spreadsheet export.
pub const PRICE_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Layouts accepted for date-range bounds given by the user.
const DATE_BOUND_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parse `raw` with the first matching layout in `formats`.
///
/// Surrounding whitespace is ignored. Returns `None` when no layout matches;
/// the caller decides what an unparseable timestamp means for its row.
pub fn parse_timestamp(raw: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    debug!("could not parse timestamp \"{}\"", s);
    None
}

/// Parse a user supplied date bound into midnight of that day.
///
/// A full `YYYY-MM-DD HH:MM` timestamp is accepted as well and kept as is.
pub fn parse_date_bound(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    for fmt in DATE_BOUND_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    if let Some(ts) = parse_timestamp(s, &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"]) {
        return Ok(ts);
    }
    Err(EnergyError::InvalidDate(s.to_string()))
}

// ── Hour normalisation ────────────────────────────────────────────────────────

/// Round `ts` to the nearest whole hour.
///
/// An exact half-hour goes to the even hour, so `10:30` becomes `10:00` and
/// `11:30` becomes `12:00`.
pub fn round_to_nearest_hour(ts: NaiveDateTime) -> NaiveDateTime {
    let floor = truncate_to_hour(ts);
    let offset = ts - floor;
    let half = Duration::minutes(30);

    if offset < half {
        floor
    } else if offset > half || floor.hour() % 2 == 1 {
        floor + Duration::hours(1)
    } else {
        floor
    }
}

/// Drop minutes, seconds and sub-second precision from `ts`.
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    let hour = NaiveTime::from_hms_opt(ts.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
    ts.date().and_time(hour)
}

// ── Calendar periods ──────────────────────────────────────────────────────────

/// First instant of the period containing `ts`.
///
/// * Day   – midnight of the calendar date.
/// * Week  – midnight of the Monday starting the ISO week.
/// * Month – midnight of the first day of the month.
pub fn period_start(ts: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    let date = ts.date();
    let start = match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Month => date.with_day(1).unwrap_or(date),
    };
    start.and_time(NaiveTime::MIN)
}

/// Display label for the period that begins at `start`.
///
/// Days and weeks are labelled by their start; months by their last day, so a
/// monthly row reads as a month-end summary.
pub fn period_label(start: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    match granularity {
        Granularity::Day | Granularity::Week => start,
        Granularity::Month => month_end(start.date()).and_time(NaiveTime::MIN),
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
