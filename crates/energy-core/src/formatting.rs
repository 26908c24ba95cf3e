use chrono::NaiveDateTime;

use crate::models::Granularity;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use energy_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Half-ULP nudge so that exact decimal midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a euro amount with two decimals and a trailing sign.
///
/// # Examples
///
/// ```
/// use energy_core::formatting::format_euro;
///
/// assert_eq!(format_euro(1234.56), "1,234.56 €");
/// assert_eq!(format_euro(-0.3), "-0.30 €");
/// ```
pub fn format_euro(amount: f64) -> String {
    format!("{} €", format_number(amount, 2))
}

/// Format an optional value, rendering a missing value as `"-"`.
pub fn format_optional(value: Option<f64>, decimals: u32) -> String {
    value
        .map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "-".to_string())
}

/// Render a bucket label for a report row.
///
/// Days and months print as a date (months show their last day); weeks add
/// the ISO week number.
pub fn format_period_label(label: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day | Granularity::Month => label.format("%Y-%m-%d").to_string(),
        Granularity::Week => label.format("%Y-%m-%d (W%V)").to_string(),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(123.0, 0), "123");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
        assert_eq!(format_number(123.456, 2), "123.46");
    }

    #[test]
    fn test_format_number_negative_zero_has_no_sign() {
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    // ── format_euro ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_euro() {
        assert_eq!(format_euro(0.0), "0.00 €");
        assert_eq!(format_euro(1_000_000.0), "1,000,000.00 €");
    }

    // ── format_optional ──────────────────────────────────────────────────────

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(-5.25), 1), "-5.3");
        assert_eq!(format_optional(None, 2), "-");
    }

    // ── format_period_label ──────────────────────────────────────────────────

    #[test]
    fn test_format_period_label() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_period_label(ts, Granularity::Day), "2024-01-01");
        assert_eq!(format_period_label(ts, Granularity::Week), "2024-01-01 (W01)");
    }
}
