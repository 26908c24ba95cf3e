use crate::models::UnifiedRecord;

// ── Rounding ──────────────────────────────────────────────────────────────────

/// Round `value` to `decimals` places, ties toward positive infinity.
///
/// # Examples
///
/// ```
/// use energy_core::calculations::round_half_up;
///
/// assert_eq!(round_half_up(0.125, 2), 0.13);
/// assert_eq!(round_half_up(-0.125, 2), -0.12);
/// assert_eq!(round_half_up(2.0, 2), 2.0);
/// ```
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    let scaled = value * factor;
    // Nudge by a relative epsilon so binary midpoints such as 0.125 * 100
    // land on the tie rather than just below it.
    let nudged = scaled + f64::EPSILON * scaled.abs().max(1.0) * 4.0;
    (nudged + 0.5).floor() / factor
}

// ── CostCalculator ────────────────────────────────────────────────────────────

/// Stateless hourly cost derivation.
pub struct CostCalculator;

impl CostCalculator {
    /// Decimal places kept on a derived hourly bill.
    pub const BILL_DECIMALS: u32 = 2;

    /// Bill in euros for `energy_kwh` consumed at `price_cents` per kWh,
    /// rounded to whole cents.
    ///
    /// Returns `None` if either operand is missing; a missing bill must never
    /// be counted as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use energy_core::calculations::CostCalculator;
    ///
    /// assert_eq!(CostCalculator::hourly_bill(Some(2.5), Some(10.0)), Some(0.25));
    /// assert_eq!(CostCalculator::hourly_bill(None, Some(10.0)), None);
    /// ```
    pub fn hourly_bill(energy_kwh: Option<f64>, price_cents: Option<f64>) -> Option<f64> {
        let energy = energy_kwh?;
        let price = price_cents?;
        let bill = energy * (price / 100.0);
        if bill.is_finite() {
            Some(round_half_up(bill, Self::BILL_DECIMALS))
        } else {
            None
        }
    }

    /// Return a copy of `record` with `hourly_bill_eur` derived from its
    /// energy and price fields.
    pub fn derive(record: UnifiedRecord) -> UnifiedRecord {
        let hourly_bill_eur = Self::hourly_bill(record.energy_total_kwh, record.price_cents_per_kwh);
        UnifiedRecord {
            hourly_bill_eur,
            ..record
        }
    }

    /// Average price actually paid in cents per kWh: total bill over total
    /// energy. `None` when no energy was consumed.
    pub fn average_paid_price(total_bill_eur: f64, total_energy_kwh: f64) -> Option<f64> {
        if total_energy_kwh == 0.0 {
            return None;
        }
        Some(total_bill_eur * 100.0 / total_energy_kwh)
    }
}

// ── MeanAccumulator ───────────────────────────────────────────────────────────

/// Running arithmetic mean that skips missing values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAccumulator {
    sum: f64,
    count: u32,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// Mean of the values seen so far, or `None` if every value was missing.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / f64::from(self.count))
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
