//! Market conventions used when moving between quote data and model inputs.
//!
//! Maturities on the grid are calendar days; pricing works in years on an
//! ACT/365 basis.

/// Calendar days per year for converting days-to-expiration to a year fraction.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Convert a strike to log-moneyness: k = ln(K / S).
pub fn log_moneyness(strike: f64, spot: f64) -> f64 {
    (strike / spot).ln()
}

/// Convert calendar days to a year fraction (ACT/365).
pub fn year_fraction(days: i64) -> f64 {
    days as f64 / DAYS_PER_YEAR
}

/// Discount factor e^(−rT).
pub fn discount_factor(rate: f64, expiry: f64) -> f64 {
    (-rate * expiry).exp()
}
