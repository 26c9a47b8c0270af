//! Single-maturity smile slices.
//!
//! A [`Skew`] is the implied vol of every quote sharing one expiration,
//! plotted against either log-moneyness or call-equivalent delta. Puts are
//! mapped onto the call delta scale through put-call parity of deltas
//! (Δ_call = Δ_put + 1) so both wings share one axis.

use serde::{Deserialize, Serialize};

use crate::error::{self, VolGridError};
use crate::pricing::delta;
use crate::quote::OptionQuote;
use crate::types::OptionType;

/// Abscissa of a skew slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkewAxis {
    /// ln(K / S).
    LogMoneyness,
    /// Call-equivalent delta in percent (0..100).
    ///
    /// Vendor deltas are used when present. When `rate` is given, a missing
    /// delta is computed from the quote's implied vol; otherwise quotes
    /// without a vendor delta are skipped.
    Delta { rate: Option<f64> },
}

/// One point of a skew slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewPoint {
    pub x: f64,
    pub implied_vol: f64,
    pub strike: f64,
    pub option_type: OptionType,
}

/// Implied vols of one expiration, sorted by `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skew {
    /// Days to expiration of the slice.
    pub maturity: i64,
    pub axis: SkewAxis,
    pub points: Vec<SkewPoint>,
}

/// Extract the smile of the nearest maturity at or beyond `min_days`.
///
/// Quotes without a finite implied vol are skipped, as are quotes whose
/// delta cannot be determined on the delta axis.
///
/// # Errors
/// Returns [`VolGridError::EmptyGrid`] if no quote expires in `min_days`
/// days or later.
pub fn skew(quotes: &[OptionQuote], min_days: i64, axis: SkewAxis) -> error::Result<Skew> {
    let maturity = quotes
        .iter()
        .map(OptionQuote::days_to_expiration)
        .filter(|&days| days >= min_days)
        .min()
        .ok_or_else(|| VolGridError::EmptyGrid {
            message: format!("no quote expires in {min_days} days or later"),
        })?;

    let mut points: Vec<SkewPoint> = quotes
        .iter()
        .filter(|q| q.days_to_expiration() == maturity)
        .filter_map(|q| {
            let implied_vol = q.implied_vol.filter(|v| v.is_finite())?;
            let x = match axis {
                SkewAxis::LogMoneyness => q.log_moneyness(),
                SkewAxis::Delta { rate } => call_delta(q, implied_vol, rate)? * 100.0,
            };
            x.is_finite().then_some(SkewPoint {
                x,
                implied_vol,
                strike: q.strike,
                option_type: q.option_type,
            })
        })
        .collect();
    points.sort_by(|a, b| a.x.total_cmp(&b.x));

    #[cfg(feature = "logging")]
    tracing::debug!(maturity, n_points = points.len(), axis = ?axis, "skew extracted");

    Ok(Skew {
        maturity,
        axis,
        points,
    })
}

fn call_delta(quote: &OptionQuote, implied_vol: f64, rate: Option<f64>) -> Option<f64> {
    let raw = match (quote.delta(), rate) {
        (Some(d), _) => d,
        (None, Some(r)) => {
            let expiry = quote.time_to_expiry();
            if expiry <= 0.0 || implied_vol <= 0.0 {
                return None;
            }
            delta(quote.option_type, quote.spot, quote.strike, expiry, r, implied_vol)
        }
        (None, None) => return None,
    };
    Some(match quote.option_type {
        OptionType::Call => raw,
        OptionType::Put => raw + 1.0,
    })
}
