//! Closed-form Black-Scholes pricing of European vanilla options.
//!
//! # Formula
//! ```text
//! d1 = (ln(S/K) + (r + σ²/2)·T) / (σ·√T)
//! d2 = d1 − σ·√T
//! C  = S·Φ(d1) − K·e^(−rT)·Φ(d2)
//! P  = K·e^(−rT)·Φ(−d2) − S·Φ(−d1)
//! ```
//!
//! The unchecked functions sit on the implied vol solver's hot path and do
//! no validation. They require `spot`, `strike`, `expiry` and `vol` to be
//! strictly positive; other inputs give unspecified results. Use
//! [`try_price_option`] / [`try_straddle_price`] at API boundaries.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

use crate::conventions::discount_factor;
use crate::error;
use crate::types::OptionType;
use crate::validate::{validate_finite, validate_positive};

/// Standard normal CDF Φ(x).
///
/// Written through `erfc` so the lower tail keeps full relative precision.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

fn d1_d2(spot: f64, strike: f64, expiry: f64, rate: f64, vol: f64) -> (f64, f64) {
    let vol_sqrt_t = vol * expiry.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * expiry) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

fn debug_check_preconditions(spot: f64, strike: f64, expiry: f64, vol: f64) {
    debug_assert!(spot > 0.0, "spot must be positive, got {spot}");
    debug_assert!(strike > 0.0, "strike must be positive, got {strike}");
    debug_assert!(expiry > 0.0, "expiry must be positive, got {expiry}");
    debug_assert!(vol > 0.0, "vol must be positive, got {vol}");
}

/// Black-Scholes price of a European call or put.
///
/// # Arguments
/// * `option_type` — Call or Put
/// * `spot` — Spot price `S` (> 0)
/// * `strike` — Strike `K` (> 0)
/// * `expiry` — Time to expiry `T` in years (> 0)
/// * `rate` — Continuously compounded risk-free rate `r` (may be negative)
/// * `vol` — Volatility `σ` (> 0)
///
/// # Examples
/// ```
/// use volgrid::pricing::price_option;
/// use volgrid::OptionType;
///
/// let call = price_option(OptionType::Call, 100.0, 100.0, 1.0, 0.05, 0.2);
/// assert!((call - 10.4506).abs() < 1e-4);
/// ```
pub fn price_option(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
) -> f64 {
    debug_check_preconditions(spot, strike, expiry, vol);
    let (d1, d2) = d1_d2(spot, strike, expiry, rate, vol);
    let df = discount_factor(rate, expiry);
    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Price of a long straddle (call + put at the same strike).
pub fn straddle_price(spot: f64, strike: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    price_option(OptionType::Call, spot, strike, expiry, rate, vol)
        + price_option(OptionType::Put, spot, strike, expiry, rate, vol)
}

/// Black-Scholes delta ∂V/∂S: Φ(d1) for calls, Φ(d1) − 1 for puts.
///
/// Same preconditions as [`price_option`].
pub fn delta(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
) -> f64 {
    debug_check_preconditions(spot, strike, expiry, vol);
    let (d1, _) = d1_d2(spot, strike, expiry, rate, vol);
    match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    }
}

/// No-arbitrage lower bound of a European option price.
///
/// Calls: max(0, S − K·e^(−rT)). Puts: max(0, K·e^(−rT) − S).
pub fn intrinsic_lower_bound(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
) -> f64 {
    let pv_strike = strike * discount_factor(rate, expiry);
    match option_type {
        OptionType::Call => (spot - pv_strike).max(0.0),
        OptionType::Put => (pv_strike - spot).max(0.0),
    }
}

fn validate_pricing_inputs(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
) -> error::Result<()> {
    validate_positive(spot, "spot")?;
    validate_positive(strike, "strike")?;
    validate_positive(expiry, "expiry")?;
    validate_finite(rate, "rate")?;
    validate_positive(vol, "vol")?;
    Ok(())
}

/// Validated version of [`price_option`].
///
/// # Errors
/// Returns [`VolGridError::InvalidInput`](crate::VolGridError::InvalidInput)
/// if spot, strike, expiry or vol is not positive and finite, or the rate is
/// not finite.
pub fn try_price_option(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
) -> error::Result<f64> {
    validate_pricing_inputs(spot, strike, expiry, rate, vol)?;
    Ok(price_option(option_type, spot, strike, expiry, rate, vol))
}

/// Validated version of [`straddle_price`].
///
/// # Errors
/// Same conditions as [`try_price_option`].
pub fn try_straddle_price(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
) -> error::Result<f64> {
    validate_pricing_inputs(spot, strike, expiry, rate, vol)?;
    Ok(straddle_price(spot, strike, expiry, rate, vol))
}
