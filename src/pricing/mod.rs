//! European option pricing and implied volatility inversion.
//!
//! - [`black_scholes`] — closed-form call / put / straddle prices and delta
//! - [`implied`] — bisection implied volatility with arbitrage-bound checks
//!
//! All functions take the canonical argument order
//! `(spot, strike, expiry, rate, vol)` with expiry in years and no
//! implicit default for the rate.

pub mod black_scholes;
pub mod implied;

pub use black_scholes::{
    delta, intrinsic_lower_bound, norm_cdf, price_option, straddle_price, try_price_option,
    try_straddle_price,
};
pub use implied::{implied_volatility, ImpliedVolConfig, ImpliedVolSolver, IvRequest};
