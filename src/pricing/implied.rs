//! Black-Scholes implied volatility by bisection.
//!
//! Option prices are strictly increasing in σ, so bisection on a fixed
//! bracket always converges when a solution exists inside it. The solver
//! reports "no volatility reproduces this price" as `None` rather than an
//! error, so a batch of quotes can be inverted and the failures filtered
//! out afterwards.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{self, VolGridError};
use crate::pricing::black_scholes::{intrinsic_lower_bound, price_option};
use crate::types::{OptionType, Vol};
use crate::validate::validate_positive;

/// Slack allowed below the arbitrage lower bound before a price is rejected.
const LOWER_BOUND_SLACK: f64 = 1e-12;

/// Solver settings for [`ImpliedVolSolver`].
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpliedVolConfig {
    /// Absolute price tolerance; also the bracket-width stopping rule.
    pub tolerance: f64,
    /// Bisection iteration cap.
    pub max_iterations: usize,
    /// Lower end of the volatility search bracket.
    pub vol_low: f64,
    /// Upper end of the volatility search bracket.
    pub vol_high: f64,
}

impl Default for ImpliedVolConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
            vol_low: 1e-8,
            vol_high: 10.0,
        }
    }
}

/// One pricing problem for [`ImpliedVolSolver::solve_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvRequest {
    pub price: f64,
    pub spot: f64,
    pub strike: f64,
    pub expiry: f64,
    pub rate: f64,
    pub option_type: OptionType,
}

/// Bisection implied volatility solver.
///
/// Stateless apart from its validated settings; a single solver can be
/// shared across threads.
///
/// # Examples
/// ```
/// use volgrid::pricing::{price_option, ImpliedVolSolver};
/// use volgrid::OptionType;
///
/// let price = price_option(OptionType::Call, 100.0, 110.0, 0.5, 0.03, 0.35);
/// let solver = ImpliedVolSolver::default();
/// let vol = solver.solve(price, 100.0, 110.0, 0.5, 0.03, OptionType::Call).unwrap();
/// assert!((vol.0 - 0.35).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpliedVolSolver {
    config: ImpliedVolConfig,
}

impl ImpliedVolSolver {
    /// Create a solver from explicit settings.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if the tolerance is not
    /// positive, the iteration cap is zero, or the bracket is not
    /// `0 < vol_low < vol_high` with finite ends.
    pub fn new(config: ImpliedVolConfig) -> error::Result<Self> {
        validate_positive(config.tolerance, "tolerance")?;
        validate_positive(config.vol_low, "vol_low")?;
        validate_positive(config.vol_high, "vol_high")?;
        if config.max_iterations == 0 {
            return Err(VolGridError::InvalidInput {
                message: "max_iterations must be at least 1".into(),
            });
        }
        if config.vol_low >= config.vol_high {
            return Err(VolGridError::InvalidInput {
                message: format!(
                    "vol bracket must satisfy vol_low < vol_high, got [{}, {}]",
                    config.vol_low, config.vol_high
                ),
            });
        }
        Ok(Self { config })
    }

    /// The solver's settings.
    pub fn config(&self) -> &ImpliedVolConfig {
        &self.config
    }

    /// Invert a market price to a Black-Scholes volatility.
    ///
    /// Returns `None` when no volatility is meaningful: a non-positive
    /// price or expiry, a price below the no-arbitrage lower bound, or no
    /// convergence within `max_iterations`.
    ///
    /// `spot` and `strike` must be positive; the rate may be negative.
    pub fn solve(
        &self,
        price: f64,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        option_type: OptionType,
    ) -> Option<Vol> {
        if price.is_nan() || price <= 0.0 || expiry.is_nan() || expiry <= 0.0 {
            return None;
        }

        let floor = intrinsic_lower_bound(option_type, spot, strike, expiry, rate);
        if price < floor - LOWER_BOUND_SLACK {
            return None;
        }

        let tol = self.config.tolerance;
        let mut low = self.config.vol_low;
        let mut high = self.config.vol_high;
        for _ in 0..self.config.max_iterations {
            let mid = 0.5 * (low + high);
            let diff = price_option(option_type, spot, strike, expiry, rate, mid) - price;
            if diff.abs() < tol {
                return Some(Vol(mid));
            }
            if diff > 0.0 {
                high = mid;
            } else {
                low = mid;
            }
            if high - low < tol {
                return Some(Vol(mid));
            }
        }
        None
    }

    /// Invert a batch of prices, preserving input order.
    ///
    /// Undefined entries come back as `None` and never abort the batch.
    /// Runs on the rayon pool when the `parallel` feature is enabled.
    pub fn solve_batch(&self, requests: &[IvRequest]) -> Vec<Option<Vol>> {
        let solve_one = |r: &IvRequest| {
            self.solve(r.price, r.spot, r.strike, r.expiry, r.rate, r.option_type)
        };

        #[cfg(feature = "parallel")]
        let vols: Vec<Option<Vol>> = requests.par_iter().map(solve_one).collect();
        #[cfg(not(feature = "parallel"))]
        let vols: Vec<Option<Vol>> = requests.iter().map(solve_one).collect();

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_requests = requests.len(),
            n_undefined = vols.iter().filter(|v| v.is_none()).count(),
            "implied vol batch complete"
        );

        vols
    }
}

/// Implied volatility with default solver settings
/// (tolerance 1e-6, 100 iterations, bracket [1e-8, 10]).
pub fn implied_volatility(
    price: f64,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    option_type: OptionType,
) -> Option<Vol> {
    ImpliedVolSolver::default().solve(price, spot, strike, expiry, rate, option_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_call_and_put() {
        let solver = ImpliedVolSolver::default();
        for side in [OptionType::Call, OptionType::Put] {
            for &vol in &[0.05, 0.2, 0.8, 2.5] {
                let price = price_option(side, 100.0, 95.0, 0.75, 0.02, vol);
                let iv = solver.solve(price, 100.0, 95.0, 0.75, 0.02, side).unwrap();
                assert!((iv.0 - vol).abs() < 1e-4, "{side:?} vol={vol} got {}", iv.0);
            }
        }
    }

    #[test]
    fn non_positive_price_or_expiry_is_undefined() {
        assert!(implied_volatility(0.0, 100.0, 100.0, 1.0, 0.0, OptionType::Call).is_none());
        assert!(implied_volatility(-1.0, 100.0, 100.0, 1.0, 0.0, OptionType::Call).is_none());
        assert!(implied_volatility(5.0, 100.0, 100.0, 0.0, 0.0, OptionType::Call).is_none());
        assert!(implied_volatility(f64::NAN, 100.0, 100.0, 1.0, 0.0, OptionType::Put).is_none());
    }

    #[test]
    fn price_below_arbitrage_bound_is_undefined() {
        // Call intrinsic with r=0 is 20; 19.5 is below it.
        assert!(implied_volatility(19.5, 120.0, 100.0, 0.5, 0.0, OptionType::Call).is_none());
        // Put intrinsic is 100·e^(−0.05) − 80 ≈ 15.12.
        assert!(implied_volatility(15.0, 80.0, 100.0, 1.0, 0.05, OptionType::Put).is_none());
    }

    #[test]
    fn price_above_bracket_pins_to_upper_end() {
        let solver = ImpliedVolSolver::new(ImpliedVolConfig {
            vol_high: 1.0,
            ..ImpliedVolConfig::default()
        })
        .unwrap();
        let price = price_option(OptionType::Call, 100.0, 100.0, 1.0, 0.0, 3.0);
        let iv = solver.solve(price, 100.0, 100.0, 1.0, 0.0, OptionType::Call);
        // Every midpoint underprices, so the bracket collapses onto vol_high
        // and the width rule reports it.
        let v = iv.unwrap();
        assert!(v.0 > 0.99 && v.0 <= 1.0);
    }

    #[test]
    fn iteration_cap_exhaustion_is_undefined() {
        let solver = ImpliedVolSolver::new(ImpliedVolConfig {
            max_iterations: 3,
            ..ImpliedVolConfig::default()
        })
        .unwrap();
        let price = price_option(OptionType::Call, 100.0, 100.0, 1.0, 0.0, 0.2);
        assert!(solver.solve(price, 100.0, 100.0, 1.0, 0.0, OptionType::Call).is_none());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            ImpliedVolConfig { tolerance: 0.0, ..Default::default() },
            ImpliedVolConfig { max_iterations: 0, ..Default::default() },
            ImpliedVolConfig { vol_low: 2.0, vol_high: 1.0, ..Default::default() },
            ImpliedVolConfig { vol_low: -1.0, ..Default::default() },
            ImpliedVolConfig { vol_high: f64::INFINITY, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                ImpliedVolSolver::new(config),
                Err(VolGridError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn batch_preserves_order_and_skips_bad_quotes() {
        let good = price_option(OptionType::Put, 100.0, 90.0, 0.3, 0.01, 0.4);
        let requests = vec![
            IvRequest { price: good, spot: 100.0, strike: 90.0, expiry: 0.3, rate: 0.01, option_type: OptionType::Put },
            IvRequest { price: -1.0, spot: 100.0, strike: 90.0, expiry: 0.3, rate: 0.01, option_type: OptionType::Put },
            IvRequest { price: good, spot: 100.0, strike: 90.0, expiry: 0.3, rate: 0.01, option_type: OptionType::Put },
        ];
        let vols = ImpliedVolSolver::default().solve_batch(&requests);
        assert_eq!(vols.len(), 3);
        assert!(vols[1].is_none());
        assert!((vols[0].unwrap().0 - 0.4).abs() < 1e-4);
        assert_eq!(vols[0], vols[2]);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ImpliedVolConfig = serde_json::from_str(r#"{"tolerance": 1e-8}"#).unwrap();
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.vol_high, 10.0);
    }
}
