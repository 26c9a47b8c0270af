//! Implied volatility surfaces built from a complete quote grid.
//!
//! - [`SurfaceBuilder`] — pivots grid quotes into a dense field, optionally
//!   smoothed
//! - [`SmoothingSpline2d`] — bivariate smoothing spline used for the
//!   smoothed field
//! - [`skew`](skew::skew) — single-maturity smile slice on a log-moneyness
//!   or delta axis

pub mod builder;
pub mod skew;
pub mod spline;

pub use builder::{build_surface, SurfaceBuilder, SurfaceConfig};
pub use skew::{skew, Skew, SkewAxis, SkewPoint};
pub use spline::SmoothingSpline2d;

use serde::{Deserialize, Serialize};

/// How the field values were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// One value per grid cell, straight from the quotes.
    Raw,
    /// Smoothing spline evaluated on a regular mesh.
    Smoothed,
}

/// A 2-D implied volatility field.
///
/// Columns run along `maturities` (calendar days to expiration), rows along
/// `log_moneyness` = ln(K / S). Both axes are ascending and
/// `values[row][col]` is the implied vol at
/// `(maturities[col], log_moneyness[row])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSurface {
    pub kind: SurfaceKind,
    /// Spot used for the log-moneyness transform.
    pub spot: f64,
    pub maturities: Vec<f64>,
    pub log_moneyness: Vec<f64>,
    pub values: Vec<Vec<f64>>,
    /// Number of quotes lying on the grid the surface was built from.
    pub n_quotes: usize,
}

impl VolSurface {
    /// `(rows, columns)` = (log-moneyness points, maturity points).
    pub fn shape(&self) -> (usize, usize) {
        (self.log_moneyness.len(), self.maturities.len())
    }

    /// Implied vol at a mesh node, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Every node as `(maturity, log_moneyness, vol)`, row by row.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.log_moneyness
            .iter()
            .zip(&self.values)
            .flat_map(move |(&k, row)| self.maturities.iter().zip(row).map(move |(&t, &v)| (t, k, v)))
    }

    /// The `q`-quantile of the field values (linear interpolation between
    /// order statistics). `None` for an empty field or `q` outside [0, 1].
    pub fn iv_quantile(&self, q: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&q) {
            return None;
        }
        let mut vols: Vec<f64> = self.values.iter().flatten().copied().collect();
        if vols.is_empty() {
            return None;
        }
        vols.sort_by(f64::total_cmp);
        let pos = q * (vols.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        Some(vols[lo] + (vols[hi] - vols[lo]) * frac)
    }
}
