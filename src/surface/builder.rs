//! Builder API for turning a complete quote grid into a [`VolSurface`].
//!
//! ```
//! use chrono::{Days, NaiveDate};
//! use volgrid::grid::extract_complete_grid;
//! use volgrid::quote::OptionQuote;
//! use volgrid::surface::{SurfaceBuilder, SurfaceKind};
//! use volgrid::OptionType;
//!
//! let snapshot = NaiveDate::from_ymd_opt(2025, 12, 12).unwrap();
//! let mut quotes = Vec::new();
//! for days in [35, 63, 98] {
//!     for strike in [170.0, 180.0, 190.0, 200.0] {
//!         let expiry = snapshot.checked_add_days(Days::new(days)).unwrap();
//!         let quote = OptionQuote::new("NVDA", snapshot, expiry, OptionType::Call, strike, 180.0)?
//!             .with_implied_vol(0.45 + 0.0005 * (strike - 180.0));
//!         quotes.push(quote);
//!     }
//! }
//!
//! let grid = extract_complete_grid(&quotes);
//! let surface = SurfaceBuilder::new()
//!     .interpolate(true)
//!     .mesh(20, 20)
//!     .build(&quotes, &grid)?;
//!
//! assert_eq!(surface.kind, SurfaceKind::Smoothed);
//! assert_eq!(surface.shape(), (20, 20));
//! # Ok::<(), volgrid::VolGridError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::conventions::log_moneyness;
use crate::error::{self, VolGridError};
use crate::grid::Grid;
use crate::quote::OptionQuote;
use crate::surface::spline::{linspace, SmoothingSpline2d};
use crate::surface::{SurfaceKind, VolSurface};
use crate::validate::validate_non_negative;

/// Surface construction settings.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Fit a smoothing spline and evaluate it on a regular mesh.
    pub interpolate: bool,
    /// Mesh points along the maturity axis.
    pub mesh_maturities: usize,
    /// Mesh points along the log-moneyness axis.
    pub mesh_moneyness: usize,
    /// Residual sum of squares the smoothing spline may leave.
    pub smoothing: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            interpolate: false,
            mesh_maturities: 100,
            mesh_moneyness: 100,
            smoothing: 0.1,
        }
    }
}

/// Builder for [`VolSurface`]s.
///
/// Defaults: raw pivoted grid; when interpolating, a 100 × 100 mesh and a
/// smoothing factor of 0.1.
#[derive(Debug, Clone, Default)]
pub struct SurfaceBuilder {
    config: SurfaceConfig,
}

impl SurfaceBuilder {
    /// Create a builder with default settings (no interpolation).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from a config value.
    pub fn from_config(config: SurfaceConfig) -> Self {
        Self { config }
    }

    /// Enable or disable spline smoothing.
    pub fn interpolate(mut self, interpolate: bool) -> Self {
        self.config.interpolate = interpolate;
        self
    }

    /// Set the mesh resolution used when interpolating.
    pub fn mesh(mut self, maturities: usize, moneyness: usize) -> Self {
        self.config.mesh_maturities = maturities;
        self.config.mesh_moneyness = moneyness;
        self
    }

    /// Set the spline smoothing factor.
    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    /// The current settings.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Build the surface from candidate quotes and the grid extracted from them.
    ///
    /// Quotes off the grid are ignored. The spot is taken from the last
    /// on-grid quote. Several quotes on one cell (a call and a put struck
    /// exactly at the spot) are averaged.
    ///
    /// # Errors
    /// - [`VolGridError::EmptyGrid`] if the grid is empty or no quote lies on it.
    /// - [`VolGridError::InconsistentGrid`] if a grid cell has no quote or an
    ///   on-grid quote has no usable implied vol. Either means the grid was
    ///   not extracted from these quotes.
    /// - [`VolGridError::InvalidInput`] for a mesh with fewer than 2 points
    ///   per axis or a negative smoothing factor.
    /// - [`VolGridError::NumericalError`] if the spline fit fails.
    pub fn build(&self, quotes: &[OptionQuote], grid: &Grid) -> error::Result<VolSurface> {
        #[cfg(feature = "logging")]
        tracing::debug!(
            n_quotes = quotes.len(),
            n_strikes = grid.strikes.len(),
            n_maturities = grid.maturities.len(),
            interpolate = self.config.interpolate,
            "surface build started"
        );

        if self.config.interpolate {
            validate_non_negative(self.config.smoothing, "smoothing")?;
            if self.config.mesh_maturities < 2 || self.config.mesh_moneyness < 2 {
                return Err(VolGridError::InvalidInput {
                    message: format!(
                        "mesh must have at least 2 points per axis, got {} × {}",
                        self.config.mesh_maturities, self.config.mesh_moneyness
                    ),
                });
            }
        }
        if grid.is_empty() {
            return Err(VolGridError::EmptyGrid {
                message: format!(
                    "grid has {} strikes and {} maturities",
                    grid.strikes.len(),
                    grid.maturities.len()
                ),
            });
        }

        let (spot, n_quotes, raw) = pivot(quotes, grid)?;
        let maturities: Vec<f64> = grid.maturities.iter().map(|&d| d as f64).collect();
        let moneyness: Vec<f64> = grid.strikes.iter().map(|&k| log_moneyness(k, spot)).collect();

        let surface = if self.config.interpolate {
            let mut xs = Vec::with_capacity(n_quotes);
            let mut ys = Vec::with_capacity(n_quotes);
            let mut zs = Vec::with_capacity(n_quotes);
            for (row, &k) in moneyness.iter().enumerate() {
                for (col, &t) in maturities.iter().enumerate() {
                    xs.push(t);
                    ys.push(k);
                    zs.push(raw[row][col]);
                }
            }
            let spline = SmoothingSpline2d::fit(&xs, &ys, &zs, self.config.smoothing)?;

            let mesh_t = linspace(maturities[0], maturities[maturities.len() - 1], self.config.mesh_maturities);
            let mesh_k = linspace(moneyness[0], moneyness[moneyness.len() - 1], self.config.mesh_moneyness);
            let values = spline.evaluate_mesh(&mesh_t, &mesh_k);
            VolSurface {
                kind: SurfaceKind::Smoothed,
                spot,
                maturities: mesh_t,
                log_moneyness: mesh_k,
                values,
                n_quotes,
            }
        } else {
            VolSurface {
                kind: SurfaceKind::Raw,
                spot,
                maturities,
                log_moneyness: moneyness,
                values: raw,
                n_quotes,
            }
        };

        #[cfg(feature = "logging")]
        tracing::debug!(
            kind = ?surface.kind,
            shape = ?surface.shape(),
            spot,
            n_quotes,
            "surface build complete"
        );

        Ok(surface)
    }
}

/// Pivot on-grid quotes into a `[strike][maturity]` matrix of implied vols.
///
/// Returns the spot of the last on-grid quote, the number of on-grid quotes
/// and the matrix.
fn pivot(quotes: &[OptionQuote], grid: &Grid) -> error::Result<(f64, usize, Vec<Vec<f64>>)> {
    let (nk, nt) = (grid.strikes.len(), grid.maturities.len());
    let mut sums = vec![vec![0.0; nt]; nk];
    let mut counts = vec![vec![0usize; nt]; nk];
    let mut spot = None;
    let mut n_quotes = 0;

    for quote in quotes {
        let (Some(row), Some(col)) = (
            grid.strike_index(quote.strike),
            grid.maturity_index(quote.days_to_expiration()),
        ) else {
            continue;
        };
        let iv = quote
            .implied_vol
            .filter(|v| v.is_finite())
            .ok_or_else(|| VolGridError::InconsistentGrid {
                message: format!(
                    "quote at strike {} / {} days has no implied vol",
                    quote.strike,
                    quote.days_to_expiration()
                ),
            })?;
        sums[row][col] += iv;
        counts[row][col] += 1;
        spot = Some(quote.spot);
        n_quotes += 1;
    }

    let spot = spot.ok_or_else(|| VolGridError::EmptyGrid {
        message: "no quote lies on the grid".into(),
    })?;

    for (row, strike) in grid.strikes.iter().enumerate() {
        for (col, days) in grid.maturities.iter().enumerate() {
            if counts[row][col] == 0 {
                return Err(VolGridError::InconsistentGrid {
                    message: format!("no quote at strike {strike} / {days} days"),
                });
            }
            sums[row][col] /= counts[row][col] as f64;
        }
    }
    Ok((spot, n_quotes, sums))
}

/// Build a surface with default mesh and smoothing settings.
///
/// # Errors
/// See [`SurfaceBuilder::build`].
pub fn build_surface(
    quotes: &[OptionQuote],
    grid: &Grid,
    interpolate: bool,
) -> error::Result<VolSurface> {
    SurfaceBuilder::new().interpolate(interpolate).build(quotes, grid)
}
