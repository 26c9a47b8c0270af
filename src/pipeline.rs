//! End-to-end surface construction for one (underlying, snapshot date).
//!
//! raw quotes → IV backfill (when a rate is configured) → [`QuoteFilter`]
//! → [`GridExtractor`](crate::grid::GridExtractor) → [`SurfaceBuilder`].
//!
//! ```
//! use chrono::{Days, NaiveDate};
//! use volgrid::pipeline::{PipelineConfig, SurfacePipeline};
//! use volgrid::quote::OptionQuote;
//! use volgrid::OptionType;
//!
//! let snapshot = NaiveDate::from_ymd_opt(2025, 12, 12).unwrap();
//! let mut chain = Vec::new();
//! for days in [35, 63, 98] {
//!     let expiry = snapshot.checked_add_days(Days::new(days)).unwrap();
//!     for strike in [160.0, 170.0, 180.0] {
//!         chain.push(
//!             OptionQuote::new("NVDA", snapshot, expiry, OptionType::Put, strike, 180.0)?
//!                 .with_implied_vol(0.5)
//!                 .with_liquidity(100, 1_000),
//!         );
//!     }
//! }
//!
//! let pipeline = SurfacePipeline::new(PipelineConfig::default())?;
//! let output = pipeline.run(&chain, "NVDA", snapshot)?;
//! assert_eq!(output.grid.area(), 9);
//! assert_eq!(output.n_candidates, 9);
//! # Ok::<(), volgrid::VolGridError>(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{self, VolGridError};
use crate::filter::{FilterConfig, QuoteFilter};
use crate::grid::{extract_complete_grid, Grid};
use crate::pricing::{ImpliedVolConfig, ImpliedVolSolver};
use crate::quote::{fill_implied_vols, OptionQuote};
use crate::surface::{skew, Skew, SkewAxis, SurfaceBuilder, SurfaceConfig, VolSurface};
use crate::validate::validate_finite;

/// Settings for every pipeline stage.
///
/// Missing sections fall back to their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub solver: ImpliedVolConfig,
    pub surface: SurfaceConfig,
    /// Risk-free rate for recomputing missing implied vols. `None` keeps
    /// vendor vols only.
    pub rate: Option<f64>,
}

impl PipelineConfig {
    /// Parse a config from JSON.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if the JSON is malformed or
    /// has fields of the wrong type.
    pub fn from_json(json: &str) -> error::Result<Self> {
        serde_json::from_str(json).map_err(|e| VolGridError::InvalidInput {
            message: format!("pipeline config: {e}"),
        })
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOutput {
    pub surface: VolSurface,
    /// The complete grid the surface was built on.
    pub grid: Grid,
    /// Quotes that survived the filter.
    pub n_candidates: usize,
}

/// Validated pipeline, reusable across snapshots.
#[derive(Debug, Clone)]
pub struct SurfacePipeline {
    filter: QuoteFilter,
    solver: ImpliedVolSolver,
    builder: SurfaceBuilder,
    rate: Option<f64>,
}

impl SurfacePipeline {
    /// Validate the config and assemble the stages.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] for invalid filter or solver
    /// settings or a non-finite rate.
    pub fn new(config: PipelineConfig) -> error::Result<Self> {
        if let Some(rate) = config.rate {
            validate_finite(rate, "rate")?;
        }
        Ok(Self {
            filter: QuoteFilter::new(config.filter)?,
            solver: ImpliedVolSolver::new(config.solver)?,
            builder: SurfaceBuilder::from_config(config.surface),
            rate: config.rate,
        })
    }

    /// Quotes of `underlying` on `snapshot_date`, backfilled and filtered.
    ///
    /// # Errors
    /// Propagates backfill errors.
    pub fn candidates(
        &self,
        quotes: &[OptionQuote],
        underlying: &str,
        snapshot_date: NaiveDate,
    ) -> error::Result<Vec<OptionQuote>> {
        let selected: Vec<OptionQuote> = quotes
            .iter()
            .filter(|q| q.underlying == underlying && q.snapshot_date == snapshot_date)
            .cloned()
            .collect();
        let selected = match self.rate {
            Some(rate) => fill_implied_vols(&selected, rate, &self.solver)?,
            None => selected,
        };
        Ok(self.filter.apply(&selected))
    }

    /// Build the surface for one (underlying, snapshot date).
    ///
    /// # Errors
    /// - [`VolGridError::EmptyGrid`] when no quote survives filtering or no
    ///   complete grid exists.
    /// - Any error from [`SurfaceBuilder::build`].
    pub fn run(
        &self,
        quotes: &[OptionQuote],
        underlying: &str,
        snapshot_date: NaiveDate,
    ) -> error::Result<SurfaceOutput> {
        let candidates = self.candidates(quotes, underlying, snapshot_date)?;
        let grid = extract_complete_grid(&candidates);
        if grid.is_empty() {
            return Err(VolGridError::EmptyGrid {
                message: format!(
                    "{underlying} on {snapshot_date}: {} candidate quotes, no complete grid",
                    candidates.len()
                ),
            });
        }

        let surface = self.builder.build(&candidates, &grid)?;

        #[cfg(feature = "logging")]
        tracing::debug!(
            underlying,
            %snapshot_date,
            n_candidates = candidates.len(),
            n_strikes = grid.strikes.len(),
            n_maturities = grid.maturities.len(),
            "pipeline complete"
        );

        Ok(SurfaceOutput {
            surface,
            grid,
            n_candidates: candidates.len(),
        })
    }

    /// Skew slice of the filtered candidates.
    ///
    /// # Errors
    /// See [`skew`](crate::surface::skew::skew).
    pub fn skew(
        &self,
        quotes: &[OptionQuote],
        underlying: &str,
        snapshot_date: NaiveDate,
        min_days: i64,
        axis: SkewAxis,
    ) -> error::Result<Skew> {
        let candidates = self.candidates(quotes, underlying, snapshot_date)?;
        skew(&candidates, min_days, axis)
    }
}
