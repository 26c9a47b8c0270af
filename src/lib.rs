//! # volgrid
//!
//! Implied volatility surfaces from a single snapshot of option quotes.
//!
//! Takes the option chain of one underlying on one snapshot date and turns
//! it into a dense implied volatility field: raw quotes → implied vol
//! backfill → liquidity filter → largest complete strike × maturity grid →
//! raw or spline-smoothed surface.
//!
//! ## Architecture
//!
//! - **`pricing`** — Black-Scholes prices, delta and bisection implied vol
//! - **`quote`** — option quotes, OCC symbol parsing, implied vol backfill
//! - **`filter`** — liquidity / maturity / wing filter on raw quotes
//! - **`grid`** — greedy extraction of a complete strike × maturity grid
//! - **`surface`** — surface construction, smoothing spline, skew slices
//! - **`pipeline`** — all stages for one (underlying, snapshot date)
//!
//! ## Design
//!
//! - **Newtypes for outputs, bare `f64` for inputs.** The solver returns
//!   [`Vol`]; inputs take raw `f64` named by parameter, in the order
//!   `(spot, strike, expiry, rate, vol)` everywhere.
//! - **Undefined is data, broken is an error.** A price no volatility can
//!   reproduce gives `None`; an empty or inconsistent grid gives a
//!   [`VolGridError`]. Library code never calls `unwrap()` or `expect()`.
//! - **No ambient state.** Ticker and date are arguments, settings are
//!   plain config values. Every public type is `Send + Sync`, so
//!   independent snapshots can be processed on separate threads.
//! - **Serializable.** Quotes, grids, surfaces and configs implement Serde
//!   `Serialize` / `Deserialize`.

pub mod conventions;
pub mod error;
pub mod filter;
pub mod grid;
pub mod pipeline;
pub mod pricing;
pub mod quote;
pub mod surface;
pub mod types;
mod validate;

#[doc(inline)]
pub use error::{Result, VolGridError};
#[doc(inline)]
pub use filter::{FilterConfig, QuoteFilter};
#[doc(inline)]
pub use grid::{extract_complete_grid, Grid, GridExtractor};
#[doc(inline)]
pub use pipeline::{PipelineConfig, SurfaceOutput, SurfacePipeline};
#[doc(inline)]
pub use pricing::{implied_volatility, price_option, straddle_price, ImpliedVolSolver};
#[doc(inline)]
pub use quote::{fill_implied_vols, OptionQuote};
#[doc(inline)]
pub use surface::{build_surface, SurfaceBuilder, VolSurface};
#[doc(inline)]
pub use types::{OptionType, Vol};
