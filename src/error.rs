//! Error types for the volgrid library.
//!
//! Structural failures (bad inputs, an empty or inconsistent grid, a
//! failed spline fit) are returned as `Result<T, VolGridError>`. A quote
//! price that no volatility can reproduce is not an error: the implied
//! vol solver returns `None` so batch inversion can skip it.

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, VolGridError>;

/// Errors that can occur while pricing, filtering, extracting a grid or
/// building a surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VolGridError {
    /// Input data is invalid (e.g., non-positive spot, zero expiry, bad solver bracket).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// No complete strike × maturity grid could be obtained for the snapshot.
    #[error("empty grid: {message}")]
    EmptyGrid { message: String },

    /// A cell of a grid that was extracted as complete has no supporting quote.
    #[error("inconsistent grid: {message}")]
    InconsistentGrid { message: String },

    /// Numerical computation failed (e.g., NaN, rank-deficient spline system).
    #[error("numerical error: {message}")]
    NumericalError { message: String },
}
