//! Core domain types shared across the pipeline.
//!
//! Solver outputs are wrapped in the [`Vol`] newtype so a volatility is
//! never mistaken for a price; inputs stay bare `f64` and are named by
//! parameter.
//!
//! [`Vol`] wraps `f64`, so it derives only `PartialEq` and `PartialOrd`.

use serde::{Deserialize, Serialize};

/// Implied volatility `σ`, annualized. 0.20 is 20%.
///
/// # Examples
/// ```
/// use volgrid::types::Vol;
/// let vol = Vol(0.20);
/// assert_eq!(vol.0, 0.20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Vol(pub f64);

/// Option type: call or put.
///
/// Selects the pricing formula branch, the arbitrage lower bound used by
/// the implied vol solver, and the moneyness wing kept by the quote filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Right to buy at strike price.
    Call,
    /// Right to sell at strike price.
    Put,
}

impl OptionType {
    /// The single-letter code used in OCC symbols and vendor files.
    pub fn code(self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }

    /// Parse an OCC / vendor type code (`C` or `P`, case-insensitive).
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'C' => Some(OptionType::Call),
            'P' => Some(OptionType::Put),
            _ => None,
        }
    }
}
