//! Liquidity and sanity filtering of raw quotes.
//!
//! Reduces a vendor option chain to the candidate set the grid extractor
//! works on. A quote survives only if its implied vol is plausible, it
//! traded, it has open interest, its maturity is inside the reliable band,
//! and it sits on its own type's wing: calls at or above the spot in
//! log-moneyness, puts at or below. The far out-of-the-money wing of each
//! type is covered by the other type's more liquid quotes.

use serde::{Deserialize, Serialize};

use crate::error::{self, VolGridError};
use crate::quote::OptionQuote;
use crate::types::OptionType;
use crate::validate::validate_positive;

/// Thresholds for [`QuoteFilter`]. All bounds are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Implied vols at or above this are treated as data errors.
    pub max_implied_vol: f64,
    /// Volume must exceed this.
    pub min_volume: u64,
    /// Open interest must exceed this.
    pub min_open_interest: u64,
    /// Days to expiration must exceed this.
    pub min_days: i64,
    /// Days to expiration must be below this.
    pub max_days: i64,
    /// Inclusive bounds on strike / spot, e.g. `(0.5, 1.5)`. `None` keeps
    /// every strike.
    pub strike_band: Option<(f64, f64)>,
    /// Require a quoted market, bid + ask > 0. A missing side counts as 0.
    pub require_market: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_implied_vol: 1.5,
            min_volume: 0,
            min_open_interest: 10,
            min_days: 25,
            max_days: 200,
            strike_band: None,
            require_market: false,
        }
    }
}

/// Why a quote was rejected. The first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    ImpliedVol,
    Volume,
    OpenInterest,
    Maturity,
    StrikeBand,
    NoMarket,
    WrongWing,
}

/// Quote filter built from a validated [`FilterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuoteFilter {
    config: FilterConfig,
}

impl QuoteFilter {
    /// Create a filter.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if `max_implied_vol` is not
    /// positive, the maturity band is empty, or the strike band is not
    /// `0 < lo <= hi` with finite ends.
    pub fn new(config: FilterConfig) -> error::Result<Self> {
        validate_positive(config.max_implied_vol, "max_implied_vol")?;
        if config.max_days <= config.min_days.saturating_add(1) {
            return Err(VolGridError::InvalidInput {
                message: format!(
                    "maturity band ({}, {}) contains no whole day",
                    config.min_days, config.max_days
                ),
            });
        }
        if let Some((lo, hi)) = config.strike_band {
            validate_positive(lo, "strike_band lower bound")?;
            validate_positive(hi, "strike_band upper bound")?;
            if lo > hi {
                return Err(VolGridError::InvalidInput {
                    message: format!("strike band [{lo}, {hi}] is empty"),
                });
            }
        }
        Ok(Self { config })
    }

    /// The filter thresholds.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Check a single quote, returning the first failed criterion.
    pub fn check(&self, quote: &OptionQuote) -> Result<(), Rejection> {
        let c = &self.config;
        match quote.implied_vol {
            Some(iv) if iv > 0.0 && iv < c.max_implied_vol => {}
            _ => return Err(Rejection::ImpliedVol),
        }
        if quote.volume <= c.min_volume {
            return Err(Rejection::Volume);
        }
        if quote.open_interest <= c.min_open_interest {
            return Err(Rejection::OpenInterest);
        }
        let days = quote.days_to_expiration();
        if days <= c.min_days || days >= c.max_days {
            return Err(Rejection::Maturity);
        }
        if let Some((lo, hi)) = c.strike_band {
            let ratio = quote.strike / quote.spot;
            if !(lo..=hi).contains(&ratio) {
                return Err(Rejection::StrikeBand);
            }
        }
        if c.require_market && quote.bid.unwrap_or(0.0) + quote.ask.unwrap_or(0.0) <= 0.0 {
            return Err(Rejection::NoMarket);
        }
        let k = quote.log_moneyness();
        let on_own_wing = match quote.option_type {
            OptionType::Call => k >= 0.0,
            OptionType::Put => k <= 0.0,
        };
        if !on_own_wing {
            return Err(Rejection::WrongWing);
        }
        Ok(())
    }

    /// Whether a quote passes every criterion.
    pub fn accepts(&self, quote: &OptionQuote) -> bool {
        self.check(quote).is_ok()
    }

    /// Keep the accepted quotes, in input order.
    pub fn apply(&self, quotes: &[OptionQuote]) -> Vec<OptionQuote> {
        #[cfg(feature = "logging")]
        let mut rejected = std::collections::HashMap::<Rejection, usize>::new();

        let mut kept = Vec::with_capacity(quotes.len());
        for quote in quotes {
            match self.check(quote) {
                Ok(()) => kept.push(quote.clone()),
                #[cfg(feature = "logging")]
                Err(reason) => *rejected.entry(reason).or_default() += 1,
                #[cfg(not(feature = "logging"))]
                Err(_) => {}
            }
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_in = quotes.len(),
            n_kept = kept.len(),
            rejected = ?rejected,
            "quote filter applied"
        );

        kept
    }
}
