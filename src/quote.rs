//! Option quotes for a single (underlying, snapshot date).
//!
//! An [`OptionQuote`] is one row of a vendor option chain: contract terms,
//! the underlying's spot at snapshot time, top-of-book prices, liquidity and
//! whatever implied vol / Greeks the vendor supplied. Derived quantities
//! (days to expiration, log-moneyness, mid) are computed on demand so they
//! can never drift from the stored fields.

use chrono::NaiveDate;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::conventions::{log_moneyness, year_fraction};
use crate::error::{self, VolGridError};
use crate::pricing::ImpliedVolSolver;
use crate::types::OptionType;
use crate::validate::{validate_finite, validate_non_negative, validate_positive};

/// Vendor-supplied sensitivities. Any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub rho: Option<f64>,
}

/// A single option quote observed on a snapshot date.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use volgrid::quote::OptionQuote;
/// use volgrid::OptionType;
///
/// let snapshot = NaiveDate::from_ymd_opt(2025, 12, 12).unwrap();
/// let expiry = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
/// let quote = OptionQuote::new("NVDA", snapshot, expiry, OptionType::Call, 190.0, 180.0)?
///     .with_implied_vol(0.48)
///     .with_liquidity(1_250, 8_400);
///
/// assert_eq!(quote.days_to_expiration(), 35);
/// assert!(quote.log_moneyness() > 0.0);
/// # Ok::<(), volgrid::VolGridError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub snapshot_date: NaiveDate,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: f64,
    /// Underlying spot at snapshot time.
    pub spot: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub implied_vol: Option<f64>,
    pub volume: u64,
    pub open_interest: u64,
    pub greeks: Option<Greeks>,
}

impl OptionQuote {
    /// Create a quote with no prices, no liquidity and no implied vol.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if `strike` or `spot` is not
    /// positive and finite.
    pub fn new(
        underlying: impl Into<String>,
        snapshot_date: NaiveDate,
        expiration: NaiveDate,
        option_type: OptionType,
        strike: f64,
        spot: f64,
    ) -> error::Result<Self> {
        validate_positive(strike, "strike")?;
        validate_positive(spot, "spot")?;
        Ok(Self {
            snapshot_date,
            underlying: underlying.into(),
            expiration,
            option_type,
            strike,
            spot,
            bid: None,
            ask: None,
            implied_vol: None,
            volume: 0,
            open_interest: 0,
            greeks: None,
        })
    }

    /// Build a quote from an OCC option symbol such as `NVDA251212C00050000`.
    ///
    /// The symbol is `root` followed by `yymmdd`, `C`/`P` and the strike in
    /// thousandths padded to eight digits. Space padding between root and
    /// date (the 21-character OCC form) is accepted.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if the symbol does not start
    /// with `root`, the remainder is not 15 characters, or the date, type
    /// or strike fields are malformed.
    pub fn from_occ_symbol(
        root: &str,
        symbol: &str,
        snapshot_date: NaiveDate,
        spot: f64,
    ) -> error::Result<Self> {
        let invalid = |why: &str| VolGridError::InvalidInput {
            message: format!("malformed OCC symbol {symbol:?}: {why}"),
        };

        let code = symbol
            .strip_prefix(root)
            .ok_or_else(|| invalid("root mismatch"))?
            .trim_start();
        if code.len() != 15 || !code.is_ascii() {
            return Err(invalid("expected yymmdd + type + 8-digit strike"));
        }

        let field = |range: std::ops::Range<usize>| -> error::Result<u32> {
            code[range].parse::<u32>().map_err(|_| invalid("non-numeric field"))
        };
        let year = 2000 + field(0..2)? as i32;
        let expiration = NaiveDate::from_ymd_opt(year, field(2..4)?, field(4..6)?)
            .ok_or_else(|| invalid("invalid expiration date"))?;
        let option_type = code[6..7]
            .chars()
            .next()
            .and_then(OptionType::from_code)
            .ok_or_else(|| invalid("type must be C or P"))?;
        let strike = f64::from(field(7..15)?) / 1000.0;

        Self::new(root, snapshot_date, expiration, option_type, strike, spot)
    }

    /// Set bid and ask.
    pub fn with_bid_ask(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Set the vendor implied volatility.
    pub fn with_implied_vol(mut self, vol: f64) -> Self {
        self.implied_vol = Some(vol);
        self
    }

    /// Set traded volume and open interest.
    pub fn with_liquidity(mut self, volume: u64, open_interest: u64) -> Self {
        self.volume = volume;
        self.open_interest = open_interest;
        self
    }

    /// Attach vendor Greeks.
    pub fn with_greeks(mut self, greeks: Greeks) -> Self {
        self.greeks = Some(greeks);
        self
    }

    /// Calendar days from snapshot to expiration, never negative.
    pub fn days_to_expiration(&self) -> i64 {
        (self.expiration - self.snapshot_date).num_days().max(0)
    }

    /// Time to expiration in years (ACT/365).
    pub fn time_to_expiry(&self) -> f64 {
        year_fraction(self.days_to_expiration())
    }

    /// ln(strike / spot).
    pub fn log_moneyness(&self) -> f64 {
        log_moneyness(self.strike, self.spot)
    }

    /// Mid price (bid + ask) / 2, when both sides are quoted and the market
    /// is not zero-bid zero-ask.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid >= 0.0 && ask >= 0.0 && bid + ask > 0.0 => {
                Some(0.5 * (bid + ask))
            }
            _ => None,
        }
    }

    /// Vendor delta, if supplied.
    pub fn delta(&self) -> Option<f64> {
        self.greeks.and_then(|g| g.delta)
    }

    fn has_usable_implied_vol(&self) -> bool {
        self.implied_vol.is_some_and(|v| v.is_finite() && v > 0.0)
    }
}

/// Recompute implied vols from mid prices where the vendor did not supply one.
///
/// Quotes that already carry a positive, finite implied vol are returned
/// unchanged. For the others the mid price is inverted with time to expiry
/// `days / 365` at the given `rate`. A quote with no mid, zero days to
/// expiration, or a price no volatility reproduces keeps `implied_vol =
/// None`, so the quote filter drops it.
///
/// # Errors
/// Returns [`VolGridError::InvalidInput`] if `rate` is not finite.
pub fn fill_implied_vols(
    quotes: &[OptionQuote],
    rate: f64,
    solver: &ImpliedVolSolver,
) -> error::Result<Vec<OptionQuote>> {
    validate_finite(rate, "rate")?;

    let fill_one = |quote: &OptionQuote| -> OptionQuote {
        if quote.has_usable_implied_vol() {
            return quote.clone();
        }
        let implied_vol = quote.mid().and_then(|mid| {
            solver
                .solve(
                    mid,
                    quote.spot,
                    quote.strike,
                    quote.time_to_expiry(),
                    rate,
                    quote.option_type,
                )
                .map(|v| v.0)
        });
        OptionQuote {
            implied_vol,
            ..quote.clone()
        }
    };

    #[cfg(feature = "parallel")]
    let filled: Vec<OptionQuote> = quotes.par_iter().map(fill_one).collect();
    #[cfg(not(feature = "parallel"))]
    let filled: Vec<OptionQuote> = quotes.iter().map(fill_one).collect();

    #[cfg(feature = "logging")]
    tracing::debug!(
        n_quotes = quotes.len(),
        n_missing = quotes.iter().filter(|q| !q.has_usable_implied_vol()).count(),
        n_unresolved = filled.iter().filter(|q| q.implied_vol.is_none()).count(),
        rate,
        "implied vol backfill complete"
    );

    Ok(filled)
}

/// Reject quotes whose quoted prices are negative or non-finite.
///
/// Used by callers that assemble quotes by hand before running the pipeline.
///
/// # Errors
/// Returns [`VolGridError::InvalidInput`] naming the first bad field.
pub fn validate_quote_prices(quote: &OptionQuote) -> error::Result<()> {
    if let Some(bid) = quote.bid {
        validate_non_negative(bid, "bid")?;
    }
    if let Some(ask) = quote.ask {
        validate_non_negative(ask, "ask")?;
    }
    if let Some(vol) = quote.implied_vol {
        validate_non_negative(vol, "implied_vol")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::price_option;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn call(strike: f64) -> OptionQuote {
        OptionQuote::new("TEST", date(2025, 1, 2), date(2025, 3, 3), OptionType::Call, strike, 100.0)
            .unwrap()
    }

    #[test]
    fn derived_fields() {
        let q = call(110.0);
        assert_eq!(q.days_to_expiration(), 60);
        assert_abs_diff_eq!(q.time_to_expiry(), 60.0 / 365.0);
        assert_abs_diff_eq!(q.log_moneyness(), (1.1_f64).ln());
    }

    #[test]
    fn expired_quote_has_zero_days() {
        let q = OptionQuote::new("TEST", date(2025, 3, 3), date(2025, 1, 2), OptionType::Put, 90.0, 100.0)
            .unwrap();
        assert_eq!(q.days_to_expiration(), 0);
    }

    #[test]
    fn new_rejects_non_positive_strike_and_spot() {
        let d = date(2025, 1, 2);
        assert!(OptionQuote::new("X", d, d, OptionType::Call, 0.0, 100.0).is_err());
        assert!(OptionQuote::new("X", d, d, OptionType::Call, 100.0, -5.0).is_err());
        assert!(OptionQuote::new("X", d, d, OptionType::Call, f64::NAN, 100.0).is_err());
    }

    #[test]
    fn mid_requires_both_sides() {
        assert_eq!(call(100.0).mid(), None);
        assert_eq!(call(100.0).with_bid_ask(1.0, 1.5).mid(), Some(1.25));
        assert_eq!(call(100.0).with_bid_ask(0.0, 0.0).mid(), None);
    }

    #[test]
    fn parses_occ_symbol() {
        let q = OptionQuote::from_occ_symbol("NVDA", "NVDA251212C00050000", date(2025, 11, 1), 180.0)
            .unwrap();
        assert_eq!(q.expiration, date(2025, 12, 12));
        assert_eq!(q.option_type, OptionType::Call);
        assert_abs_diff_eq!(q.strike, 50.0);
        assert_eq!(q.underlying, "NVDA");

        let padded = OptionQuote::from_occ_symbol("SPY", "SPY   260320P00512500", date(2026, 1, 5), 500.0)
            .unwrap();
        assert_eq!(padded.option_type, OptionType::Put);
        assert_abs_diff_eq!(padded.strike, 512.5);
    }

    #[test]
    fn rejects_malformed_occ_symbols() {
        let d = date(2025, 1, 1);
        for bad in [
            "AAPL251212C00050000",  // wrong root
            "NVDA251212C0005000",   // short strike
            "NVDA251312C00050000",  // month 13
            "NVDA251212X00050000",  // bad type
            "NVDA2512a2C00050000",  // non-numeric date
        ] {
            let result = OptionQuote::from_occ_symbol("NVDA", bad, d, 100.0);
            assert!(
                matches!(result, Err(VolGridError::InvalidInput { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn fill_recomputes_missing_vols_only() {
        let t = 60.0 / 365.0;
        let price = price_option(OptionType::Call, 100.0, 110.0, t, 0.03, 0.42);
        let missing = call(110.0).with_bid_ask(price - 0.01, price + 0.01);
        let supplied = call(110.0).with_implied_vol(0.3).with_bid_ask(price - 0.01, price + 0.01);
        let no_market = call(120.0);

        let filled = fill_implied_vols(
            &[missing, supplied, no_market],
            0.03,
            &ImpliedVolSolver::default(),
        )
        .unwrap();

        assert!((filled[0].implied_vol.unwrap() - 0.42).abs() < 1e-4);
        assert_eq!(filled[1].implied_vol, Some(0.3));
        assert_eq!(filled[2].implied_vol, None);
    }

    #[test]
    fn fill_rejects_non_finite_rate() {
        let result = fill_implied_vols(&[call(100.0)], f64::NAN, &ImpliedVolSolver::default());
        assert!(matches!(result, Err(VolGridError::InvalidInput { .. })));
    }

    #[test]
    fn validate_prices_flags_negative_bid() {
        let q = call(100.0).with_bid_ask(-0.5, 1.0);
        assert!(validate_quote_prices(&q).is_err());
        assert!(validate_quote_prices(&call(100.0).with_bid_ask(0.5, 1.0)).is_ok());
    }

    #[test]
    fn serde_round_trip_keeps_dates() {
        let q = call(105.0).with_implied_vol(0.25).with_greeks(Greeks {
            delta: Some(0.4),
            ..Greeks::default()
        });
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("2025-03-03"));
        let back: OptionQuote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
        assert_eq!(back.delta(), Some(0.4));
    }
}
