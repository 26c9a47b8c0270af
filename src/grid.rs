//! Complete strike × maturity grid extraction.
//!
//! Quotes for a snapshot rarely cover every (strike, maturity) pair: short
//! maturities list strikes that long ones don't and vice versa. Pivoting
//! into a 2-D surface needs a fully populated rectangle, so this module
//! finds a large sub-rectangle K × T where every cell has a quote.
//!
//! # Algorithm
//!
//! Finding the maximum-area complete rectangle is a maximum biclique
//! problem and NP-hard in general. [`GridExtractor`] uses a greedy
//! deficiency-reduction heuristic instead:
//!
//! 1. Against the current K and T, collect the incomplete strikes (not
//!    quoted at every maturity in T) and incomplete maturities (not quoted
//!    at every strike in K).
//! 2. If there are none, K × T is complete and the loop stops.
//! 3. Compare the area left by dropping a strike, `(|K|−1)·|T|`, with the
//!    area left by dropping a maturity, `|K|·(|T|−1)`. A side with no
//!    incomplete members scores −1. Ties go to dropping a strike.
//! 4. On the chosen side drop the member missing the most cells.
//!
//! Each round removes one element, so the loop runs at most |K| + |T|
//! times. Among equally deficient members the smallest key goes first;
//! callers should rely on completeness and area, not on which of several
//! equally deficient members survive.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::quote::OptionQuote;

/// Active strikes and maturities of a complete grid, both sorted ascending.
///
/// Every (strike, maturity) pair in `strikes × maturities` is supported by
/// at least one quote of the candidate set the grid was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Active strikes.
    pub strikes: Vec<f64>,
    /// Active maturities in calendar days to expiration.
    pub maturities: Vec<i64>,
}

impl Grid {
    /// True when either side is empty, i.e. no surface can be built.
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty() || self.maturities.is_empty()
    }

    /// Number of cells, |K| · |T|.
    pub fn area(&self) -> usize {
        self.strikes.len() * self.maturities.len()
    }

    /// Whether a quote lies on the grid.
    pub fn contains(&self, quote: &OptionQuote) -> bool {
        self.strike_index(quote.strike).is_some()
            && self.maturity_index(quote.days_to_expiration()).is_some()
    }

    /// Quotes lying exactly on the grid, in input order.
    pub fn restrict(&self, quotes: &[OptionQuote]) -> Vec<OptionQuote> {
        quotes.iter().filter(|q| self.contains(q)).cloned().collect()
    }

    pub(crate) fn strike_index(&self, strike: f64) -> Option<usize> {
        self.strikes
            .binary_search_by(|k| k.total_cmp(&strike))
            .ok()
    }

    pub(crate) fn maturity_index(&self, days: i64) -> Option<usize> {
        self.maturities.binary_search(&days).ok()
    }
}

/// Greedy extractor of a complete strike × maturity grid.
///
/// Works on dense indices: strikes and maturities are deduplicated and
/// sorted, and each side keeps the set of opposite-side indices it was
/// quoted with.
#[derive(Debug, Clone)]
pub struct GridExtractor {
    strikes: Vec<f64>,
    maturities: Vec<i64>,
    /// For each strike index, the maturity indices quoted with it.
    strike_adj: Vec<BTreeSet<usize>>,
    /// For each maturity index, the strike indices quoted with it.
    maturity_adj: Vec<BTreeSet<usize>>,
}

impl GridExtractor {
    /// Index the (strike, days-to-expiration) support of the candidate quotes.
    pub fn from_quotes(quotes: &[OptionQuote]) -> Self {
        Self::from_cells(quotes.iter().map(|q| (q.strike, q.days_to_expiration())))
    }

    /// Index an arbitrary set of observed (strike, maturity) cells.
    ///
    /// Duplicated cells are harmless. Strikes compare by exact value.
    pub fn from_cells(cells: impl IntoIterator<Item = (f64, i64)>) -> Self {
        let cells: Vec<(f64, i64)> = cells.into_iter().collect();

        let mut strikes: Vec<f64> = cells.iter().map(|c| c.0).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup_by(|a, b| a.total_cmp(b).is_eq());

        let mut maturities: Vec<i64> = cells.iter().map(|c| c.1).collect();
        maturities.sort_unstable();
        maturities.dedup();

        let mut strike_adj = vec![BTreeSet::new(); strikes.len()];
        let mut maturity_adj = vec![BTreeSet::new(); maturities.len()];
        for (strike, days) in cells {
            // Both lookups succeed: the keys were collected from these cells.
            let (Ok(ki), Ok(ti)) = (
                strikes.binary_search_by(|k| k.total_cmp(&strike)),
                maturities.binary_search(&days),
            ) else {
                continue;
            };
            strike_adj[ki].insert(ti);
            maturity_adj[ti].insert(ki);
        }

        Self {
            strikes,
            maturities,
            strike_adj,
            maturity_adj,
        }
    }

    /// All observed strikes, sorted.
    pub fn observed_strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// All observed maturities, sorted.
    pub fn observed_maturities(&self) -> &[i64] {
        &self.maturities
    }

    /// Run the greedy reduction and return the complete grid.
    ///
    /// An empty candidate set yields an empty [`Grid`]; a candidate set
    /// that is already a full rectangle is returned unchanged.
    pub fn extract(&self) -> Grid {
        let mut active_k: BTreeSet<usize> = (0..self.strikes.len()).collect();
        let mut active_t: BTreeSet<usize> = (0..self.maturities.len()).collect();

        #[cfg(feature = "logging")]
        let mut n_removed = 0usize;

        loop {
            let bad_k = most_deficient(&active_k, &self.strike_adj, &active_t);
            let bad_t = most_deficient(&active_t, &self.maturity_adj, &active_k);
            if bad_k.is_none() && bad_t.is_none() {
                break;
            }

            let (nk, nt) = (active_k.len() as i64, active_t.len() as i64);
            let area_remove_k = if bad_k.is_some() { (nk - 1) * nt } else { -1 };
            let area_remove_t = if bad_t.is_some() { nk * (nt - 1) } else { -1 };

            match (area_remove_k >= area_remove_t, bad_k, bad_t) {
                (true, Some(k), _) => {
                    active_k.remove(&k);
                }
                (false, _, Some(t)) => {
                    active_t.remove(&t);
                }
                _ => break,
            }

            #[cfg(feature = "logging")]
            {
                n_removed += 1;
            }
        }

        let grid = Grid {
            strikes: active_k.iter().map(|&i| self.strikes[i]).collect(),
            maturities: active_t.iter().map(|&i| self.maturities[i]).collect(),
        };

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_strikes_observed = self.strikes.len(),
            n_maturities_observed = self.maturities.len(),
            n_removed,
            n_strikes = grid.strikes.len(),
            n_maturities = grid.maturities.len(),
            area = grid.area(),
            "complete grid extracted"
        );

        grid
    }
}

/// The active member missing the most cells against `opposite`, if any
/// member is missing at least one. Ties resolve to the smallest index.
fn most_deficient(
    active: &BTreeSet<usize>,
    adjacency: &[BTreeSet<usize>],
    opposite: &BTreeSet<usize>,
) -> Option<usize> {
    let mut worst: Option<(usize, usize)> = None;
    for &i in active {
        let covered = adjacency[i].intersection(opposite).count();
        let deficiency = opposite.len() - covered;
        if deficiency == 0 {
            continue;
        }
        if worst.is_none_or(|(_, d)| deficiency > d) {
            worst = Some((i, deficiency));
        }
    }
    worst.map(|(i, _)| i)
}

/// Extract the complete grid supported by a candidate quote set.
///
/// Shorthand for `GridExtractor::from_quotes(quotes).extract()`.
pub fn extract_complete_grid(quotes: &[OptionQuote]) -> Grid {
    GridExtractor::from_quotes(quotes).extract()
}
