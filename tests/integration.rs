//! Integration tests for the volgrid pipeline.
//!
//! Exercises the full path from OCC-coded market quotes through implied
//! vol backfill, filtering, grid extraction and surface construction,
//! plus the error paths a caller has to handle.

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use chrono::{Days, NaiveDate};
use volgrid::grid::extract_complete_grid;
use volgrid::pipeline::{PipelineConfig, SurfacePipeline};
use volgrid::pricing::price_option;
use volgrid::quote::OptionQuote;
use volgrid::surface::{build_surface, SkewAxis, SurfaceKind, VolSurface};
use volgrid::{OptionType, VolGridError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SPOT: f64 = 100.0;
const RATE: f64 = 0.04;
const STRIKES: [f64; 5] = [80.0, 90.0, 100.0, 110.0, 120.0];
const MATURITIES: [u64; 4] = [35, 63, 98, 154];

fn snapshot() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 12).unwrap()
}

/// Smile with a negative skew and some convexity.
fn smile_vol(strike: f64) -> f64 {
    let k = (strike / SPOT).ln();
    0.30 - 0.10 * k + 0.50 * k * k
}

fn occ_symbol(root: &str, expiry: NaiveDate, side: OptionType, strike: f64) -> String {
    format!(
        "{root}{}{}{:08}",
        expiry.format("%y%m%d"),
        side.code(),
        (strike * 1000.0).round() as u64
    )
}

/// One quote per (strike, maturity) on its own wing, priced off
/// [`smile_vol`] with no vendor implied vol.
fn priced_chain(root: &str) -> Vec<OptionQuote> {
    let date = snapshot();
    let mut chain = Vec::new();
    for days in MATURITIES {
        let expiry = date.checked_add_days(Days::new(days)).unwrap();
        for strike in STRIKES {
            let side = if strike >= SPOT { OptionType::Call } else { OptionType::Put };
            let t = days as f64 / 365.0;
            let price = price_option(side, SPOT, strike, t, RATE, smile_vol(strike));
            let symbol = occ_symbol(root, expiry, side, strike);
            let quote = OptionQuote::from_occ_symbol(root, &symbol, date, SPOT)
                .unwrap()
                .with_bid_ask(price - 0.01, price + 0.01)
                .with_liquidity(50, 1_000);
            chain.push(quote);
        }
    }
    chain
}

fn backfilling_pipeline() -> SurfacePipeline {
    SurfacePipeline::new(PipelineConfig {
        rate: Some(RATE),
        ..PipelineConfig::default()
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn backfilled_chain_builds_full_raw_surface() -> Result<(), Box<dyn std::error::Error>> {
    let output = backfilling_pipeline().run(&priced_chain("NVDA"), "NVDA", snapshot())?;

    assert_eq!(output.n_candidates, 20);
    assert_eq!(output.grid.strikes, STRIKES.to_vec());
    assert_eq!(output.grid.maturities, vec![35, 63, 98, 154]);

    let surface = &output.surface;
    assert_eq!(surface.kind, SurfaceKind::Raw);
    assert_eq!(surface.shape(), (5, 4));
    assert_abs_diff_eq!(surface.spot, SPOT);
    for (row, &strike) in STRIKES.iter().enumerate() {
        for col in 0..MATURITIES.len() {
            let vol = surface.get(row, col).ok_or("missing node")?;
            assert!(
                (vol - smile_vol(strike)).abs() < 1e-3,
                "vol at strike {strike} col {col}: {vol}"
            );
        }
    }
    Ok(())
}

#[test]
fn illiquid_and_wrong_wing_quotes_do_not_reach_the_grid() -> Result<(), Box<dyn std::error::Error>> {
    let date = snapshot();
    let mut chain = priced_chain("NVDA");
    let expiry = date.checked_add_days(Days::new(35)).unwrap();

    // Far call with thin open interest would add a strike column.
    let thin = OptionQuote::new("NVDA", date, expiry, OptionType::Call, 130.0, SPOT)?
        .with_implied_vol(0.35)
        .with_liquidity(3, 4);
    // In-the-money call sits on the put wing.
    let itm_call = OptionQuote::new("NVDA", date, expiry, OptionType::Call, 85.0, SPOT)?
        .with_implied_vol(0.33)
        .with_liquidity(100, 1_000);
    chain.push(thin);
    chain.push(itm_call);

    let output = backfilling_pipeline().run(&chain, "NVDA", date)?;
    assert_eq!(output.n_candidates, 20);
    assert_eq!(output.grid.area(), 20);
    Ok(())
}

#[test]
fn missing_quote_shrinks_grid_by_one_strike() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = priced_chain("NVDA");
    // Drop the 120 call at 154 days.
    chain.retain(|q| !(q.strike == 120.0 && q.days_to_expiration() == 154));

    let output = backfilling_pipeline().run(&chain, "NVDA", snapshot())?;
    // max(4 × 4, 5 × 3)
    assert_eq!(output.grid.area(), 16);
    assert_eq!(output.grid.strikes, vec![80.0, 90.0, 100.0, 110.0]);
    assert_eq!(output.grid.maturities.len(), 4);
    assert_eq!(output.surface.shape(), (4, 4));
    Ok(())
}

#[test]
fn smoothed_surface_tracks_the_smile() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::from_json(
        r#"{"rate": 0.04, "surface": {"interpolate": true, "mesh_maturities": 30, "mesh_moneyness": 40}}"#,
    )?;
    config.surface.smoothing = 1e-4;
    let pipeline = SurfacePipeline::new(config)?;
    let output = pipeline.run(&priced_chain("NVDA"), "NVDA", snapshot())?;

    let surface = &output.surface;
    assert_eq!(surface.kind, SurfaceKind::Smoothed);
    assert_eq!(surface.shape(), (40, 30));
    assert_abs_diff_eq!(surface.maturities[0], 35.0);
    assert_abs_diff_eq!(surface.maturities[29], 154.0);

    // ATM sits inside the mesh; the spline stays close to the smile there.
    for (t, k, vol) in surface.points() {
        assert!(vol.is_finite(), "non-finite vol at ({t}, {k})");
        let strike = SPOT * k.exp();
        assert!(
            (vol - smile_vol(strike)).abs() < 0.02,
            "vol({t}, {k}) = {vol}, smile {}",
            smile_vol(strike)
        );
    }

    let lo = surface.iv_quantile(0.05).ok_or("empty surface")?;
    let hi = surface.iv_quantile(0.95).ok_or("empty surface")?;
    assert!(lo < hi);
    Ok(())
}

#[test]
fn delta_skew_from_backfilled_vols() -> Result<(), Box<dyn std::error::Error>> {
    let skew = backfilling_pipeline().skew(
        &priced_chain("NVDA"),
        "NVDA",
        snapshot(),
        60,
        SkewAxis::Delta { rate: Some(RATE) },
    )?;
    assert_eq!(skew.maturity, 63);
    assert_eq!(skew.points.len(), 5);
    // Call-equivalent delta falls as strike rises.
    assert!(skew.points.iter().all(|p| p.x > 0.0 && p.x < 100.0));
    assert_eq!(skew.points[0].strike, 120.0);
    assert_eq!(skew.points[4].strike, 80.0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Grid scenarios
// ---------------------------------------------------------------------------

#[test]
fn stray_strike_is_dropped_from_grid() -> Result<(), Box<dyn std::error::Error>> {
    let date = snapshot();
    let mut quotes = Vec::new();
    for (strike, days) in [
        (90.0, 30),
        (100.0, 30),
        (110.0, 30),
        (90.0, 60),
        (100.0, 60),
        (110.0, 60),
        (120.0, 30),
    ] {
        let expiry = date.checked_add_days(Days::new(days)).ok_or("date overflow")?;
        quotes.push(
            OptionQuote::new("TEST", date, expiry, OptionType::Call, strike, 100.0)?
                .with_implied_vol(0.2 + strike / 1000.0),
        );
    }

    let grid = extract_complete_grid(&quotes);
    assert_eq!(grid.strikes, vec![90.0, 100.0, 110.0]);
    assert_eq!(grid.maturities, vec![30, 60]);

    let surface = build_surface(&quotes, &grid, false)?;
    assert_eq!(surface.shape(), (3, 2));
    assert_eq!(surface.n_quotes, 6);
    Ok(())
}

// ---------------------------------------------------------------------------
// Error paths
// ---------------------------------------------------------------------------

#[test]
fn empty_input_is_an_empty_grid() {
    let grid = extract_complete_grid(&[]);
    assert!(grid.strikes.is_empty() && grid.maturities.is_empty());
    assert!(matches!(
        build_surface(&[], &grid, false),
        Err(VolGridError::EmptyGrid { .. })
    ));

    let pipeline = SurfacePipeline::new(PipelineConfig::default()).unwrap();
    assert!(matches!(
        pipeline.run(&[], "NVDA", snapshot()),
        Err(VolGridError::EmptyGrid { .. })
    ));
}

#[test]
fn chain_without_vols_and_no_rate_is_an_empty_grid() {
    let pipeline = SurfacePipeline::new(PipelineConfig::default()).unwrap();
    let result = pipeline.run(&priced_chain("NVDA"), "NVDA", snapshot());
    match result {
        Err(VolGridError::EmptyGrid { message }) => assert!(message.contains("NVDA")),
        other => panic!("expected EmptyGrid, got {other:?}"),
    }
}

#[test]
fn grid_from_other_quotes_is_inconsistent() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = backfilling_pipeline();
    let full = pipeline.candidates(&priced_chain("NVDA"), "NVDA", snapshot())?;
    let grid = extract_complete_grid(&full);

    let partial: Vec<OptionQuote> = full.into_iter().skip(1).collect();
    assert!(matches!(
        build_surface(&partial, &grid, false),
        Err(VolGridError::InconsistentGrid { .. })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Thread safety & serialization
// ---------------------------------------------------------------------------

#[test]
fn public_types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SurfacePipeline>();
    assert_send_sync::<VolSurface>();
    assert_send_sync::<OptionQuote>();
    assert_send_sync::<volgrid::Grid>();
    assert_send_sync::<VolGridError>();
}

#[test]
fn independent_snapshots_run_on_separate_threads() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(backfilling_pipeline());
    let roots = ["NVDA", "AAPL", "MSFT", "SPY"];
    let mut chain = Vec::new();
    for root in roots {
        chain.extend(priced_chain(root));
    }
    let chain = Arc::new(chain);

    let handles: Vec<_> = roots
        .iter()
        .map(|&root| {
            let p = Arc::clone(&pipeline);
            let c = Arc::clone(&chain);
            thread::spawn(move || -> volgrid::Result<usize> {
                let output = p.run(&c, root, snapshot())?;
                Ok(output.grid.area())
            })
        })
        .collect();

    for h in handles {
        let area = h.join().expect("thread panicked")?;
        assert_eq!(area, 20);
    }
    Ok(())
}

#[test]
fn surface_output_serializes_to_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = backfilling_pipeline().run(&priced_chain("NVDA"), "NVDA", snapshot())?;
    let json = serde_json::to_string(&output)?;
    assert!(json.contains("\"kind\":\"Raw\""));
    let back: volgrid::SurfaceOutput = serde_json::from_str(&json)?;
    assert_eq!(back.grid, output.grid);
    assert_eq!(back.surface.shape(), output.surface.shape());
    for ((_, _, a), (_, _, b)) in back.surface.points().zip(output.surface.points()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
    Ok(())
}
