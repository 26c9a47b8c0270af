//! Build an implied volatility surface from one snapshot of an option chain.
//!
//! Demonstrates the full workflow:
//!   1. Parse OCC-coded quotes with bid / ask but no vendor implied vol
//!   2. Backfill implied vols, filter and extract the complete grid
//!   3. Build raw and smoothed surfaces
//!   4. Slice the skew of one maturity
//!
//! Run with: `RUST_LOG=volgrid=debug cargo run --example snapshot_surface`

use chrono::{Days, NaiveDate};
use tracing_subscriber::EnvFilter;
use volgrid::pipeline::{PipelineConfig, SurfacePipeline};
use volgrid::pricing::price_option;
use volgrid::quote::OptionQuote;
use volgrid::surface::SkewAxis;
use volgrid::OptionType;

const SPOT: f64 = 180.0;
const RATE: f64 = 0.042;

fn market_vol(strike: f64, days: u64) -> f64 {
    let k = (strike / SPOT).ln();
    0.46 - 0.18 * k + 0.9 * k * k * (60.0 / days as f64).sqrt()
}

/// A chain with some holes: far strikes are not listed for every expiry.
fn synthetic_chain(snapshot: NaiveDate) -> Result<Vec<OptionQuote>, Box<dyn std::error::Error>> {
    let mut chain = Vec::new();
    for days in [7_u64, 35, 63, 98, 126, 189, 280] {
        let expiry = snapshot
            .checked_add_days(Days::new(days))
            .ok_or("expiry out of range")?;
        for strike in (0..13).map(|i| 120.0 + 10.0 * i as f64) {
            if (strike - SPOT).abs() > 45.0 && days % 2 == 0 {
                continue;
            }
            for side in [OptionType::Call, OptionType::Put] {
                let t = days as f64 / 365.0;
                let price = price_option(side, SPOT, strike, t, RATE, market_vol(strike, days));
                let symbol = format!(
                    "NVDA{}{}{:08}",
                    expiry.format("%y%m%d"),
                    side.code(),
                    (strike * 1000.0).round() as u64
                );
                let spread = (0.02 * price).max(0.01);
                let quote = OptionQuote::from_occ_symbol("NVDA", &symbol, snapshot, SPOT)?
                    .with_bid_ask((price - spread).max(0.0), price + spread)
                    .with_liquidity(120, 2_500);
                chain.push(quote);
            }
        }
    }
    Ok(chain)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let snapshot = NaiveDate::from_ymd_opt(2025, 12, 12).ok_or("invalid date")?;
    let chain = synthetic_chain(snapshot)?;

    // ---------------------------------------------------------------
    // 1. Raw surface
    // ---------------------------------------------------------------

    let config = PipelineConfig::from_json(&format!(r#"{{"rate": {RATE}}}"#))?;
    let pipeline = SurfacePipeline::new(config)?;
    let output = pipeline.run(&chain, "NVDA", snapshot)?;

    println!("NVDA {snapshot}: {} quotes in chain", chain.len());
    println!("  candidates after filter: {}", output.n_candidates);
    println!(
        "  complete grid: {} strikes × {} maturities",
        output.grid.strikes.len(),
        output.grid.maturities.len()
    );
    println!("  strikes:    {:?}", output.grid.strikes);
    println!("  maturities: {:?} days", output.grid.maturities);

    println!("\nRaw surface (rows ln(K/S), columns days)");
    print!("{:>8}", "");
    for t in &output.surface.maturities {
        print!("{t:>8.0}");
    }
    println!();
    for (k, row) in output.surface.log_moneyness.iter().zip(&output.surface.values) {
        print!("{k:>8.3}");
        for v in row {
            print!("{:>8.3}", v);
        }
        println!();
    }

    // ---------------------------------------------------------------
    // 2. Smoothed surface
    // ---------------------------------------------------------------

    let mut config = config;
    config.surface.interpolate = true;
    let smoothed = SurfacePipeline::new(config)?.run(&chain, "NVDA", snapshot)?.surface;
    let (rows, cols) = smoothed.shape();
    println!("\nSmoothed surface: {rows} × {cols} mesh");
    if let (Some(lo), Some(hi)) = (smoothed.iv_quantile(0.05), smoothed.iv_quantile(0.95)) {
        println!("  IV 5%–95% range: {lo:.3} – {hi:.3}");
    }

    // ---------------------------------------------------------------
    // 3. Skew of the first maturity at least 60 days out
    // ---------------------------------------------------------------

    for axis in [SkewAxis::LogMoneyness, SkewAxis::Delta { rate: Some(RATE) }] {
        let skew = pipeline.skew(&chain, "NVDA", snapshot, 60, axis)?;
        println!("\nSkew at {} days on {:?}", skew.maturity, axis);
        for p in &skew.points {
            println!("  {:>9.3}  {:.4}  ({} {})", p.x, p.implied_vol, p.option_type.code(), p.strike);
        }
    }

    Ok(())
}
