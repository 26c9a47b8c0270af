//! Price options with Black-Scholes and invert prices back to implied vol.
//!
//! Shows how to:
//!   - Price a call, a put and a straddle
//!   - Recover implied vol by bisection
//!   - See which prices have no implied vol
//!
//! Run with: `cargo run --example implied_vol`

use volgrid::pricing::{
    implied_volatility, intrinsic_lower_bound, price_option, straddle_price, try_price_option,
    ImpliedVolConfig, ImpliedVolSolver,
};
use volgrid::OptionType;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spot = 100.0;
    let strike = 105.0;
    let expiry = 0.5; // 6 months
    let rate = 0.03;
    let vol = 0.25;

    // ---------------------------------------------------------------
    // 1. Price a call, a put and a straddle
    // ---------------------------------------------------------------

    let call = try_price_option(OptionType::Call, spot, strike, expiry, rate, vol)?;
    let put = try_price_option(OptionType::Put, spot, strike, expiry, rate, vol)?;
    let straddle = straddle_price(spot, strike, expiry, rate, vol);

    println!("Black-Scholes pricing");
    println!("  Spot:   {spot}");
    println!("  Strike: {strike}");
    println!("  Expiry: {expiry}y, rate {:.1}%", rate * 100.0);
    println!("  Vol:    {:.0}%", vol * 100.0);
    println!();
    println!("  Call:     {call:.6}");
    println!("  Put:      {put:.6}");
    println!("  Straddle: {straddle:.6}");
    println!(
        "  Parity: C - P = {:.6}, S - K·e^(-rT) = {:.6}",
        call - put,
        spot - strike * (-rate * expiry).exp()
    );

    // ---------------------------------------------------------------
    // 2. Invert both prices
    // ---------------------------------------------------------------

    let iv_call = implied_volatility(call, spot, strike, expiry, rate, OptionType::Call)
        .ok_or("call price has no implied vol")?;
    let iv_put = implied_volatility(put, spot, strike, expiry, rate, OptionType::Put)
        .ok_or("put price has no implied vol")?;
    println!("\nImplied vol (bisection, tol 1e-6)");
    println!("  From call: {:.8}", iv_call.0);
    println!("  From put:  {:.8}", iv_put.0);

    // ---------------------------------------------------------------
    // 3. Undefined cases
    // ---------------------------------------------------------------

    let floor = intrinsic_lower_bound(OptionType::Put, spot, 130.0, expiry, rate);
    println!("\nPrices without an implied vol");
    println!(
        "  Put K=130 below intrinsic ({floor:.4}): {:?}",
        implied_volatility(floor - 0.5, spot, 130.0, expiry, rate, OptionType::Put)
    );
    println!(
        "  Zero price:  {:?}",
        implied_volatility(0.0, spot, strike, expiry, rate, OptionType::Call)
    );

    // ---------------------------------------------------------------
    // 4. Scan across strikes with a tighter solver
    // ---------------------------------------------------------------

    let solver = ImpliedVolSolver::new(ImpliedVolConfig {
        tolerance: 1e-10,
        max_iterations: 200,
        ..ImpliedVolConfig::default()
    })?;

    println!("\n--- IV extraction across strikes ---\n");
    println!("{:>8} {:>6} {:>12} {:>12} {:>12}", "Strike", "Type", "Price", "IV", "Error");
    println!("{}", "-".repeat(54));
    for strike in [80.0, 90.0, 95.0, 100.0, 105.0, 110.0, 120.0] {
        let side = if strike >= spot { OptionType::Call } else { OptionType::Put };
        let market_vol = 0.25 + 0.4 * (strike / spot).ln().powi(2);
        let price = price_option(side, spot, strike, expiry, rate, market_vol);
        match solver.solve(price, spot, strike, expiry, rate, side) {
            Some(iv) => println!(
                "{strike:>8.1} {:>6} {price:>12.6} {:>12.8} {:>12.2e}",
                side.code(),
                iv.0,
                (iv.0 - market_vol).abs()
            ),
            None => println!("{strike:>8.1} {:>6} {price:>12.6} {:>12}", side.code(), "-"),
        }
    }

    Ok(())
}
