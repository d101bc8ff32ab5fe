//! Investment calculators.

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::cli::{load_settings, open_store, output};
use cbe_tbills::calculator;

pub fn run_primary(
    db: Option<&Path>,
    face: f64,
    tenor: u32,
    yield_percent: Option<f64>,
    tax: f64,
) -> Result<()> {
    let (yield_percent, source) = match yield_percent {
        Some(y) => (y, None),
        None => {
            let settings = load_settings(db)?;
            let snapshot = open_store(&settings)?.latest()?;
            let y = snapshot
                .yield_for(tenor)
                .ok_or_else(|| anyhow!("no stored yield for a {tenor}-day tenor; pass --yield"))?;
            (y, Some(snapshot.label.to_string()))
        }
    };

    let result = calculator::primary_yield(face, yield_percent, tenor, tax)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "yield_percent": yield_percent,
            "yield_source": source,
            "result": result,
        }));
        return Ok(());
    }

    match source {
        Some(label) => println!("  {tenor} days at {yield_percent:.3}% (latest yield, {label})"),
        None => println!("  {tenor} days at {yield_percent:.3}%"),
    }
    println!();
    println!("    Purchase price   {:>14.2}", result.purchase_price);
    println!("    Gross return     {:>14.2}", result.gross_return);
    println!("    Tax ({tax:.0}%)       {:>14.2}", result.tax_amount);
    println!("    Net return       {:>14.2}", result.net_return);
    println!("    Total payout     {:>14.2}", result.total_payout);
    println!("    Real profit      {:>13.3}%", result.real_profit_percent);
    Ok(())
}

pub fn run_secondary(
    face: f64,
    tenor: u32,
    yield_percent: f64,
    holding: u32,
    secondary_yield: f64,
    tax: f64,
) -> Result<()> {
    let result =
        calculator::secondary_sale(face, yield_percent, tenor, holding, secondary_yield, tax)?;

    if output::is_json() {
        output::print_json(&result);
        return Ok(());
    }

    println!("  Sold after {holding} of {tenor} days at {secondary_yield:.3}%");
    println!();
    println!("    Original price   {:>14.2}", result.original_purchase_price);
    println!("    Sale price       {:>14.2}", result.sale_price);
    println!("    Gross profit     {:>14.2}", result.gross_profit);
    println!("    Tax              {:>14.2}", result.tax_amount);
    println!("    Net profit       {:>14.2}", result.net_profit);
    println!("    Period yield     {:>13.3}%", result.period_yield_percent);
    Ok(())
}
