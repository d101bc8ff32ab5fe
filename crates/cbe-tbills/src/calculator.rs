//! T-bill return calculators.
//!
//! T-bills are discount instruments: the buyer pays
//! `face / (1 + yield × tenor / 365)` and receives the face value at
//! maturity. Tax applies to profit only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DAYS_IN_YEAR: f64 = 365.0;
pub const DEFAULT_TAX_RATE_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("face value must be positive (got {0})")]
    FaceValue(f64),
    #[error("yield must be positive (got {0})")]
    Yield(f64),
    #[error("tenor must be at least one day")]
    Tenor,
    #[error("tax rate must be between 0 and 100 (got {0})")]
    TaxRate(f64),
    #[error("holding days must be at least 1 and less than the {tenor}-day tenor (got {holding})")]
    HoldingDays { holding: u32, tenor: u32 },
}

/// Buy-at-auction, hold-to-maturity result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryYield {
    pub purchase_price: f64,
    pub gross_return: f64,
    pub tax_amount: f64,
    pub net_return: f64,
    pub total_payout: f64,
    /// Net return over the price actually paid, in percent.
    pub real_profit_percent: f64,
}

/// Early sale on the secondary market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondarySale {
    pub original_purchase_price: f64,
    pub sale_price: f64,
    pub gross_profit: f64,
    pub tax_amount: f64,
    pub net_profit: f64,
    /// Net profit over the original price for the holding period, in percent.
    pub period_yield_percent: f64,
}

/// Price of a bill with `days` to maturity at `yield_percent`.
pub fn discount_price(face_value: f64, yield_percent: f64, days: u32) -> f64 {
    face_value / (1.0 + yield_percent / 100.0 * f64::from(days) / DAYS_IN_YEAR)
}

pub fn primary_yield(
    face_value: f64,
    yield_percent: f64,
    tenor_days: u32,
    tax_rate_percent: f64,
) -> Result<PrimaryYield, CalcError> {
    check_common(face_value, yield_percent, tenor_days, tax_rate_percent)?;

    let purchase_price = discount_price(face_value, yield_percent, tenor_days);
    let gross_return = face_value - purchase_price;
    let tax_amount = gross_return * tax_rate_percent / 100.0;
    let net_return = gross_return - tax_amount;

    Ok(PrimaryYield {
        purchase_price,
        gross_return,
        tax_amount,
        net_return,
        total_payout: face_value,
        real_profit_percent: net_return / purchase_price * 100.0,
    })
}

pub fn secondary_sale(
    face_value: f64,
    original_yield_percent: f64,
    original_tenor_days: u32,
    holding_days: u32,
    secondary_yield_percent: f64,
    tax_rate_percent: f64,
) -> Result<SecondarySale, CalcError> {
    check_common(face_value, original_yield_percent, original_tenor_days, tax_rate_percent)?;
    if !(secondary_yield_percent.is_finite() && secondary_yield_percent > 0.0) {
        return Err(CalcError::Yield(secondary_yield_percent));
    }
    if holding_days == 0 || holding_days >= original_tenor_days {
        return Err(CalcError::HoldingDays {
            holding: holding_days,
            tenor: original_tenor_days,
        });
    }

    let original_purchase_price = discount_price(face_value, original_yield_percent, original_tenor_days);
    let remaining_days = original_tenor_days - holding_days;
    let sale_price = discount_price(face_value, secondary_yield_percent, remaining_days);

    let gross_profit = sale_price - original_purchase_price;
    let tax_amount = (gross_profit * tax_rate_percent / 100.0).max(0.0);
    let net_profit = gross_profit - tax_amount;

    Ok(SecondarySale {
        original_purchase_price,
        sale_price,
        gross_profit,
        tax_amount,
        net_profit,
        period_yield_percent: net_profit / original_purchase_price * 100.0,
    })
}

fn check_common(face_value: f64, yield_percent: f64, tenor_days: u32, tax: f64) -> Result<(), CalcError> {
    if !(face_value.is_finite() && face_value > 0.0) {
        return Err(CalcError::FaceValue(face_value));
    }
    if !(yield_percent.is_finite() && yield_percent > 0.0) {
        return Err(CalcError::Yield(yield_percent));
    }
    if tenor_days == 0 {
        return Err(CalcError::Tenor);
    }
    if !(0.0..=100.0).contains(&tax) {
        return Err(CalcError::TaxRate(tax));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_primary_yield_is_self_consistent() {
        let r = primary_yield(100_000.0, 25.0, 364, 20.0).unwrap();
        assert!(approx(r.purchase_price + r.gross_return, 100_000.0));
        assert!(approx(r.gross_return - r.tax_amount, r.net_return));
        assert!(approx(r.tax_amount, r.gross_return * 0.2));
        assert_eq!(r.total_payout, 100_000.0);
        assert!(r.purchase_price < 100_000.0);
    }

    #[test]
    fn test_primary_yield_invalid_inputs() {
        assert_eq!(primary_yield(0.0, 25.0, 364, 20.0), Err(CalcError::FaceValue(0.0)));
        assert_eq!(primary_yield(100_000.0, 0.0, 364, 20.0), Err(CalcError::Yield(0.0)));
        assert_eq!(primary_yield(100_000.0, 25.0, 0, 20.0), Err(CalcError::Tenor));
        assert_eq!(primary_yield(100_000.0, 25.0, 364, 101.0), Err(CalcError::TaxRate(101.0)));
    }

    #[test]
    fn test_secondary_sale_with_profit() {
        let r = secondary_sale(100_000.0, 25.0, 364, 90, 23.0, 20.0).unwrap();
        assert!(approx(r.original_purchase_price + r.gross_profit, r.sale_price));
        assert!(approx(r.gross_profit - r.tax_amount, r.net_profit));
        assert!(r.tax_amount > 0.0);
    }

    #[test]
    fn test_secondary_sale_with_loss_has_no_tax() {
        let r = secondary_sale(100_000.0, 25.0, 364, 90, 35.0, 20.0).unwrap();
        assert!(approx(r.original_purchase_price + r.gross_profit, r.sale_price));
        assert!(r.gross_profit < 0.0);
        assert_eq!(r.tax_amount, 0.0);
        assert_eq!(r.gross_profit, r.net_profit);
    }

    #[test]
    fn test_secondary_sale_invalid_holding_days() {
        assert_eq!(
            secondary_sale(100_000.0, 25.0, 91, 91, 28.0, 20.0),
            Err(CalcError::HoldingDays { holding: 91, tenor: 91 })
        );
        assert!(secondary_sale(100_000.0, 25.0, 91, 0, 28.0, 20.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_purchase_price_plus_gross_return_is_face_value(
            face in 1.0f64..10_000_000.0,
            yield_percent in 0.01f64..99.99,
            tenor in 1u32..3650,
            tax in 0.0f64..=100.0,
        ) {
            let r = primary_yield(face, yield_percent, tenor, tax).unwrap();
            prop_assert!(approx(r.purchase_price + r.gross_return, face));
            prop_assert!(r.purchase_price > 0.0 && r.purchase_price < face);
        }
    }
}
