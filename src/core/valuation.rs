//! Profit arithmetic for one merged row.
//!
//! The Buff price is CNY, the market price RUB; conversion pivots
//! through USDT: CNY -> USDT -> RUB. Both the sale proceeds and the
//! resulting margin are discounted by the marketplace commission.

use crate::core::quote::MergedRow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed marketplace commission, applied on both legs.
pub const COMMISSION_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub usdt_to_rub: f64,
    pub cny_to_usdt: f64,
}

impl Default for ExchangeRates {
    // Placeholder defaults, not live rates.
    fn default() -> Self {
        ExchangeRates {
            usdt_to_rub: 75.0,
            cny_to_usdt: 6.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// Buff cost converted to RUB.
    pub converted_cost: f64,
    /// Market sale price after commission, RUB.
    pub net_proceeds: f64,
    /// Absolute profit after commission, RUB.
    pub profit: f64,
    /// Profit relative to the converted cost, percent.
    pub profit_pct: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    #[error("CNY/USDT rate is zero, cannot convert the Buff price")]
    ZeroIntermediateRate,
}

pub fn valuate(
    row: &MergedRow,
    rates: ExchangeRates,
    commission: f64,
) -> Result<Valuation, ValuationError> {
    if rates.cny_to_usdt == 0.0 {
        return Err(ValuationError::ZeroIntermediateRate);
    }

    let net_proceeds = row.market_price * (1.0 - commission);
    let converted_cost = (row.buff_price / rates.cny_to_usdt) * rates.usdt_to_rub;
    let profit = (net_proceeds - converted_cost) * (1.0 - commission);
    // Zero cost means the percentage is undefined; report 0 by policy.
    let profit_pct = if converted_cost != 0.0 {
        (profit / converted_cost) * 100.0
    } else {
        0.0
    };

    Ok(Valuation {
        converted_cost,
        net_proceeds,
        profit,
        profit_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buff_price: f64, market_price: f64) -> MergedRow {
        MergedRow {
            description: "AK-47 | Redline".to_string(),
            buff_price,
            market_price,
        }
    }

    #[test]
    fn test_default_rates() {
        let rates = ExchangeRates::default();
        assert_eq!(rates.usdt_to_rub, 75.0);
        assert_eq!(rates.cny_to_usdt, 6.5);
    }

    #[test]
    fn test_valuate_worked_example() {
        let rates = ExchangeRates::default();
        let v = valuate(&row(100.0, 95.0), rates, COMMISSION_RATE).unwrap();

        assert!((v.converted_cost - 1153.846).abs() < 0.01);
        assert!((v.net_proceeds - 90.25).abs() < 1e-9);
        assert!((v.profit - -1010.416).abs() < 0.01);
        assert!((v.profit_pct - -87.569).abs() < 0.01);
    }

    #[test]
    fn test_valuate_zero_intermediate_rate_is_an_error() {
        let rates = ExchangeRates {
            usdt_to_rub: 75.0,
            cny_to_usdt: 0.0,
        };
        let result = valuate(&row(100.0, 95.0), rates, COMMISSION_RATE);
        assert_eq!(result, Err(ValuationError::ZeroIntermediateRate));
    }

    #[test]
    fn test_valuate_zero_cost_reports_zero_percent() {
        let rates = ExchangeRates::default();
        let v = valuate(&row(0.0, 95.0), rates, COMMISSION_RATE).unwrap();

        assert_eq!(v.converted_cost, 0.0);
        assert_eq!(v.profit_pct, 0.0);
        assert!(v.profit > 0.0);
    }

    #[test]
    fn test_valuate_positive_margin() {
        let rates = ExchangeRates {
            usdt_to_rub: 75.0,
            cny_to_usdt: 6.5,
        };
        // Cheap on Buff, expensive on the market.
        let v = valuate(&row(10.0, 500.0), rates, COMMISSION_RATE).unwrap();
        assert!(v.profit > 0.0);
        assert!(v.profit_pct > 0.0);
    }
}
