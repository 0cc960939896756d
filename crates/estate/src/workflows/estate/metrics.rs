//! Derived listing and investment figures. Everything here is a pure function of
//! stored inputs, evaluated on read.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::domain::Offer;

/// Monetary comparisons are made at cent precision.
pub const PRICE_PRECISION_DIGITS: i32 = 2;
/// Minimum share of the expected price a sale may close at.
pub const SELLING_PRICE_FLOOR_RATIO: f64 = 0.9;

fn round_at(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Compare two amounts after rounding their difference to `digits` decimals,
/// so representation noise never tips the result.
pub fn compare_at_precision(left: f64, right: f64, digits: i32) -> Ordering {
    let delta = round_at(left - right, digits);
    if delta == 0.0 {
        Ordering::Equal
    } else if delta < 0.0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

pub fn is_zero_at_precision(value: f64, digits: i32) -> bool {
    round_at(value, digits) == 0.0
}

pub fn minimum_selling_price(expected_price: f64) -> f64 {
    expected_price * SELLING_PRICE_FLOOR_RATIO
}

/// Whether `selling_price` honours the floor. A zero selling price means unsold.
pub fn selling_price_meets_floor(selling_price: f64, expected_price: f64) -> bool {
    is_zero_at_precision(selling_price, PRICE_PRECISION_DIGITS)
        || compare_at_precision(
            selling_price,
            minimum_selling_price(expected_price),
            PRICE_PRECISION_DIGITS,
        ) != Ordering::Less
}

/// Highest price among all offers, or zero without offers.
pub fn best_price(offers: &[Offer]) -> f64 {
    offers.iter().map(|offer| offer.price).fold(0.0, f64::max)
}

/// Highest price among pending and accepted offers; the bar a new bid must clear.
pub fn live_offer_ceiling(offers: &[Offer]) -> Option<f64> {
    offers
        .iter()
        .filter(|offer| offer.state.is_live())
        .map(|offer| offer.price)
        .reduce(f64::max)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentInputs {
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub arv: f64,
    #[serde(default)]
    pub rehab_cost: f64,
    #[serde(default)]
    pub closing_costs: f64,
    #[serde(default)]
    pub holding_costs: f64,
}

impl InvestmentInputs {
    pub fn total_investment(&self) -> f64 {
        self.purchase_price + self.rehab_cost + self.closing_costs
    }

    pub fn metrics(&self) -> InvestmentMetrics {
        let total_investment = self.total_investment();
        let potential_profit = self.arv - total_investment;
        let roi_percentage = if total_investment > 0.0 {
            potential_profit / total_investment * 100.0
        } else {
            0.0
        };

        InvestmentMetrics {
            total_investment,
            potential_profit,
            roi_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RentalInputs {
    #[serde(default)]
    pub monthly_rent: f64,
    #[serde(default)]
    pub monthly_expenses: f64,
}

impl RentalInputs {
    /// Cash-flow figures; the cap rate is measured against `purchase_price`.
    pub fn metrics(&self, purchase_price: f64) -> RentalMetrics {
        let monthly_cash_flow = self.monthly_rent - self.monthly_expenses;
        let annual_cash_flow = monthly_cash_flow * 12.0;
        let cap_rate = if purchase_price > 0.0 {
            annual_cash_flow / purchase_price * 100.0
        } else {
            0.0
        };

        RentalMetrics {
            monthly_cash_flow,
            annual_cash_flow,
            cap_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvestmentMetrics {
    pub total_investment: f64,
    pub potential_profit: f64,
    pub roi_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RentalMetrics {
    pub monthly_cash_flow: f64,
    pub annual_cash_flow: f64,
    pub cap_rate: f64,
}
