//! General functions related to finance.
//!
//! Capital costs are annualised with the capital recovery factor and annual costs are brought
//! back to the base financial year before entering the objective.
use crate::units::{CapitalCost, Dimensionless};

/// Calculates the capital recovery factor (CRF) for a given lifetime and interest rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, interest_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if interest_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + interest_rate).powf(f64::from(lifetime));
    (interest_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annual capital cost per unit of capacity, of power or of energy
pub fn annual_capital_cost<C: CapitalCost>(
    capital_cost: C,
    lifetime: u32,
    interest_rate: Dimensionless,
) -> C::PerYear {
    capital_cost.annualise(capital_recovery_factor(lifetime, interest_rate))
}

/// The present value of a uniform series of annual payments of one unit over `years` years.
pub fn uniform_series_to_present_value(discount_rate: Dimensionless, years: u32) -> Dimensionless {
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(years as f64);
    }
    let r = discount_rate.value();
    Dimensionless((1.0 - (1.0 + r).powf(-f64::from(years))) / r)
}

/// The present value of a single payment of one unit made `years` years in the future.
///
/// `years` may be negative for payments made before the base year.
pub fn future_to_present_value(discount_rate: Dimensionless, years: i32) -> Dimensionless {
    Dimensionless((1.0 + discount_rate.value()).powi(-years))
}

/// Factor converting a cost recurring every year of a period into its value in the base year.
///
/// # Arguments
///
/// * `discount_rate` - The discount rate
/// * `period_length_years` - The number of years in the period
/// * `years_after_base_year` - The number of years between the base year and the period start
pub fn bring_annual_costs_to_base_year(
    discount_rate: Dimensionless,
    period_length_years: u32,
    years_after_base_year: i32,
) -> Dimensionless {
    uniform_series_to_present_value(discount_rate, period_length_years)
        * future_to_present_value(discount_rate, years_after_base_year)
}
