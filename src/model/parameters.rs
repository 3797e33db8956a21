//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::units::{Dimensionless, Power};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_max_capacity_for_binary_constraints, Power, 1e5);
define_unit_param_default!(default_trans_fixed_om_fraction, Dimensionless, 0.03);
define_param_default!(default_trans_capital_cost_per_mw_km, f64, 1000.0);
define_param_default!(default_trans_lifetime_yrs, u32, 20);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The year to which all costs are discounted
    pub base_financial_year: u32,
    /// Interest rate used to annualise capital costs
    pub interest_rate: Dimensionless,
    /// Discount rate used to bring future costs back to the base year
    pub discount_rate: Dimensionless,
    /// Upper bound on capacity built by projects with a minimum build size.
    ///
    /// This must exceed any plausible build, but very large values cause numerical problems in
    /// the solver.
    #[serde(default = "default_max_capacity_for_binary_constraints")]
    pub max_capacity_for_binary_constraints: Power,
    /// Capital cost of new transmission per MW of capacity per km
    #[serde(default = "default_trans_capital_cost_per_mw_km")]
    pub trans_capital_cost_per_mw_km: f64,
    /// Financial lifetime of new transmission
    #[serde(default = "default_trans_lifetime_yrs")]
    pub trans_lifetime_yrs: u32,
    /// Annual fixed O&M cost of transmission as a fraction of capital cost
    #[serde(default = "default_trans_fixed_om_fraction")]
    pub trans_fixed_om_fraction: Dimensionless,
    /// Relative MIP gap passed to the solver
    #[serde(default)]
    pub mip_rel_gap: Option<f64>,
}

/// Check that a rate is a finite, non-negative number
fn check_rate(value: Dimensionless, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `max_capacity_for_binary_constraints` parameter is valid
fn check_max_capacity_for_binary_constraints(value: Power) -> Result<()> {
    ensure!(
        value.is_finite() && value > Power(0.0),
        "max_capacity_for_binary_constraints must be a finite number greater than zero"
    );

    Ok(())
}

/// Check the transmission cost parameters are valid
fn check_transmission_parameters(
    capital_cost: f64,
    lifetime: u32,
    fixed_om_fraction: Dimensionless,
) -> Result<()> {
    ensure!(
        capital_cost.is_finite() && capital_cost >= 0.0,
        "trans_capital_cost_per_mw_km must be a finite number greater than or equal to zero"
    );
    ensure!(lifetime > 0, "trans_lifetime_yrs cannot be zero");
    ensure!(
        (0.0..=1.0).contains(&fixed_om_fraction.value()),
        "trans_fixed_om_fraction must be between 0 and 1"
    );

    Ok(())
}

/// Check the `mip_rel_gap` parameter is valid
fn check_mip_rel_gap(value: Option<f64>) -> Result<()> {
    if let Some(gap) = value {
        ensure!(
            gap.is_finite() && gap >= 0.0,
            "mip_rel_gap must be a finite number greater than or equal to zero"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_rate(self.interest_rate, "interest_rate")?;
        check_rate(self.discount_rate, "discount_rate")?;
        check_max_capacity_for_binary_constraints(self.max_capacity_for_binary_constraints)?;
        check_transmission_parameters(
            self.trans_capital_cost_per_mw_km,
            self.trans_lifetime_yrs,
            self.trans_fixed_om_fraction,
        )?;
        check_mip_rel_gap(self.mip_rel_gap)?;

        Ok(())
    }
}
