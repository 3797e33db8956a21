//! The cost ledger, from which the objective is formed.
//!
//! Components register named costs either per period (annual costs, such as fixed costs of
//! capacity) or per timepoint (hourly costs, such as fuel). Sealing the registry adds every
//! component to the objective, discounted to the base financial year.
use crate::finance::bring_annual_costs_to_base_year;
use crate::model::ModelParameters;
use crate::optimisation::{LinearExpr, Program, Solution};
use crate::timescale::{TimepointID, Timescales};
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

/// A named cost component with one expression per key
#[derive(Debug, Clone, PartialEq)]
pub struct CostComponent<K: Eq + std::hash::Hash> {
    /// Name of the component
    pub name: String,
    values: IndexMap<K, LinearExpr>,
}

impl<K: Eq + std::hash::Hash> CostComponent<K> {
    fn value(&self, solution: &Solution, key: &K) -> f64 {
        self.values
            .get(key)
            .map_or(0.0, |expr| solution.evaluate(expr))
    }
}

/// Collects cost components until they are added to the objective
#[derive(Debug, Default)]
pub struct CostRegistry {
    period_costs: Vec<CostComponent<u32>>,
    timepoint_costs: Vec<CostComponent<TimepointID>>,
}

impl CostRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(&self, name: &str) -> Result<()> {
        ensure!(
            !self.period_costs.iter().any(|cost| cost.name == name)
                && !self.timepoint_costs.iter().any(|cost| cost.name == name),
            "Cost component {name} is already registered"
        );

        Ok(())
    }

    /// Register an annual cost incurred in every year of each period
    pub fn add_period_cost(&mut self, name: &str, values: IndexMap<u32, LinearExpr>) -> Result<()> {
        self.check_name(name)?;
        self.period_costs.push(CostComponent {
            name: name.to_string(),
            values,
        });

        Ok(())
    }

    /// Register an hourly cost incurred in each timepoint
    pub fn add_timepoint_cost(
        &mut self,
        name: &str,
        values: IndexMap<TimepointID, LinearExpr>,
    ) -> Result<()> {
        self.check_name(name)?;
        self.timepoint_costs.push(CostComponent {
            name: name.to_string(),
            values,
        });

        Ok(())
    }

    /// Add all cost components to the objective of the program
    pub fn seal(
        self,
        program: &mut Program,
        parameters: &ModelParameters,
        timescales: &Timescales,
    ) -> Result<CostLedger> {
        let discount_factors = discount_factors(parameters, timescales)?;
        for cost in &self.period_costs {
            for (period, expr) in &cost.values {
                program.add_to_objective(expr, discount_factors[period].value());
            }
        }
        for cost in &self.timepoint_costs {
            for (timepoint, expr) in &cost.values {
                let Some(tp) = timescales.timepoint(timepoint) else {
                    continue;
                };
                let factor = discount_factors[&tp.period].value() * tp.weight_in_year;
                program.add_to_objective(expr, factor);
            }
        }

        Ok(CostLedger {
            period_costs: self.period_costs,
            timepoint_costs: self.timepoint_costs,
            discount_factors,
        })
    }
}

/// The factor converting annual costs in each period into their value in the base year
pub fn discount_factors(
    parameters: &ModelParameters,
    timescales: &Timescales,
) -> Result<IndexMap<u32, Dimensionless>> {
    timescales
        .iter_periods()
        .map(|period| {
            let years_after_base = i32::try_from(
                i64::from(period.start) - i64::from(parameters.base_financial_year),
            )
            .with_context(|| {
                format!(
                    "Period {} starts too far from the base financial year",
                    period.label
                )
            })?;
            let factor = bring_annual_costs_to_base_year(
                parameters.discount_rate,
                period.length_years(),
                years_after_base,
            );
            Ok((period.label, factor))
        })
        .collect()
}

/// The annual cost of a component in a period
#[derive(Debug, Clone, PartialEq)]
pub struct ItemisedCost {
    /// The period
    pub period: u32,
    /// Name of the cost component
    pub component: String,
    /// Annual cost, undiscounted
    pub annual_real: f64,
    /// Annual cost, discounted to the base year
    pub annual_npv: f64,
}

/// The registered cost components, after they were added to the objective
#[derive(Debug, Clone, PartialEq)]
pub struct CostLedger {
    period_costs: Vec<CostComponent<u32>>,
    timepoint_costs: Vec<CostComponent<TimepointID>>,
    discount_factors: IndexMap<u32, Dimensionless>,
}

impl CostLedger {
    /// The discount factor for a period
    pub fn discount_factor(&self, period: u32) -> Dimensionless {
        self.discount_factors
            .get(&period)
            .copied()
            .unwrap_or_default()
    }

    /// The annual value of every cost component in every period of a solution.
    ///
    /// Hourly costs are summed over the timepoints of a period, weighted by the number of hours
    /// each represents in a year.
    pub fn itemise(&self, solution: &Solution, timescales: &Timescales) -> Vec<ItemisedCost> {
        let mut items = Vec::new();
        for period in timescales.iter_periods() {
            let factor = self.discount_factor(period.label).value();
            for cost in &self.period_costs {
                let annual_real = cost.value(solution, &period.label);
                items.push(ItemisedCost {
                    period: period.label,
                    component: cost.name.clone(),
                    annual_real,
                    annual_npv: annual_real * factor,
                });
            }
            for cost in &self.timepoint_costs {
                let annual_real = timescales
                    .timepoints_in_period(period.label)
                    .iter()
                    .filter_map(|id| timescales.timepoint(id))
                    .map(|tp| cost.value(solution, &tp.id) * tp.weight_in_year)
                    .sum();
                items.push(ItemisedCost {
                    period: period.label,
                    component: cost.name.clone(),
                    annual_real,
                    annual_npv: annual_real * factor,
                });
            }
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_parameters, timescales};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_duplicate_component() {
        let mut registry = CostRegistry::new();
        registry.add_period_cost("Fixed", IndexMap::new()).unwrap();
        assert_error!(
            registry.add_timepoint_cost("Fixed", IndexMap::new()),
            "Cost component Fixed is already registered"
        );
    }

    #[rstest]
    fn test_discount_factors(mut model_parameters: ModelParameters, timescales: Timescales) {
        model_parameters.discount_rate = Dimensionless(0.0);
        let factors = discount_factors(&model_parameters, &timescales).unwrap();

        // Without discounting, each year of the ten-year period counts once
        assert_approx_eq!(f64, factors[&2030].value(), 10.0);
    }

    #[rstest]
    fn test_discount_factors_far_from_base_year(
        mut model_parameters: ModelParameters,
        timescales: Timescales,
    ) {
        model_parameters.base_financial_year = u32::MAX;
        assert_error!(
            discount_factors(&model_parameters, &timescales),
            "Period 2030 starts too far from the base financial year"
        );
    }

    #[rstest]
    fn test_seal_objective(mut model_parameters: ModelParameters, timescales: Timescales) {
        model_parameters.discount_rate = Dimensionless(0.0);
        let mut program = Program::new();
        let capacity = program.add_continuous(0.0..);
        let dispatch = program.add_continuous(0.0..);
        let tp = timescales.iter_timepoints().next().unwrap();

        let mut registry = CostRegistry::new();
        registry
            .add_period_cost("Fixed", [(2030, capacity * 2.0)].into_iter().collect())
            .unwrap();
        registry
            .add_timepoint_cost("Fuel", [(tp.id.clone(), dispatch * 3.0)].into_iter().collect())
            .unwrap();
        let ledger = registry
            .seal(&mut program, &model_parameters, &timescales)
            .unwrap();

        assert_approx_eq!(f64, program.columns()[0].cost, 2.0 * 10.0);
        assert_approx_eq!(
            f64,
            program.columns()[1].cost,
            3.0 * 10.0 * tp.weight_in_year
        );
        assert_approx_eq!(f64, ledger.discount_factor(2030).value(), 10.0);
    }
}
