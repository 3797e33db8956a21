//! Dispatch of generation projects in each timepoint.
use super::balance::{BalanceRegistry, ZoneTimepointMap};
use super::build::GenerationBuilds;
use super::costs::CostRegistry;
use crate::model::Model;
use crate::optimisation::{LinearExpr, Program, Variable};
use crate::project::ProjectID;
use crate::timescale::TimepointID;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Injection of centrally connected generation, net of the energy used for carbon capture
pub const ZONE_TOTAL_CENTRAL_DISPATCH: &str = "ZoneTotalCentralDispatch";

/// Injection of distributed generation
pub const ZONE_TOTAL_DISTRIBUTED_DISPATCH: &str = "ZoneTotalDistributedDispatch";

/// Hourly variable O&M costs
pub const GEN_VARIABLE_OM_COSTS: &str = "GenVariableOMCostsInTP";

/// Hourly fuel costs
pub const FUEL_COSTS: &str = "FuelCostsPerTP";

/// Dispatch decisions of generation projects
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorDispatch {
    /// Power output, keyed by project and timepoint
    pub dispatch: IndexMap<(ProjectID, TimepointID), Variable>,
    upper_limits: IndexMap<(ProjectID, TimepointID), LinearExpr>,
}

impl GeneratorDispatch {
    /// The dispatch variable of a project in a timepoint, if the project can operate then
    pub fn get(&self, project: &ProjectID, timepoint: &TimepointID) -> Option<Variable> {
        self.dispatch
            .get(&(project.clone(), timepoint.clone()))
            .copied()
    }

    /// Maximum output of a project in a timepoint: available capacity times capacity factor
    pub fn upper_limit(&self, project: &ProjectID, timepoint: &TimepointID) -> Option<&LinearExpr> {
        self.upper_limits.get(&(project.clone(), timepoint.clone()))
    }
}

/// Add dispatch decisions for every project in every timepoint in which it has capacity.
///
/// Dispatch is bounded by the dispatch upper limit. Baseload projects must run at exactly their
/// upper limit. Registers the zonal dispatch injections along with variable O&M and fuel costs.
pub fn add_generator_dispatch(
    program: &mut Program,
    model: &Model,
    builds: &GenerationBuilds,
    balance: &mut BalanceRegistry,
    costs: &mut CostRegistry,
) -> Result<GeneratorDispatch> {
    let timescales = &model.timescales;

    let mut dispatch = IndexMap::new();
    let mut upper_limits = IndexMap::new();
    let mut central = ZoneTimepointMap::new();
    let mut distributed = ZoneTimepointMap::new();
    let mut variable_om: IndexMap<TimepointID, LinearExpr> = IndexMap::new();
    let mut fuel: IndexMap<TimepointID, LinearExpr> = IndexMap::new();
    for project in model.projects.values() {
        let availability = project.availability().value();
        for period in timescales.iter_periods() {
            let Some(capacity) = builds
                .capacity(&project.id, period.label)
                .filter(|_| builds.has_capacity(&project.id, period.label))
            else {
                continue;
            };

            let fuel_cost = project
                .full_load_heat_rate
                .map(|heat_rate| {
                    model
                        .fuel_costs
                        .get(&project.load_zone, &project.energy_source, period.label)
                        .map(|cost| heat_rate.value() * cost.value())
                        .with_context(|| {
                            format!(
                                "No cost for fuel {} in zone {} in period {}",
                                project.energy_source, project.load_zone, period.label
                            )
                        })
                })
                .transpose()?;

            for timepoint in timescales.timepoints_in_period(period.label) {
                let var = program.add_continuous(0.0..);
                let factor = availability * project.capacity_factor(timepoint).value();
                let limit = capacity.scaled(factor);
                if project.is_baseload {
                    program.add_equality(LinearExpr::from(var), limit.clone());
                } else {
                    program.add_less_equal(LinearExpr::from(var), limit.clone());
                }

                let key = (project.load_zone.clone(), timepoint.clone());
                if project.is_distributed {
                    distributed.entry(key).or_default().add_term(var, 1.0);
                } else {
                    let ccs_load = project.ccs.map_or(0.0, |ccs| ccs.energy_load.value());
                    central
                        .entry(key)
                        .or_default()
                        .add_term(var, 1.0 - ccs_load);
                }

                variable_om
                    .entry(timepoint.clone())
                    .or_default()
                    .add_term(var, project.variable_om.value());
                if let Some(fuel_cost) = fuel_cost {
                    fuel.entry(timepoint.clone())
                        .or_default()
                        .add_term(var, fuel_cost);
                }

                let key = (project.id.clone(), timepoint.clone());
                dispatch.insert(key.clone(), var);
                upper_limits.insert(key, limit);
            }
        }
    }

    balance.register_injection(ZONE_TOTAL_CENTRAL_DISPATCH, central)?;
    balance.register_injection(ZONE_TOTAL_DISTRIBUTED_DISPATCH, distributed)?;
    costs.add_timepoint_cost(GEN_VARIABLE_OM_COSTS, variable_om)?;
    costs.add_timepoint_cost(FUEL_COSTS, fuel)?;

    Ok(GeneratorDispatch {
        dispatch,
        upper_limits,
    })
}
