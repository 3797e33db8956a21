//! Operation of storage projects: energy capacity, charging and state of charge.
//!
//! Discharge of a storage project is its ordinary dispatch, so only charging is registered with
//! the energy balance here. State of charge evolves within each timeseries, wrapping around from
//! the last timepoint to the first, with stored energy decaying continuously at the project's
//! self-discharge rate.
use super::balance::{BalanceRegistry, ZoneTimepointMap};
use super::build::GenerationBuilds;
use super::costs::CostRegistry;
use super::dispatch::GeneratorDispatch;
use crate::model::Model;
use crate::optimisation::{LinearExpr, Program, Variable};
use crate::project::ProjectID;
use crate::timescale::TimepointID;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Withdrawal of energy for charging storage
pub const STORAGE_NET_CHARGE: &str = "StorageNetCharge";

/// Annual fixed costs of storage energy capacity
pub const STORAGE_ENERGY_FIXED_COST: &str = "StorageEnergyFixedCost";

/// Fraction of stored energy remaining after `hours`, given the fraction retained after a day
pub fn decay(daily_retention: f64, hours: f64) -> f64 {
    daily_retention.powf(hours / 24.0)
}

/// Energy stored by the end of a timepoint of `hours` per unit of constant net inflow.
///
/// This integrates the inflow over the timepoint while it decays continuously, which reduces to
/// the duration itself when nothing is lost to self-discharge.
pub fn energy_conversion(daily_retention: f64, hours: f64) -> f64 {
    if (daily_retention - 1.0).abs() < f64::EPSILON {
        hours
    } else {
        24.0 * (decay(daily_retention, hours) - 1.0) / daily_retention.ln()
    }
}

/// Decision variables and expressions for storage projects
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOperation {
    /// Energy capacity built, keyed by project and build year
    pub energy_builds: IndexMap<(ProjectID, u32), Variable>,
    /// Charging power, keyed by project and timepoint
    pub charge: IndexMap<(ProjectID, TimepointID), Variable>,
    /// Energy stored at the end of each timepoint, keyed by project and timepoint
    pub state_of_charge: IndexMap<(ProjectID, TimepointID), Variable>,
    energy_capacity: IndexMap<(ProjectID, u32), LinearExpr>,
}

impl StorageOperation {
    /// Energy capacity of a project online in a period
    pub fn energy_capacity(&self, project: &ProjectID, period: u32) -> Option<&LinearExpr> {
        self.energy_capacity.get(&(project.clone(), period))
    }
}

/// Add energy capacity, charging and state of charge of storage projects.
///
/// Registers charging as a withdrawal and the fixed costs of energy capacity as a per-period
/// cost.
pub fn add_storage_operation(
    program: &mut Program,
    model: &Model,
    builds: &GenerationBuilds,
    dispatch: &GeneratorDispatch,
    balance: &mut BalanceRegistry,
    costs: &mut CostRegistry,
) -> Result<StorageOperation> {
    let timescales = &model.timescales;
    let interest_rate = model.parameters.interest_rate;

    let mut energy_builds = IndexMap::new();
    for project in model.iter_storage_projects() {
        let Some(storage) = project.storage else {
            continue;
        };

        for vintage in project.vintages.values() {
            let key = (project.id.clone(), vintage.build_year);
            let pinned = vintage
                .predetermined
                .and_then(|build| build.storage_energy);
            let var = match pinned {
                Some(energy) => program.add_continuous(energy.value()..=energy.value()),
                None => program.add_continuous(0.0..),
            };
            if let Some(ratio) = storage.energy_to_power_ratio {
                let build_gen = builds
                    .build_gen
                    .get(&key)
                    .with_context(|| format!("No build for project {} in {}", key.0, key.1))?;
                program.add_equality(LinearExpr::from(var), *build_gen * ratio);
            }
            energy_builds.insert(key, var);
        }
    }

    let mut energy_capacity = IndexMap::new();
    let mut fixed_costs: IndexMap<u32, LinearExpr> = timescales
        .iter_periods()
        .map(|period| (period.label, LinearExpr::new()))
        .collect();
    for project in model.iter_storage_projects() {
        for period in timescales.iter_periods() {
            let mut capacity = LinearExpr::new();
            for vintage in project.vintages.values() {
                if !project.can_operate_in_period(vintage.build_year, period, timescales) {
                    continue;
                }

                let var = energy_builds[&(project.id.clone(), vintage.build_year)];
                capacity.add_term(var, 1.0);
                fixed_costs[&period.label].add_term(
                    var,
                    project
                        .annual_storage_energy_cost(vintage, interest_rate)
                        .value(),
                );
            }
            energy_capacity.insert((project.id.clone(), period.label), capacity);
        }
    }

    // Charging and state of charge follow the timepoints in which the project can discharge
    let mut charge = IndexMap::new();
    let mut state_of_charge = IndexMap::new();
    let mut net_charge = ZoneTimepointMap::new();
    for project in model.iter_storage_projects() {
        let Some(storage) = project.storage else {
            continue;
        };

        for timepoint in timescales.iter_timepoints() {
            if dispatch.get(&project.id, &timepoint.id).is_none() {
                continue;
            }

            let key = (project.id.clone(), timepoint.id.clone());
            charge.insert(key.clone(), program.add_continuous(0.0..));
            state_of_charge.insert(key, program.add_continuous(0.0..));
        }

        for timepoint in timescales.iter_timepoints() {
            let key = (project.id.clone(), timepoint.id.clone());
            let (Some(charge_var), Some(discharge), Some(limit)) = (
                charge.get(&key).copied(),
                dispatch.get(&project.id, &timepoint.id),
                dispatch.upper_limit(&project.id, &timepoint.id),
            ) else {
                continue;
            };
            let soc = state_of_charge[&key];
            let previous = state_of_charge[&(project.id.clone(), timepoint.previous.clone())];
            let capacity = &energy_capacity[&(project.id.clone(), timepoint.period)];

            // Charging is limited by the power capacity available for discharge
            program.add_less_equal(
                LinearExpr::from(charge_var),
                limit.scaled(storage.store_to_release_ratio.value()),
            );

            // State of charge carries over from the previous timepoint in the timeseries
            let hours = timepoint.duration.value();
            let retention = storage.daily_retention();
            let mut flow = charge_var * storage.efficiency.value();
            flow.add_term(discharge, -1.0 / storage.discharge_efficiency.value());
            let rhs = previous * decay(retention, hours) + flow * energy_conversion(retention, hours);
            program.add_equality(LinearExpr::from(soc), rhs);

            program.add_less_equal(LinearExpr::from(soc), capacity.clone());
            if storage.min_soc.value() > 0.0 {
                program.add_greater_equal(
                    LinearExpr::from(soc),
                    capacity.scaled(storage.min_soc.value()),
                );
            }

            net_charge
                .entry((project.load_zone.clone(), timepoint.id.clone()))
                .or_default()
                .add_term(charge_var, 1.0);
        }

        // Discharged energy is limited by the number of full cycles allowed in a period
        if let Some(max_cycles) = storage.max_cycles_per_year {
            for period in timescales.iter_periods() {
                let discharged: LinearExpr = timescales
                    .timepoints_in_period(period.label)
                    .iter()
                    .filter_map(|id| {
                        let tp = timescales.timepoint(id)?;
                        let var = dispatch.get(&project.id, id)?;
                        Some((var, tp.duration.value()))
                    })
                    .collect();
                if discharged.is_constant() {
                    continue;
                }

                let capacity = &energy_capacity[&(project.id.clone(), period.label)];
                program.add_less_equal(
                    discharged,
                    capacity.scaled(max_cycles * period.length_years() as f64),
                );
            }
        }
    }

    balance.register_withdrawal(STORAGE_NET_CHARGE, net_charge)?;
    costs.add_period_cost(STORAGE_ENERGY_FIXED_COST, fixed_costs)?;

    Ok(StorageOperation {
        energy_builds,
        charge,
        state_of_charge,
        energy_capacity,
    })
}
