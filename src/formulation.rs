//! Assembly of the capacity expansion program from a model.
//!
//! Components are added in a fixed order. Each one may register terms with the zonal energy
//! balance and cost components with the cost ledger. The balance constraints and the objective
//! are only emitted once every component has been added.
use crate::model::Model;
use crate::optimisation::{LinearExpr, Program};
use anyhow::Result;
use log::{debug, info};

pub mod balance;
use balance::{BalanceRegistry, EnergyBalance, ZoneTimepointMap};
pub mod build;
use build::{GenerationBuilds, add_generation_builds};
pub mod costs;
use costs::{CostLedger, CostRegistry};
pub mod curtailment;
use curtailment::{CurtailmentMap, add_curtailment_limits};
pub mod dispatch;
use dispatch::{GeneratorDispatch, add_generator_dispatch};
pub mod storage;
use storage::{StorageOperation, add_storage_operation};
pub mod transmission;
use transmission::{TransmissionDispatch, add_transmission_dispatch};

/// Withdrawal of energy to meet demand
pub const ZONE_DEMAND: &str = "zone_demand_mw";

/// The complete program with handles to its variables and constraints
#[derive(Debug, Clone, PartialEq)]
pub struct Formulation {
    /// The program to solve
    pub program: Program,
    /// Generation capacity
    pub builds: GenerationBuilds,
    /// Generation dispatch
    pub dispatch: GeneratorDispatch,
    /// Storage energy capacity and operation
    pub storage: StorageOperation,
    /// Transmission capacity and dispatch
    pub transmission: TransmissionDispatch,
    /// Generation of energy sources with curtailment limits
    pub curtailment: CurtailmentMap,
    /// The zonal energy balance
    pub balance: EnergyBalance,
    /// The cost components of the objective
    pub costs: CostLedger,
}

/// Demand in every zone and timepoint, as constant terms
fn zone_demand(model: &Model) -> ZoneTimepointMap {
    let mut demand = ZoneTimepointMap::new();
    for zone in model.load_zones.values() {
        for timepoint in model.timescales.iter_timepoints() {
            let expr = LinearExpr::constant(zone.demand(&timepoint.id).value());
            demand.insert((zone.id.clone(), timepoint.id.clone()), expr);
        }
    }

    demand
}

/// Build the program for a model.
///
/// Construction is deterministic: the same model always yields the same program.
pub fn build_formulation(model: &Model) -> Result<Formulation> {
    let mut program = Program::new();
    let mut balance = BalanceRegistry::new();
    let mut costs = CostRegistry::new();

    balance.register_withdrawal(ZONE_DEMAND, zone_demand(model))?;
    let builds = add_generation_builds(&mut program, model, &mut costs)?;
    let dispatch = add_generator_dispatch(&mut program, model, &builds, &mut balance, &mut costs)?;
    let storage = add_storage_operation(
        &mut program,
        model,
        &builds,
        &dispatch,
        &mut balance,
        &mut costs,
    )?;
    let transmission = add_transmission_dispatch(&mut program, model, &mut balance, &mut costs)?;
    let curtailment = add_curtailment_limits(&mut program, model, &dispatch);

    debug!("Adding energy balance constraints");
    let balance = balance.seal(&mut program, &model.load_zones, &model.timescales);
    let costs = costs.seal(&mut program, &model.parameters, &model.timescales)?;

    info!(
        "Formulated program with {} variables and {} constraints",
        program.num_cols(),
        program.num_rows()
    );

    Ok(Formulation {
        program,
        builds,
        dispatch,
        storage,
        transmission,
        curtailment,
        balance,
        costs,
    })
}
