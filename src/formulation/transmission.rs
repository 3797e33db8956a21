//! Transmission capacity and the flow of power between load zones.
use super::balance::{BalanceRegistry, ZoneTimepointMap};
use super::costs::CostRegistry;
use crate::model::Model;
use crate::optimisation::{ConstraintKeys, LinearExpr, Program, Variable};
use crate::timescale::TimepointID;
use crate::transmission::{Corridor, TransmissionLineID};
use anyhow::Result;
use indexmap::IndexMap;

/// Net injection of power received from other zones
pub const TX_POWER_NET: &str = "TXPowerNet";

/// Annual capital and fixed O&M costs of transmission capacity
pub const TX_FIXED_COSTS: &str = "TxFixedCosts";

/// Decision variables and expressions for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionDispatch {
    /// New capacity built, keyed by line and period
    pub builds: IndexMap<(TransmissionLineID, u32), Variable>,
    /// Power sent along each corridor in each timepoint
    pub dispatch: IndexMap<(Corridor, TimepointID), Variable>,
    nameplate: IndexMap<(TransmissionLineID, u32), LinearExpr>,
    available: IndexMap<(TransmissionLineID, u32), LinearExpr>,
    limit_keys: ConstraintKeys<(Corridor, TimepointID)>,
}

impl TransmissionDispatch {
    /// Nameplate capacity of a line in a period
    pub fn nameplate(&self, line: &TransmissionLineID, period: u32) -> Option<&LinearExpr> {
        self.nameplate.get(&(line.clone(), period))
    }

    /// Capacity of a line usable for dispatch in a period
    pub fn available(&self, line: &TransmissionLineID, period: u32) -> Option<&LinearExpr> {
        self.available.get(&(line.clone(), period))
    }

    /// Keys of the rows limiting dispatch to available capacity
    pub fn limit_keys(&self) -> &ConstraintKeys<(Corridor, TimepointID)> {
        &self.limit_keys
    }
}

/// Add transmission builds and dispatch.
///
/// Capacity accumulates across periods: a line's nameplate capacity in a period is its existing
/// capacity plus everything built in that period and earlier. Registers the net power received
/// by each zone as an injection and the fixed costs of all capacity as a per-period cost.
pub fn add_transmission_dispatch(
    program: &mut Program,
    model: &Model,
    balance: &mut BalanceRegistry,
    costs: &mut CostRegistry,
) -> Result<TransmissionDispatch> {
    let timescales = &model.timescales;

    let mut builds = IndexMap::new();
    let mut nameplate = IndexMap::new();
    let mut available = IndexMap::new();
    let mut fixed_costs: IndexMap<u32, LinearExpr> = timescales
        .iter_periods()
        .map(|period| (period.label, LinearExpr::new()))
        .collect();
    for line in model.transmission_lines.values() {
        let annual_cost = line.annual_cost_per_mw(&model.parameters).value();
        let mut capacity = LinearExpr::constant(line.existing_capacity.value());
        for period in timescales.iter_periods() {
            if line.new_build_allowed {
                let build = program.add_continuous(0.0..);
                builds.insert((line.id.clone(), period.label), build);
                capacity.add_term(build, 1.0);
            }

            fixed_costs[&period.label].add_expr(&capacity, annual_cost);
            let key = (line.id.clone(), period.label);
            available.insert(key.clone(), capacity.scaled(line.derating_factor.value()));
            nameplate.insert(key, capacity.clone());
        }
    }

    let mut dispatch = IndexMap::new();
    let mut net_power = ZoneTimepointMap::new();
    for line in model.transmission_lines.values() {
        for corridor in line.corridors() {
            for timepoint in timescales.iter_timepoints() {
                let var = program.add_continuous(0.0..);
                net_power
                    .entry((corridor.to.clone(), timepoint.id.clone()))
                    .or_default()
                    .add_term(var, line.efficiency.value());
                net_power
                    .entry((corridor.from.clone(), timepoint.id.clone()))
                    .or_default()
                    .add_term(var, -1.0);
                dispatch.insert((corridor.clone(), timepoint.id.clone()), var);
            }
        }
    }

    // Rows of a block must be contiguous, so these are added after all variables
    let mut limit_keys = ConstraintKeys::new(program);
    for line in model.transmission_lines.values() {
        for corridor in line.corridors() {
            for timepoint in timescales.iter_timepoints() {
                let key = (corridor.clone(), timepoint.id.clone());
                let limit = &available[&(line.id.clone(), timepoint.period)];
                let expr = LinearExpr::from(dispatch[&key]) - limit.clone();
                limit_keys.add(program, key, expr, ..=0.0);
            }
        }
    }

    balance.register_injection(TX_POWER_NET, net_power)?;
    costs.add_period_cost(TX_FIXED_COSTS, fixed_costs)?;

    Ok(TransmissionDispatch {
        builds,
        dispatch,
        nameplate,
        available,
        limit_keys,
    })
}
