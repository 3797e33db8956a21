//! The energy balance of each load zone.
//!
//! Components of the formulation register named injection and withdrawal terms with a
//! [`BalanceRegistry`] as they are added. Once every component has been added, the registry is
//! sealed, which emits one balance constraint per zone and timepoint. Sealing consumes the
//! registry, so no term can be registered after the constraints exist.
use crate::load_zone::{LoadZoneID, LoadZoneMap};
use crate::optimisation::{ConstraintKeys, LinearExpr, Program, Solution};
use crate::timescale::{TimepointID, Timescales};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::debug;

/// Values of a balance term, keyed by zone and timepoint.
///
/// Zones and timepoints without an entry contribute nothing.
pub type ZoneTimepointMap = IndexMap<(LoadZoneID, TimepointID), LinearExpr>;

/// A named term of the zonal energy balance
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceTerm {
    /// Name of the term, used as a column header in results
    pub name: String,
    values: ZoneTimepointMap,
}

impl BalanceTerm {
    /// The expression for this term in a zone and timepoint
    pub fn get(&self, zone: &LoadZoneID, timepoint: &TimepointID) -> Option<&LinearExpr> {
        self.values.get(&(zone.clone(), timepoint.clone()))
    }

    /// The value of this term in a zone and timepoint of a solution
    pub fn value(&self, solution: &Solution, zone: &LoadZoneID, timepoint: &TimepointID) -> f64 {
        self.get(zone, timepoint)
            .map_or(0.0, |expr| solution.evaluate(expr))
    }
}

/// Collects injection and withdrawal terms until the balance constraints are emitted
#[derive(Debug, Default)]
pub struct BalanceRegistry {
    injections: Vec<BalanceTerm>,
    withdrawals: Vec<BalanceTerm>,
}

impl BalanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(&self, name: &str) -> Result<()> {
        ensure!(
            !self
                .injections
                .iter()
                .chain(self.withdrawals.iter())
                .any(|term| term.name == name),
            "Balance term {name} is already registered"
        );

        Ok(())
    }

    /// Register a term supplying energy to zones
    pub fn register_injection(&mut self, name: &str, values: ZoneTimepointMap) -> Result<()> {
        self.check_name(name)?;
        debug!("Registering injection {name}");
        self.injections.push(BalanceTerm {
            name: name.to_string(),
            values,
        });

        Ok(())
    }

    /// Register a term drawing energy from zones
    pub fn register_withdrawal(&mut self, name: &str, values: ZoneTimepointMap) -> Result<()> {
        self.check_name(name)?;
        debug!("Registering withdrawal {name}");
        self.withdrawals.push(BalanceTerm {
            name: name.to_string(),
            values,
        });

        Ok(())
    }

    /// Emit `Σ injections == Σ withdrawals` for every zone and timepoint.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to add the constraints to
    /// * `load_zones` - All load zones of the model
    /// * `timescales` - The temporal index of the model
    pub fn seal(
        self,
        program: &mut Program,
        load_zones: &LoadZoneMap,
        timescales: &Timescales,
    ) -> EnergyBalance {
        let mut keys = ConstraintKeys::new(program);
        for zone in load_zones.keys() {
            for timepoint in timescales.iter_timepoints() {
                let key = (zone.clone(), timepoint.id.clone());
                let mut expr = LinearExpr::new();
                for term in &self.injections {
                    if let Some(value) = term.values.get(&key) {
                        expr += value;
                    }
                }
                for term in &self.withdrawals {
                    if let Some(value) = term.values.get(&key) {
                        expr -= value;
                    }
                }
                keys.add(program, key, expr, 0.0..=0.0);
            }
        }

        EnergyBalance {
            injections: self.injections,
            withdrawals: self.withdrawals,
            keys,
        }
    }
}

/// The sealed zonal energy balance
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBalance {
    injections: Vec<BalanceTerm>,
    withdrawals: Vec<BalanceTerm>,
    keys: ConstraintKeys<(LoadZoneID, TimepointID)>,
}

impl EnergyBalance {
    /// Injection terms, in registration order
    pub fn injections(&self) -> &[BalanceTerm] {
        &self.injections
    }

    /// Withdrawal terms, in registration order
    pub fn withdrawals(&self) -> &[BalanceTerm] {
        &self.withdrawals
    }

    /// Keys of the balance constraints
    pub fn keys(&self) -> &ConstraintKeys<(LoadZoneID, TimepointID)> {
        &self.keys
    }
}
