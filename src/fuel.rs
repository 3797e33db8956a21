//! Fuel prices for fuel-based generation projects.
use crate::load_zone::LoadZoneID;
use crate::project::EnergySourceID;
use crate::units::MoneyPerFuel;
use indexmap::IndexMap;

/// Fuel prices, keyed by load zone, fuel and period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelCostMap(IndexMap<(LoadZoneID, EnergySourceID, u32), MoneyPerFuel>);

impl FuelCostMap {
    /// Create a new, empty `FuelCostMap`
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fuel price, returning the previous price, if any
    pub fn insert(
        &mut self,
        zone: LoadZoneID,
        fuel: EnergySourceID,
        period: u32,
        cost: MoneyPerFuel,
    ) -> Option<MoneyPerFuel> {
        self.0.insert((zone, fuel, period), cost)
    }

    /// The price of a fuel in a zone in a period
    pub fn get(&self, zone: &LoadZoneID, fuel: &EnergySourceID, period: u32) -> Option<MoneyPerFuel> {
        self.0
            .get(&(zone.clone(), fuel.clone(), period))
            .copied()
    }

    /// Whether there are no fuel prices
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
