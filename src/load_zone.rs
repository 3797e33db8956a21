//! Load zones: the nodes of the transmission network at which energy must balance.
use crate::id::{define_id_getter, define_id_type};
use crate::timescale::{TimepointID, Timescales};
use crate::units::{Energy, Power};
use indexmap::IndexMap;

define_id_type! {LoadZoneID}

/// A map of [`LoadZone`]s, keyed by zone ID
pub type LoadZoneMap = IndexMap<LoadZoneID, LoadZone>;

/// A node of the transmission network with its own demand
#[derive(Debug, Clone, PartialEq)]
pub struct LoadZone {
    /// Unique identifier for the zone
    pub id: LoadZoneID,
    /// Distance to the nearest CO2 sequestration site, in km
    pub ccs_distance_km: f64,
    /// External identifier used when exporting results
    pub dbid: String,
    /// Demand in each timepoint
    pub demand: IndexMap<TimepointID, Power>,
    /// Expected coincident peak demand in each period, where known
    pub coincident_peak_demand: IndexMap<u32, Power>,
}
define_id_getter! {LoadZone, LoadZoneID}

impl LoadZone {
    /// Demand in the given timepoint (zero if not specified)
    pub fn demand(&self, timepoint: &TimepointID) -> Power {
        self.demand.get(timepoint).copied().unwrap_or_default()
    }

    /// Total energy demand over the whole of a period
    pub fn total_demand_in_period(&self, timescales: &Timescales, period: u32) -> Energy {
        timescales
            .timepoints_in_period(period)
            .iter()
            .map(|id| {
                let weight = timescales.timepoint(id).map_or(0.0, |tp| tp.weight);
                Energy(self.demand(id).value() * weight)
            })
            .fold(Energy(0.0), |acc, e| acc + e)
    }
}
