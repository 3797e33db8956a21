//! Transmission lines between load zones.
use crate::finance::capital_recovery_factor;
use crate::id::{define_id_getter, define_id_type};
use crate::load_zone::LoadZoneID;
use crate::model::ModelParameters;
use crate::units::{Dimensionless, MoneyPerPowerPerYear, Power};
use indexmap::IndexMap;

define_id_type! {TransmissionLineID}

/// A map of [`TransmissionLine`]s, keyed by line ID
pub type TransmissionLineMap = IndexMap<TransmissionLineID, TransmissionLine>;

/// An undirected transmission corridor between two load zones
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionLine {
    /// Unique identifier for the line
    pub id: TransmissionLineID,
    /// External identifier used when exporting results
    pub dbid: String,
    /// One end of the line
    pub zone1: LoadZoneID,
    /// The other end of the line
    pub zone2: LoadZoneID,
    /// Length of the line in km
    pub length_km: f64,
    /// Fraction of power sent which is received at the other end
    pub efficiency: Dimensionless,
    /// Capacity existing before the first period
    pub existing_capacity: Power,
    /// Fraction of nameplate capacity usable for dispatch
    pub derating_factor: Dimensionless,
    /// Cost multiplier for difficult terrain
    pub terrain_multiplier: f64,
    /// Whether the optimisation may add capacity
    pub new_build_allowed: bool,
}
define_id_getter! {TransmissionLine, TransmissionLineID}

/// A direction of flow along a transmission line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Corridor {
    /// The zone power is sent from
    pub from: LoadZoneID,
    /// The zone power is received at
    pub to: LoadZoneID,
    /// The underlying line
    pub line: TransmissionLineID,
}

impl TransmissionLine {
    /// The two directional corridors of this line
    pub fn corridors(&self) -> [Corridor; 2] {
        [
            Corridor {
                from: self.zone1.clone(),
                to: self.zone2.clone(),
                line: self.id.clone(),
            },
            Corridor {
                from: self.zone2.clone(),
                to: self.zone1.clone(),
                line: self.id.clone(),
            },
        ]
    }

    /// Annualised capital plus fixed O&M cost per MW of nameplate capacity
    pub fn annual_cost_per_mw(&self, parameters: &ModelParameters) -> MoneyPerPowerPerYear {
        let capital_cost =
            parameters.trans_capital_cost_per_mw_km * self.terrain_multiplier * self.length_km;
        let crf = capital_recovery_factor(parameters.trans_lifetime_yrs, parameters.interest_rate);
        MoneyPerPowerPerYear(capital_cost * (crf + parameters.trans_fixed_om_fraction).value())
    }
}
