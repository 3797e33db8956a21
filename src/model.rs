//! The model represents the static input data provided by the user.
use crate::curtailment::CurtailmentLimit;
use crate::fuel::FuelCostMap;
use crate::load_zone::LoadZoneMap;
use crate::project::{GenerationProject, ProjectMap};
use crate::timescale::Timescales;
use crate::transmission::TransmissionLineMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug, Clone)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Periods, timeseries and timepoints
    pub timescales: Timescales,
    /// Load zones and their demand
    pub load_zones: LoadZoneMap,
    /// Generation and storage projects
    pub projects: ProjectMap,
    /// Transmission lines between zones
    pub transmission_lines: TransmissionLineMap,
    /// Fuel prices by zone, fuel and period
    pub fuel_costs: FuelCostMap,
    /// Limits on curtailment of variable energy sources
    pub curtailment_limits: Vec<CurtailmentLimit>,
}

impl Model {
    /// Iterate over the storage projects
    pub fn iter_storage_projects(&self) -> impl Iterator<Item = &GenerationProject> {
        self.projects.values().filter(|project| project.is_storage())
    }
}
