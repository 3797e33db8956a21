//! Fixtures for tests
use crate::fuel::FuelCostMap;
use crate::load_zone::{LoadZone, LoadZoneMap};
use crate::model::{Model, ModelParameters};
use crate::project::{BuildKind, BuildVintage, GenerationProject, StorageParameters};
use crate::timescale::{Period, TimepointDefinition, Timescales, Timeseries};
use crate::transmission::TransmissionLine;
use crate::units::{
    Dimensionless, FuelPerEnergy, Hours, MoneyPerEnergy, MoneyPerFuel, MoneyPerPower,
    MoneyPerPowerPerYear, Power,
};
use indexmap::{IndexMap, indexmap};
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        base_financial_year: 2025,
        interest_rate: Dimensionless(0.05),
        discount_rate: Dimensionless(0.05),
        max_capacity_for_binary_constraints: Power(1e5),
        trans_capital_cost_per_mw_km: 1000.0,
        trans_lifetime_yrs: 20,
        trans_fixed_om_fraction: Dimensionless(0.03),
        mip_rel_gap: None,
    }
}

/// A single ten-year period sampled by one day of four six-hour timepoints
#[fixture]
pub fn timescales() -> Timescales {
    Timescales::new(
        vec![Period {
            label: 2030,
            start: 2025,
            end: 2034,
        }],
        vec![Timeseries {
            id: "day".into(),
            period: 2030,
            duration_of_tp: Hours(6.0),
            num_tps: 4,
            scale_to_period: 3652.5,
        }],
        (1..=4)
            .map(|i| TimepointDefinition {
                id: format!("t{i}").into(),
                timestamp: format!("2030010{i}"),
                timeseries: "day".into(),
            })
            .collect(),
    )
    .unwrap()
}

#[fixture]
pub fn load_zones(timescales: Timescales) -> LoadZoneMap {
    let zone = LoadZone {
        id: "north".into(),
        ccs_distance_km: 0.0,
        dbid: "north".into(),
        demand: timescales
            .iter_timepoints()
            .map(|tp| (tp.id.clone(), Power(80.0)))
            .collect(),
        coincident_peak_demand: IndexMap::new(),
    };
    indexmap! { zone.id.clone() => zone }
}

fn new_build(build_year: u32, storage_cost: Option<f64>) -> BuildVintage {
    BuildVintage {
        build_year,
        predetermined: None,
        overnight_cost: MoneyPerPower(1000.0),
        fixed_om: MoneyPerPowerPerYear(10.0),
        storage_energy_overnight_cost: storage_cost.map(MoneyPerEnergy),
    }
}

fn base_project() -> GenerationProject {
    GenerationProject {
        id: "gas".into(),
        dbid: "gas".into(),
        technology: "CCGT".into(),
        energy_source: "Gas".into(),
        load_zone: "north".into(),
        max_age: 20,
        retirement_year: None,
        is_variable: false,
        is_baseload: false,
        is_cogen: false,
        is_distributed: false,
        scheduled_outage_rate: Dimensionless(0.0),
        forced_outage_rate: Dimensionless(0.0),
        full_load_heat_rate: Some(FuelPerEnergy(7.0)),
        variable_om: MoneyPerEnergy(2.0),
        connect_cost_per_mw: MoneyPerPower(100.0),
        capacity_limit: None,
        build_kind: BuildKind::Continuous,
        ccs: None,
        storage: None,
        vintages: indexmap! { 2030 => new_build(2030, None) },
        capacity_factors: IndexMap::new(),
    }
}

#[fixture]
pub fn gas_project() -> GenerationProject {
    base_project()
}

#[fixture]
pub fn solar_project(timescales: Timescales) -> GenerationProject {
    let factors = [0.0, 0.6, 0.8, 0.2];
    GenerationProject {
        id: "solar".into(),
        dbid: "solar".into(),
        technology: "PV".into(),
        energy_source: "Solar".into(),
        is_variable: true,
        full_load_heat_rate: None,
        variable_om: MoneyPerEnergy(0.0),
        capacity_factors: timescales
            .iter_timepoints()
            .zip(factors)
            .map(|(tp, factor)| (tp.id.clone(), Dimensionless(factor)))
            .collect(),
        ..base_project()
    }
}

#[fixture]
pub fn battery_project() -> GenerationProject {
    GenerationProject {
        id: "battery".into(),
        dbid: "battery".into(),
        technology: "Battery".into(),
        energy_source: "Electricity".into(),
        max_age: 10,
        full_load_heat_rate: None,
        variable_om: MoneyPerEnergy(0.0),
        storage: Some(StorageParameters {
            efficiency: Dimensionless(0.85),
            ..Default::default()
        }),
        vintages: indexmap! { 2030 => new_build(2030, Some(200.0)) },
        ..base_project()
    }
}

#[fixture]
pub fn transmission_line() -> TransmissionLine {
    TransmissionLine {
        id: "north-south".into(),
        dbid: "north-south".into(),
        zone1: "north".into(),
        zone2: "south".into(),
        length_km: 100.0,
        efficiency: Dimensionless(0.95),
        existing_capacity: Power(0.0),
        derating_factor: Dimensionless(1.0),
        terrain_multiplier: 1.0,
        new_build_allowed: true,
    }
}

/// A single-zone model with one gas project
#[fixture]
pub fn model(
    model_parameters: ModelParameters,
    timescales: Timescales,
    load_zones: LoadZoneMap,
    gas_project: GenerationProject,
) -> Model {
    let mut fuel_costs = FuelCostMap::new();
    fuel_costs.insert("north".into(), "Gas".into(), 2030, MoneyPerFuel(4.0));

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters,
        timescales,
        load_zones,
        projects: indexmap! { gas_project.id.clone() => gas_project },
        transmission_lines: IndexMap::new(),
        fuel_costs,
        curtailment_limits: Vec::new(),
    }
}
