//! The module responsible for writing output data to disk.
use crate::curtailment::curtailment_ratio;
use crate::formulation::Formulation;
use crate::load_zone::LoadZoneID;
use crate::model::Model;
use crate::optimisation::Solution;
use crate::project::{EnergySourceID, ProjectID, TechnologyID};
use crate::timescale::TimepointID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "expanse_results";

/// The output file name for the zonal energy balance in each timepoint
const LOAD_BALANCE_FILE_NAME: &str = "load_balance.csv";

/// The output file name for the annual energy balance of each zone
const LOAD_BALANCE_ANNUAL_ZONAL_FILE_NAME: &str = "load_balance_annual_zonal.csv";

/// The output file name for the annual energy balance of the whole system
const LOAD_BALANCE_ANNUAL_FILE_NAME: &str = "load_balance_annual.csv";

/// The output file name for generation capacity
const GEN_CAP_FILE_NAME: &str = "gen_cap.csv";

/// The output file name for demand in each zone and period
const ZONE_DEMAND_FILE_NAME: &str = "zone_demand.csv";

/// The output file name for storage builds
const STORAGE_BUILDS_FILE_NAME: &str = "storage_builds.csv";

/// The output file name for online storage capacity
const STORAGE_CAPACITY_FILE_NAME: &str = "storage_capacity.csv";

/// The output file name for storage operation
const STORAGE_DISPATCH_FILE_NAME: &str = "storage_dispatch.csv";

/// The output file name for transmission dispatch
const TRANSMISSION_DISPATCH_FILE_NAME: &str = "transmission_dispatch.csv";

/// The output file name for itemised costs
const COSTS_ITEMIZED_FILE_NAME: &str = "costs_itemized.csv";

/// The output file name for curtailment
const CURTAILMENT_FILE_NAME: &str = "curtailment.csv";

/// The output file name for the objective value
const TOTAL_COST_FILE_NAME: &str = "total_cost.txt";

/// The output file name for raw energy balance duals
const BALANCE_DUALS_FILE_NAME: &str = "debug_balance_duals.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, returning whether an existing one will be overwritten.
///
/// An existing directory that is not empty is only reused if `allow_overwrite` is set.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the generation capacity CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GenCapRow {
    #[serde(rename = "GENERATION_PROJECT")]
    generation_project: ProjectID,
    #[serde(rename = "PERIOD")]
    period: u32,
    gen_tech: TechnologyID,
    gen_load_zone: LoadZoneID,
    gen_energy_source: EnergySourceID,
    #[serde(rename = "GenCapacity")]
    capacity: f64,
    #[serde(rename = "GenCapitalCosts")]
    capital_costs: f64,
    #[serde(rename = "GenFixedOMCosts")]
    fixed_om_costs: f64,
    gen_is_cogen: bool,
}

/// Represents a row in the zone demand CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ZoneDemandRow {
    load_zone: LoadZoneID,
    #[serde(rename = "PERIOD")]
    period: u32,
    zone_total_demand_in_period_mwh: f64,
    zone_peak_demand_mw: f64,
    zone_expected_coincident_peak_demand: Option<f64>,
}

/// Represents a row in the storage builds CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageBuildRow {
    generation_project: ProjectID,
    build_year: u32,
    load_zone: LoadZoneID,
    #[serde(rename = "IncrementalPowerCapacityMW")]
    power_capacity: f64,
    #[serde(rename = "IncrementalEnergyCapacityMWh")]
    energy_capacity: f64,
}

/// Represents a row in the storage capacity CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageCapacityRow {
    generation_project: ProjectID,
    period: u32,
    load_zone: LoadZoneID,
    #[serde(rename = "OnlinePowerCapacityMW")]
    power_capacity: f64,
    #[serde(rename = "OnlineEnergyCapacityMWh")]
    energy_capacity: f64,
    #[serde(rename = "LandUse")]
    land_use: f64,
}

/// Represents a row in the storage dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageDispatchRow {
    generation_project: ProjectID,
    timepoint: TimepointID,
    load_zone: LoadZoneID,
    #[serde(rename = "ChargeMW")]
    charge: f64,
    #[serde(rename = "DischargeMW")]
    discharge: f64,
    #[serde(rename = "StateOfCharge")]
    state_of_charge: f64,
}

/// Represents a row in the transmission dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TransmissionDispatchRow {
    load_zone_from: LoadZoneID,
    load_zone_to: LoadZoneID,
    timestamp: String,
    transmission_dispatch: f64,
    dispatch_limit: f64,
    transmission_limit_dual: f64,
}

/// Represents a row in the itemised costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CostRow {
    #[serde(rename = "PERIOD")]
    period: u32,
    #[serde(rename = "Component")]
    component: String,
    #[serde(rename = "AnnualCost_NPV")]
    annual_npv: f64,
    #[serde(rename = "AnnualCost_Real")]
    annual_real: f64,
}

/// Represents a row in the curtailment CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CurtailmentRow {
    period: u32,
    energy_source: EnergySourceID,
    ideal_mwh: f64,
    actual_mwh: f64,
    curtailment_ratio: f64,
}

/// Represents a row in the raw balance duals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BalanceDualsRow {
    load_zone: LoadZoneID,
    timepoint: TimepointID,
    value: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    balance_duals_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(BALANCE_DUALS_FILE_NAME);
        Ok(Self {
            balance_duals_writer: csv::Writer::from_path(file_path)?,
        })
    }

    /// Write raw energy balance duals to file
    fn write_balance_duals<'a, I>(&mut self, iter: I) -> Result<()>
    where
        I: Iterator<Item = (&'a (LoadZoneID, TimepointID), f64)>,
    {
        for ((load_zone, timepoint), value) in iter {
            let row = BalanceDualsRow {
                load_zone: load_zone.clone(),
                timepoint: timepoint.clone(),
                value,
            };
            self.balance_duals_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.balance_duals_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a solved model to file
pub struct DataWriter {
    output_path: PathBuf,
    load_balance_writer: csv::Writer<File>,
    annual_zonal_writer: csv::Writer<File>,
    annual_writer: csv::Writer<File>,
    gen_cap_writer: csv::Writer<File>,
    zone_demand_writer: csv::Writer<File>,
    storage_builds_writer: csv::Writer<File>,
    storage_capacity_writer: csv::Writer<File>,
    storage_dispatch_writer: csv::Writer<File>,
    transmission_writer: csv::Writer<File>,
    costs_writer: csv::Writer<File>,
    curtailment_writer: Option<csv::Writer<File>>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `model` - The model whose results will be written
    /// * `write_duals` - Whether to include raw dual values in extra CSV files
    pub fn create(output_path: &Path, model: &Model, write_duals: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let curtailment_writer = if model.curtailment_limits.is_empty() {
            None
        } else {
            Some(new_writer(CURTAILMENT_FILE_NAME)?)
        };

        let debug_writer = if write_duals {
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            load_balance_writer: new_writer(LOAD_BALANCE_FILE_NAME)?,
            annual_zonal_writer: new_writer(LOAD_BALANCE_ANNUAL_ZONAL_FILE_NAME)?,
            annual_writer: new_writer(LOAD_BALANCE_ANNUAL_FILE_NAME)?,
            gen_cap_writer: new_writer(GEN_CAP_FILE_NAME)?,
            zone_demand_writer: new_writer(ZONE_DEMAND_FILE_NAME)?,
            storage_builds_writer: new_writer(STORAGE_BUILDS_FILE_NAME)?,
            storage_capacity_writer: new_writer(STORAGE_CAPACITY_FILE_NAME)?,
            storage_dispatch_writer: new_writer(STORAGE_DISPATCH_FILE_NAME)?,
            transmission_writer: new_writer(TRANSMISSION_DISPATCH_FILE_NAME)?,
            costs_writer: new_writer(COSTS_ITEMIZED_FILE_NAME)?,
            curtailment_writer,
            debug_writer,
        })
    }

    /// Write every output table for a solved model
    pub fn write_results(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        self.write_load_balance(model, formulation, solution)?;
        self.write_annual_balance(model, formulation, solution)?;
        self.write_generation_capacity(model, formulation, solution)?;
        self.write_zone_demand(model)?;
        self.write_storage(model, formulation, solution)?;
        self.write_transmission_dispatch(model, formulation, solution)?;
        self.write_costs(model, formulation, solution)?;
        self.write_curtailment(formulation, solution)?;
        self.write_total_cost(solution)?;
        if let Some(ref mut wtr) = self.debug_writer {
            let duals = formulation.balance.keys().zip_duals(solution.dual_rows());
            wtr.write_balance_duals(duals)?;
        }

        Ok(())
    }

    /// Write the zonal energy balance in every timepoint.
    ///
    /// Injections are written as they are and withdrawals negated, so each row sums to zero. The
    /// dual of the balance row is normalised to a price per MWh in the period it occurs in.
    fn write_load_balance(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        let balance = &formulation.balance;
        let mut header = vec![
            "load_zone".to_string(),
            "timestamp".to_string(),
            "normalized_energy_balance_duals_dollar_per_mwh".to_string(),
        ];
        header.extend(balance_term_names(formulation));
        self.load_balance_writer.write_record(&header)?;

        let duals: IndexMap<_, _> = balance.keys().zip_duals(solution.dual_rows()).collect();
        for ((zone, timepoint_id), dual) in duals {
            let Some(timepoint) = model.timescales.timepoint(timepoint_id) else {
                continue;
            };
            let scale = formulation.costs.discount_factor(timepoint.period).value()
                * timepoint.weight_in_year;
            let normalised = if scale > 0.0 { dual / scale } else { 0.0 };

            let mut record = vec![
                zone.to_string(),
                timepoint.timestamp.clone(),
                normalised.to_string(),
            ];
            record.extend(
                balance_term_values(formulation, solution, zone, timepoint_id)
                    .map(|value| value.to_string()),
            );
            self.load_balance_writer.write_record(&record)?;
        }

        Ok(())
    }

    /// Write every balance term summed over the timepoints of each period, per zone and overall
    fn write_annual_balance(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        let names = balance_term_names(formulation).collect_vec();
        let mut header = vec!["PERIOD".to_string(), "load_zone".to_string()];
        header.extend(names.iter().cloned());
        self.annual_zonal_writer.write_record(&header)?;
        let mut header = vec!["PERIOD".to_string()];
        header.extend(names.iter().cloned());
        self.annual_writer.write_record(&header)?;

        let timescales = &model.timescales;
        for period in timescales.iter_periods() {
            let mut system_totals = vec![0.0; names.len()];
            for zone in model.load_zones.keys() {
                let mut totals = vec![0.0; names.len()];
                for timepoint in timescales
                    .timepoints_in_period(period.label)
                    .iter()
                    .filter_map(|id| timescales.timepoint(id))
                {
                    let values = balance_term_values(formulation, solution, zone, &timepoint.id);
                    for (total, value) in totals.iter_mut().zip(values) {
                        *total += value * timepoint.weight_in_year;
                    }
                }

                for (system_total, total) in system_totals.iter_mut().zip(&totals) {
                    *system_total += total;
                }
                let mut record = vec![period.label.to_string(), zone.to_string()];
                record.extend(totals.iter().map(ToString::to_string));
                self.annual_zonal_writer.write_record(&record)?;
            }

            let mut record = vec![period.label.to_string()];
            record.extend(system_totals.iter().map(ToString::to_string));
            self.annual_writer.write_record(&record)?;
        }

        Ok(())
    }

    /// Write online capacity and its costs for every project and period it is operable in
    fn write_generation_capacity(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        let builds = &formulation.builds;
        for project in model.projects.values() {
            for period in model.timescales.iter_periods() {
                let (Some(capacity), Some(capital), Some(fixed_om)) = (
                    builds.capacity(&project.id, period.label),
                    builds.capital_costs(&project.id, period.label),
                    builds.fixed_om_costs(&project.id, period.label),
                ) else {
                    continue;
                };

                let row = GenCapRow {
                    generation_project: project.id.clone(),
                    period: period.label,
                    gen_tech: project.technology.clone(),
                    gen_load_zone: project.load_zone.clone(),
                    gen_energy_source: project.energy_source.clone(),
                    capacity: solution.evaluate(capacity),
                    capital_costs: solution.evaluate(capital),
                    fixed_om_costs: solution.evaluate(fixed_om),
                    gen_is_cogen: project.is_cogen,
                };
                self.gen_cap_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write total and peak demand of every zone in each period.
    ///
    /// The expected coincident peak is left empty unless it was given as an input.
    fn write_zone_demand(&mut self, model: &Model) -> Result<()> {
        let timescales = &model.timescales;
        for zone in model.load_zones.values() {
            for period in timescales.iter_periods() {
                let peak = timescales
                    .timepoints_in_period(period.label)
                    .iter()
                    .map(|id| zone.demand(id).value())
                    .fold(0.0, f64::max);
                let row = ZoneDemandRow {
                    load_zone: zone.id.clone(),
                    period: period.label,
                    zone_total_demand_in_period_mwh: zone
                        .total_demand_in_period(timescales, period.label)
                        .value(),
                    zone_peak_demand_mw: peak,
                    zone_expected_coincident_peak_demand: zone
                        .coincident_peak_demand
                        .get(&period.label)
                        .map(|demand| demand.value()),
                };
                self.zone_demand_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write builds, online capacity and operation of storage projects
    fn write_storage(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        let storage = &formulation.storage;
        for project in model.iter_storage_projects() {
            for &build_year in project.vintages.keys() {
                let key = (project.id.clone(), build_year);
                let (Some(power), Some(energy)) = (
                    formulation.builds.build_gen.get(&key),
                    storage.energy_builds.get(&key),
                ) else {
                    continue;
                };

                let row = StorageBuildRow {
                    generation_project: project.id.clone(),
                    build_year,
                    load_zone: project.load_zone.clone(),
                    power_capacity: solution.value(*power),
                    energy_capacity: solution.value(*energy),
                };
                self.storage_builds_writer.serialize(row)?;
            }

            let land_use_rate = project.storage.map_or(0.0, |storage| storage.land_use_rate);
            for period in model.timescales.iter_periods() {
                let (Some(power), Some(energy)) = (
                    formulation.builds.capacity(&project.id, period.label),
                    storage.energy_capacity(&project.id, period.label),
                ) else {
                    continue;
                };

                let energy_capacity = solution.evaluate(energy);
                let row = StorageCapacityRow {
                    generation_project: project.id.clone(),
                    period: period.label,
                    load_zone: project.load_zone.clone(),
                    power_capacity: solution.evaluate(power),
                    energy_capacity,
                    land_use: energy_capacity * land_use_rate,
                };
                self.storage_capacity_writer.serialize(row)?;
            }

            for timepoint in model.timescales.iter_timepoints() {
                let key = (project.id.clone(), timepoint.id.clone());
                let (Some(charge), Some(soc), Some(discharge)) = (
                    storage.charge.get(&key),
                    storage.state_of_charge.get(&key),
                    formulation.dispatch.get(&project.id, &timepoint.id),
                ) else {
                    continue;
                };

                let row = StorageDispatchRow {
                    generation_project: project.id.clone(),
                    timepoint: timepoint.id.clone(),
                    load_zone: project.load_zone.clone(),
                    charge: solution.value(*charge),
                    discharge: solution.value(discharge),
                    state_of_charge: solution.value(*soc),
                };
                self.storage_dispatch_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write power sent along each corridor with its limit and the dual of the limit row
    fn write_transmission_dispatch(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        let transmission = &formulation.transmission;
        let duals: IndexMap<_, _> = transmission
            .limit_keys()
            .zip_duals(solution.dual_rows())
            .collect();

        for ((corridor, timepoint_id), var) in &transmission.dispatch {
            let Some(timepoint) = model.timescales.timepoint(timepoint_id) else {
                continue;
            };
            let dispatch_limit = transmission
                .available(&corridor.line, timepoint.period)
                .map_or(0.0, |expr| solution.evaluate(expr));
            let key = (corridor.clone(), timepoint_id.clone());

            let row = TransmissionDispatchRow {
                load_zone_from: corridor.from.clone(),
                load_zone_to: corridor.to.clone(),
                timestamp: timepoint.timestamp.clone(),
                transmission_dispatch: solution.value(*var),
                dispatch_limit,
                transmission_limit_dual: duals.get(&key).copied().unwrap_or(0.0),
            };
            self.transmission_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the annual value of every cost component in every period
    fn write_costs(
        &mut self,
        model: &Model,
        formulation: &Formulation,
        solution: &Solution,
    ) -> Result<()> {
        for item in formulation.costs.itemise(solution, &model.timescales) {
            let row = CostRow {
                period: item.period,
                component: item.component,
                annual_npv: item.annual_npv,
                annual_real: item.annual_real,
            };
            self.costs_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write ideal and actual generation of sources with curtailment limits
    fn write_curtailment(&mut self, formulation: &Formulation, solution: &Solution) -> Result<()> {
        let Some(ref mut wtr) = self.curtailment_writer else {
            return Ok(());
        };

        for ((period, energy_source), generation) in &formulation.curtailment {
            let (ideal, actual) = generation.evaluate(solution);
            let row = CurtailmentRow {
                period: *period,
                energy_source: energy_source.clone(),
                ideal_mwh: ideal.value(),
                actual_mwh: actual.value(),
                curtailment_ratio: curtailment_ratio(ideal, actual).value(),
            };
            wtr.serialize(row)?;
        }

        Ok(())
    }

    /// Write the objective value to a text file
    fn write_total_cost(&self, solution: &Solution) -> Result<()> {
        let file_path = self.output_path.join(TOTAL_COST_FILE_NAME);
        fs::write(&file_path, format!("{}\n", solution.objective_value))
            .with_context(|| format!("Could not write {}", file_path.display()))
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.load_balance_writer.flush()?;
        self.annual_zonal_writer.flush()?;
        self.annual_writer.flush()?;
        self.gen_cap_writer.flush()?;
        self.zone_demand_writer.flush()?;
        self.storage_builds_writer.flush()?;
        self.storage_capacity_writer.flush()?;
        self.storage_dispatch_writer.flush()?;
        self.transmission_writer.flush()?;
        self.costs_writer.flush()?;
        if let Some(ref mut wtr) = self.curtailment_writer {
            wtr.flush()?;
        }
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Column names of the balance terms: injections, then withdrawals
fn balance_term_names(formulation: &Formulation) -> impl Iterator<Item = String> + '_ {
    let balance = &formulation.balance;
    balance
        .injections()
        .iter()
        .chain(balance.withdrawals())
        .map(|term| term.name.clone())
}

/// Values of the balance terms in a zone and timepoint, with withdrawals negated
fn balance_term_values<'a>(
    formulation: &'a Formulation,
    solution: &'a Solution,
    zone: &'a LoadZoneID,
    timepoint: &'a TimepointID,
) -> impl Iterator<Item = f64> + 'a {
    let balance = &formulation.balance;
    let injections = balance
        .injections()
        .iter()
        .map(move |term| term.value(solution, zone, timepoint));
    let withdrawals = balance
        .withdrawals()
        .iter()
        .map(move |term| -term.value(solution, zone, timepoint));
    injections.chain(withdrawals)
}
