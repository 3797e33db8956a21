//! Code for reading generation projects from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::load_zone::LoadZoneMap;
use crate::project::{
    BuildKind, CcsParameters, GenerationProject, ProjectMap, StorageParameters,
};
use crate::timescale::Timescales;
use crate::units::{Dimensionless, FuelPerEnergy, MoneyPerEnergy, MoneyPerPower, Power};
use serde::Deserialize;
use std::path::Path;

mod build;
use build::read_build_vintages;
mod capacity_factor;
use capacity_factor::read_capacity_factors;

const PROJECTS_FILE_NAME: &str = "generation_projects_info.csv";

/// Represents a row of the generation projects CSV file
#[derive(Debug, Default, Deserialize, PartialEq)]
struct GenerationProjectRaw {
    #[serde(rename = "GENERATION_PROJECT")]
    id: String,
    gen_tech: String,
    gen_energy_source: String,
    gen_load_zone: String,
    gen_max_age: u32,
    #[serde(deserialize_with = "deserialise_flag")]
    gen_is_variable: bool,
    #[serde(default, deserialize_with = "deserialise_optional_flag")]
    gen_is_baseload: bool,
    #[serde(default, deserialize_with = "deserialise_optional_flag")]
    gen_is_cogen: bool,
    #[serde(default, deserialize_with = "deserialise_optional_flag")]
    gen_is_distributed: bool,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_scheduled_outage_rate: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_forced_outage_rate: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_full_load_heat_rate: Option<f64>,
    gen_variable_om: f64,
    gen_connect_cost_per_mw: f64,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_capacity_limit_mw: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_unit_size: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_ccs_capture_efficiency: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_ccs_energy_load: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_min_build_capacity: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_retirement_year: Option<u32>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_dbid: Option<String>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_storage_efficiency: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_discharge_efficiency: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_store_to_release_ratio: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_storage_energy_to_power_ratio: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_storage_max_cycles_per_year: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_self_discharge_rate: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_land_use_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    gen_min_soc: Option<Dimensionless>,
}

impl GenerationProjectRaw {
    /// Whether any storage-specific column has a value
    fn has_storage_columns(&self) -> bool {
        self.gen_discharge_efficiency.is_some()
            || self.gen_store_to_release_ratio.is_some()
            || self.gen_storage_energy_to_power_ratio.is_some()
            || self.gen_storage_max_cycles_per_year.is_some()
            || self.gen_self_discharge_rate.is_some()
            || self.gen_land_use_rate.is_some()
            || self.gen_min_soc.is_some()
    }

    /// The capacity limit, checking that it is a valid quantity
    fn capacity_limit(&self) -> Result<Option<Power>> {
        let Some(limit) = self.gen_capacity_limit_mw else {
            return Ok(None);
        };
        check_non_negative(limit, "gen_capacity_limit_mw")?;
        Ok(Some(Power(limit)))
    }

    fn build_kind(&self) -> Result<BuildKind> {
        if let Some(unit_size) = self.gen_unit_size {
            ensure!(
                unit_size.is_finite() && unit_size > 0.0,
                "gen_unit_size must be a finite number greater than zero"
            );
        }
        if let Some(min_build) = self.gen_min_build_capacity {
            check_non_negative(min_build, "gen_min_build_capacity")?;
        }

        Ok(BuildKind::new(
            self.gen_unit_size.map(Power),
            self.gen_min_build_capacity.map(Power),
        ))
    }

    fn ccs(&self) -> Result<Option<CcsParameters>> {
        match (self.gen_ccs_capture_efficiency, self.gen_ccs_energy_load) {
            (Some(capture_efficiency), energy_load) => Ok(Some(CcsParameters {
                capture_efficiency,
                energy_load: energy_load.unwrap_or_default(),
            })),
            (None, Some(_)) => bail!("gen_ccs_energy_load given without gen_ccs_capture_efficiency"),
            (None, None) => Ok(None),
        }
    }

    /// Storage parameters, if the project has any.
    ///
    /// The self-discharge rate is a daily fraction and must be strictly below one: a rate of one
    /// would empty the store every day, leaving nothing to carry between timepoints.
    fn storage(&self) -> Result<Option<StorageParameters>> {
        let Some(efficiency) = self.gen_storage_efficiency else {
            ensure!(
                !self.has_storage_columns(),
                "Storage parameters given but gen_storage_efficiency is missing"
            );
            return Ok(None);
        };

        let defaults = StorageParameters::default();
        let discharge_efficiency = self
            .gen_discharge_efficiency
            .unwrap_or(defaults.discharge_efficiency.value());
        for (value, name) in [
            (efficiency, "gen_storage_efficiency"),
            (discharge_efficiency, "gen_discharge_efficiency"),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                "{name} must be greater than zero and no greater than one"
            );
        }

        let store_to_release_ratio = self
            .gen_store_to_release_ratio
            .unwrap_or(defaults.store_to_release_ratio.value());
        ensure!(
            store_to_release_ratio.is_finite() && store_to_release_ratio > 0.0,
            "gen_store_to_release_ratio must be a finite number greater than zero"
        );

        let self_discharge_rate = self
            .gen_self_discharge_rate
            .unwrap_or(defaults.self_discharge_rate);
        ensure!(
            self_discharge_rate < Dimensionless(1.0),
            "gen_self_discharge_rate must be less than one (a rate of one empties the store daily)"
        );

        let land_use_rate = self.gen_land_use_rate.unwrap_or(defaults.land_use_rate);
        check_non_negative(land_use_rate, "gen_land_use_rate")?;

        Ok(Some(StorageParameters {
            efficiency: Dimensionless(efficiency),
            discharge_efficiency: Dimensionless(discharge_efficiency),
            store_to_release_ratio: Dimensionless(store_to_release_ratio),
            energy_to_power_ratio: finite_limit(
                self.gen_storage_energy_to_power_ratio,
                "gen_storage_energy_to_power_ratio",
            )?,
            max_cycles_per_year: finite_limit(
                self.gen_storage_max_cycles_per_year,
                "gen_storage_max_cycles_per_year",
            )?,
            self_discharge_rate,
            land_use_rate,
            min_soc: self.gen_min_soc.unwrap_or(defaults.min_soc),
        }))
    }
}

/// Interpret an optional limit, where infinity means no limit
fn finite_limit(value: Option<f64>, name: &str) -> Result<Option<f64>> {
    match value {
        Some(value) if value == f64::INFINITY => Ok(None),
        Some(value) => {
            check_non_negative(value, name)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Read generation projects, along with their build vintages and capacity factors.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `load_zones` - Load zones of the model
/// * `timescales` - The temporal index of the model
///
/// # Returns
///
/// A map of [`GenerationProject`]s keyed by project ID, or an error.
pub fn read_generation_projects(
    model_dir: &Path,
    load_zones: &LoadZoneMap,
    timescales: &Timescales,
) -> Result<ProjectMap> {
    let file_path = model_dir.join(PROJECTS_FILE_NAME);
    let mut projects = read_generation_projects_from_iter(read_csv(&file_path)?, load_zones)
        .with_context(|| input_err_msg(&file_path))?;

    read_build_vintages(model_dir, &mut projects, timescales)?;
    read_capacity_factors(model_dir, &mut projects, timescales)?;

    Ok(projects)
}

fn read_generation_projects_from_iter<I>(iter: I, load_zones: &LoadZoneMap) -> Result<ProjectMap>
where
    I: Iterator<Item = GenerationProjectRaw>,
{
    let mut projects = ProjectMap::new();
    for raw in iter {
        let project = create_project(raw, load_zones)?;
        try_insert(&mut projects, project.id.clone(), project)?;
    }

    Ok(projects)
}

fn create_project(raw: GenerationProjectRaw, load_zones: &LoadZoneMap) -> Result<GenerationProject> {
    let id = raw.id.as_str();
    let load_zone = load_zones
        .get_id_by_str(&raw.gen_load_zone)
        .with_context(|| format!("Invalid load zone for project {id}"))?;
    ensure!(raw.gen_max_age > 0, "gen_max_age for project {id} must be greater than zero");
    check_non_negative(raw.gen_variable_om, "gen_variable_om")
        .and_then(|()| check_non_negative(raw.gen_connect_cost_per_mw, "gen_connect_cost_per_mw"))
        .with_context(|| format!("Invalid costs for project {id}"))?;
    if let Some(heat_rate) = raw.gen_full_load_heat_rate {
        ensure!(
            heat_rate.is_finite() && heat_rate > 0.0,
            "gen_full_load_heat_rate for project {id} must be a finite number greater than zero"
        );
    }

    let capacity_limit = raw
        .capacity_limit()
        .with_context(|| format!("Invalid capacity limit for project {id}"))?;
    let build_kind = raw
        .build_kind()
        .with_context(|| format!("Invalid build size for project {id}"))?;
    let ccs = raw
        .ccs()
        .with_context(|| format!("Invalid CCS parameters for project {id}"))?;
    let storage = raw
        .storage()
        .with_context(|| format!("Invalid storage parameters for project {id}"))?;

    Ok(GenerationProject {
        dbid: raw.gen_dbid.clone().unwrap_or_else(|| raw.id.clone()),
        id: raw.id.into(),
        technology: raw.gen_tech.into(),
        energy_source: raw.gen_energy_source.into(),
        load_zone,
        max_age: raw.gen_max_age,
        retirement_year: raw.gen_retirement_year,
        is_variable: raw.gen_is_variable,
        is_baseload: raw.gen_is_baseload,
        is_cogen: raw.gen_is_cogen,
        is_distributed: raw.gen_is_distributed,
        scheduled_outage_rate: raw.gen_scheduled_outage_rate.unwrap_or_default(),
        forced_outage_rate: raw.gen_forced_outage_rate.unwrap_or_default(),
        full_load_heat_rate: raw.gen_full_load_heat_rate.map(FuelPerEnergy),
        variable_om: MoneyPerEnergy(raw.gen_variable_om),
        connect_cost_per_mw: MoneyPerPower(raw.gen_connect_cost_per_mw),
        capacity_limit,
        build_kind,
        ccs,
        storage,
        vintages: IndexMap::new(),
        capacity_factors: IndexMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, load_zones};
    use rstest::{fixture, rstest};

    #[fixture]
    fn raw() -> GenerationProjectRaw {
        GenerationProjectRaw {
            id: "gas".into(),
            gen_tech: "CCGT".into(),
            gen_energy_source: "Gas".into(),
            gen_load_zone: "north".into(),
            gen_max_age: 20,
            gen_variable_om: 2.0,
            gen_connect_cost_per_mw: 100.0,
            ..Default::default()
        }
    }

    #[rstest]
    fn test_create_project(raw: GenerationProjectRaw, load_zones: LoadZoneMap) {
        let project = create_project(raw, &load_zones).unwrap();
        assert_eq!(project.id, "gas".into());
        assert_eq!(project.dbid, "gas");
        assert_eq!(project.load_zone, "north".into());
        assert_eq!(project.build_kind, BuildKind::Continuous);
        assert_eq!(project.capacity_limit, None);
        assert!(project.ccs.is_none());
        assert!(!project.is_storage());
    }

    #[rstest]
    fn test_create_project_unknown_zone(mut raw: GenerationProjectRaw, load_zones: LoadZoneMap) {
        raw.gen_load_zone = "south".into();
        assert_error!(
            create_project(raw, &load_zones),
            "Invalid load zone for project gas"
        );
    }

    #[rstest]
    #[case(Some(0.0), true)]
    #[case(Some(500.0), true)]
    #[case(Some(-1.0), false)]
    #[case(Some(f64::INFINITY), false)]
    #[case(None, true)]
    fn test_capacity_limit(
        mut raw: GenerationProjectRaw,
        #[case] limit: Option<f64>,
        #[case] valid: bool,
    ) {
        raw.gen_capacity_limit_mw = limit;
        assert_eq!(raw.capacity_limit().is_ok(), valid);
    }

    #[rstest]
    fn test_ccs(mut raw: GenerationProjectRaw) {
        raw.gen_ccs_capture_efficiency = Some(Dimensionless(0.9));
        assert_eq!(
            raw.ccs().unwrap(),
            Some(CcsParameters {
                capture_efficiency: Dimensionless(0.9),
                energy_load: Dimensionless(0.0)
            })
        );

        raw.gen_ccs_capture_efficiency = None;
        raw.gen_ccs_energy_load = Some(Dimensionless(0.2));
        assert!(raw.ccs().is_err());
    }

    #[rstest]
    fn test_storage_defaults(mut raw: GenerationProjectRaw) {
        raw.gen_storage_efficiency = Some(0.85);
        let storage = raw.storage().unwrap().unwrap();
        assert_eq!(
            storage,
            StorageParameters {
                efficiency: Dimensionless(0.85),
                ..Default::default()
            }
        );
    }

    #[rstest]
    fn test_storage_infinite_limits(mut raw: GenerationProjectRaw) {
        raw.gen_storage_efficiency = Some(0.85);
        raw.gen_storage_energy_to_power_ratio = Some(f64::INFINITY);
        raw.gen_storage_max_cycles_per_year = Some(365.0);
        let storage = raw.storage().unwrap().unwrap();
        assert_eq!(storage.energy_to_power_ratio, None);
        assert_eq!(storage.max_cycles_per_year, Some(365.0));
    }

    #[rstest]
    fn test_storage_without_efficiency(mut raw: GenerationProjectRaw) {
        raw.gen_min_soc = Some(Dimensionless(0.1));
        assert_error!(
            raw.storage(),
            "Storage parameters given but gen_storage_efficiency is missing"
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.5)]
    fn test_storage_bad_efficiency(mut raw: GenerationProjectRaw, #[case] efficiency: f64) {
        raw.gen_storage_efficiency = Some(efficiency);
        assert_error!(
            raw.storage(),
            "gen_storage_efficiency must be greater than zero and no greater than one"
        );
    }

    #[rstest]
    #[case(0.99, true)]
    #[case(1.0, false)]
    #[case(1.5, false)]
    fn test_storage_self_discharge_rate(
        mut raw: GenerationProjectRaw,
        #[case] rate: f64,
        #[case] valid: bool,
    ) {
        raw.gen_storage_efficiency = Some(0.85);
        raw.gen_self_discharge_rate = Some(Dimensionless(rate));
        if valid {
            let storage = raw.storage().unwrap().unwrap();
            assert_eq!(storage.self_discharge_rate, Dimensionless(rate));
        } else {
            assert_error!(
                raw.storage(),
                "gen_self_discharge_rate must be less than one (a rate of one empties the store daily)"
            );
        }
    }

    #[rstest]
    fn test_read_projects_duplicate(
        #[from(raw)] first: GenerationProjectRaw,
        #[from(raw)] second: GenerationProjectRaw,
        load_zones: LoadZoneMap,
    ) {
        assert!(
            read_generation_projects_from_iter([first, second].into_iter(), &load_zones).is_err()
        );
    }
}
