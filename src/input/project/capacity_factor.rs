//! Code for reading capacity factors of variable generation projects.
use super::super::*;
use crate::id::IDCollection;
use crate::project::ProjectMap;
use crate::timescale::Timescales;
use crate::units::Dimensionless;
use serde::Deserialize;
use std::path::Path;

const CAPACITY_FACTORS_FILE_NAME: &str = "variable_capacity_factors.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct CapacityFactorRaw {
    #[serde(rename = "GENERATION_PROJECT")]
    project_id: String,
    timepoint: String,
    gen_max_capacity_factor: f64,
}

/// Read the maximum capacity factors of variable projects.
///
/// Every variable project must have a capacity factor for every timepoint of every period in which
/// any of its vintages can operate.
pub fn read_capacity_factors(
    model_dir: &Path,
    projects: &mut ProjectMap,
    timescales: &Timescales,
) -> Result<()> {
    let file_path = model_dir.join(CAPACITY_FACTORS_FILE_NAME);
    read_capacity_factors_from_iter(read_csv_optional(&file_path)?, projects, timescales)
        .with_context(|| input_err_msg(&file_path))
}

fn read_capacity_factors_from_iter<I>(
    iter: I,
    projects: &mut ProjectMap,
    timescales: &Timescales,
) -> Result<()>
where
    I: Iterator<Item = CapacityFactorRaw>,
{
    let timepoints = timescales.timepoint_ids();
    for raw in iter {
        let id = projects.get_id_by_str(&raw.project_id)?;
        let timepoint = timepoints.get_id_by_str(&raw.timepoint)?;
        let project = &mut projects[&id];
        ensure!(
            project.is_variable,
            "Capacity factor given for project {id}, which is not variable"
        );
        check_non_negative(raw.gen_max_capacity_factor, "gen_max_capacity_factor")?;

        try_insert(
            &mut project.capacity_factors,
            timepoint,
            Dimensionless(raw.gen_max_capacity_factor),
        )
        .with_context(|| format!("Duplicate capacity factor for project {id}"))?;
    }

    for project in projects.values().filter(|project| project.is_variable) {
        let periods = project
            .vintages
            .keys()
            .flat_map(|build_year| project.operable_periods(*build_year, timescales))
            .unique();
        for period in periods {
            for timepoint in timescales.timepoints_in_period(period) {
                ensure!(
                    project.capacity_factors.contains_key(timepoint),
                    "Missing capacity factor for project {} in timepoint {timepoint}",
                    project.id
                );
            }
        }
    }

    Ok(())
}
