//! Code for reading curtailment limits from a CSV file.
use super::*;
use crate::curtailment::{CurtailmentLimit, LimitType};
use crate::project::ProjectMap;
use crate::timescale::Timescales;
use crate::units::Dimensionless;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const CURTAILMENT_LIMITS_FILE_NAME: &str = "curtailment_limits.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct CurtailmentLimitRaw {
    period: u32,
    energy_source: String,
    limit_type: LimitType,
    #[serde(deserialize_with = "deserialise_proportion")]
    value: Dimensionless,
}

/// Read limits on curtailment of variable energy sources. The file is optional.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `timescales` - The temporal index of the model
/// * `projects` - Generation projects of the model
pub fn read_curtailment_limits(
    model_dir: &Path,
    timescales: &Timescales,
    projects: &ProjectMap,
) -> Result<Vec<CurtailmentLimit>> {
    let file_path = model_dir.join(CURTAILMENT_LIMITS_FILE_NAME);
    read_curtailment_limits_from_iter(read_csv_optional(&file_path)?, timescales, projects)
        .with_context(|| input_err_msg(&file_path))
}

fn read_curtailment_limits_from_iter<I>(
    iter: I,
    timescales: &Timescales,
    projects: &ProjectMap,
) -> Result<Vec<CurtailmentLimit>>
where
    I: Iterator<Item = CurtailmentLimitRaw>,
{
    let variable_sources: HashSet<_> = projects
        .values()
        .filter(|project| project.is_variable)
        .map(|project| project.energy_source.clone())
        .collect();

    let mut seen = HashSet::new();
    let mut limits = Vec::new();
    for raw in iter {
        ensure!(
            timescales.is_period_label(raw.period),
            "Unknown period {}",
            raw.period
        );
        let energy_source = variable_sources
            .get(raw.energy_source.as_str())
            .with_context(|| {
                format!(
                    "Energy source {} has no variable generation projects",
                    raw.energy_source
                )
            })?
            .clone();
        ensure!(
            seen.insert((raw.period, energy_source.clone(), raw.limit_type)),
            "Duplicate {} curtailment limit for {energy_source} in period {}",
            match raw.limit_type {
                LimitType::Min => "min",
                LimitType::Max => "max",
            },
            raw.period
        );

        limits.push(CurtailmentLimit {
            period: raw.period,
            energy_source,
            limit_type: raw.limit_type,
            value: raw.value,
        });
    }

    Ok(limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, solar_project, timescales};
    use crate::project::GenerationProject;
    use rstest::{fixture, rstest};

    #[fixture]
    fn projects(solar_project: GenerationProject) -> ProjectMap {
        [(solar_project.id.clone(), solar_project)]
            .into_iter()
            .collect()
    }

    fn raw(energy_source: &str, limit_type: LimitType) -> CurtailmentLimitRaw {
        CurtailmentLimitRaw {
            period: 2030,
            energy_source: energy_source.into(),
            limit_type,
            value: Dimensionless(0.1),
        }
    }

    #[rstest]
    fn test_read_curtailment_limits(timescales: Timescales, projects: ProjectMap) {
        let limits = read_curtailment_limits_from_iter(
            [raw("Solar", LimitType::Max), raw("Solar", LimitType::Min)].into_iter(),
            &timescales,
            &projects,
        )
        .unwrap();
        assert_eq!(limits.len(), 2);
        assert_eq!(limits[0].energy_source, "Solar".into());
        assert_eq!(limits[0].limit_type, LimitType::Max);
    }

    #[rstest]
    fn test_unknown_energy_source(timescales: Timescales, projects: ProjectMap) {
        assert_error!(
            read_curtailment_limits_from_iter(
                [raw("Wind", LimitType::Max)].into_iter(),
                &timescales,
                &projects
            ),
            "Energy source Wind has no variable generation projects"
        );
    }

    #[rstest]
    fn test_duplicate_limit(timescales: Timescales, projects: ProjectMap) {
        assert_error!(
            read_curtailment_limits_from_iter(
                [raw("Solar", LimitType::Max), raw("Solar", LimitType::Max)].into_iter(),
                &timescales,
                &projects
            ),
            "Duplicate max curtailment limit for Solar in period 2030"
        );
    }
}
