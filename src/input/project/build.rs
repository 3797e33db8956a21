//! Code for reading predetermined builds and build costs of generation projects.
use super::super::*;
use crate::id::IDCollection;
use crate::project::{BuildVintage, PredeterminedBuild, ProjectID, ProjectMap};
use crate::timescale::Timescales;
use crate::units::{Energy, MoneyPerEnergy, MoneyPerPower, MoneyPerPowerPerYear, Power};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const PREDETERMINED_FILE_NAME: &str = "gen_build_predetermined.csv";
const COSTS_FILE_NAME: &str = "gen_build_costs.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct PredeterminedBuildRaw {
    #[serde(rename = "GENERATION_PROJECT")]
    project_id: String,
    build_year: u32,
    gen_predetermined_cap: f64,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_predetermined_storage_energy_mwh: Option<f64>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct BuildCostRaw {
    #[serde(rename = "GENERATION_PROJECT")]
    project_id: String,
    build_year: u32,
    gen_overnight_cost: f64,
    gen_fixed_om: f64,
    #[serde(default, deserialize_with = "deserialise_optional")]
    gen_storage_energy_overnight_cost: Option<f64>,
}

type PredeterminedMap = IndexMap<(ProjectID, u32), PredeterminedBuild>;

/// Read build vintages for each project and attach them to the projects.
///
/// Predetermined builds are optional. Every predetermined build needs a matching row of build
/// costs and every cost row must be for either a predetermined build or a new build in a period.
pub fn read_build_vintages(
    model_dir: &Path,
    projects: &mut ProjectMap,
    timescales: &Timescales,
) -> Result<()> {
    let file_path = model_dir.join(PREDETERMINED_FILE_NAME);
    let predetermined =
        read_predetermined_from_iter(read_csv_optional(&file_path)?, projects, timescales)
            .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(COSTS_FILE_NAME);
    read_build_costs_from_iter(read_csv(&file_path)?, predetermined, projects, timescales)
        .with_context(|| input_err_msg(&file_path))
}

fn read_predetermined_from_iter<I>(
    iter: I,
    projects: &ProjectMap,
    timescales: &Timescales,
) -> Result<PredeterminedMap>
where
    I: Iterator<Item = PredeterminedBuildRaw>,
{
    let mut map = PredeterminedMap::new();
    for raw in iter {
        let id = projects.get_id_by_str(&raw.project_id)?;
        let project = &projects[&id];
        ensure!(
            !timescales.is_period_label(raw.build_year),
            "Predetermined build year {} for project {id} is also a period label",
            raw.build_year
        );
        check_non_negative(raw.gen_predetermined_cap, "gen_predetermined_cap")?;
        if let Some(energy) = raw.gen_predetermined_storage_energy_mwh {
            ensure!(
                project.is_storage(),
                "Predetermined storage energy given for project {id}, which is not a storage project"
            );
            check_non_negative(energy, "gen_predetermined_storage_energy_mwh")?;
        }

        let build = PredeterminedBuild {
            capacity: Power(raw.gen_predetermined_cap),
            storage_energy: raw.gen_predetermined_storage_energy_mwh.map(Energy),
        };
        try_insert(&mut map, (id, raw.build_year), build)?;
    }

    Ok(map)
}

fn read_build_costs_from_iter<I>(
    iter: I,
    mut predetermined: PredeterminedMap,
    projects: &mut ProjectMap,
    timescales: &Timescales,
) -> Result<()>
where
    I: Iterator<Item = BuildCostRaw>,
{
    for raw in iter {
        let id = projects.get_id_by_str(&raw.project_id)?;
        let build_year = raw.build_year;
        let predetermined_build = predetermined.shift_remove(&(id.clone(), build_year));
        ensure!(
            predetermined_build.is_some() || timescales.is_period_label(build_year),
            "Build year {build_year} for project {id} is neither a predetermined build nor a period"
        );
        check_non_negative(raw.gen_overnight_cost, "gen_overnight_cost")?;
        check_non_negative(raw.gen_fixed_om, "gen_fixed_om")?;

        let project = &mut projects[&id];
        let storage_energy_overnight_cost = match &project.storage {
            Some(storage) => {
                let cost = raw.gen_storage_energy_overnight_cost.with_context(|| {
                    format!(
                        "Missing gen_storage_energy_overnight_cost for storage project {id} \
                         in build year {build_year}"
                    )
                })?;
                check_non_negative(cost, "gen_storage_energy_overnight_cost")?;
                if storage.energy_to_power_ratio.is_some() && cost > 0.0 {
                    warn!(
                        "Storage project {id} has a fixed energy to power ratio and a nonzero \
                         energy overnight cost in build year {build_year}. The energy cost will \
                         be charged in addition to the power cost."
                    );
                }
                Some(MoneyPerEnergy(cost))
            }
            None => None,
        };

        let vintage = BuildVintage {
            build_year,
            predetermined: predetermined_build,
            overnight_cost: MoneyPerPower(raw.gen_overnight_cost),
            fixed_om: MoneyPerPowerPerYear(raw.gen_fixed_om),
            storage_energy_overnight_cost,
        };
        try_insert(&mut project.vintages, build_year, vintage)
            .with_context(|| format!("Duplicate build costs for project {id}"))?;
    }

    // Any remaining predetermined builds have no costs
    if let Some(((id, build_year), _)) = predetermined.first() {
        bail!("Missing build costs for predetermined build of project {id} in {build_year}");
    }

    for project in projects.values_mut() {
        project.vintages.sort_keys();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, battery_project, gas_project, timescales};
    use crate::project::GenerationProject;
    use rstest::rstest;

    fn projects(project: GenerationProject) -> ProjectMap {
        let mut project = project;
        project.vintages.clear();
        [(project.id.clone(), project)].into_iter().collect()
    }

    fn predetermined(project: &str, build_year: u32, cap: f64) -> PredeterminedBuildRaw {
        PredeterminedBuildRaw {
            project_id: project.into(),
            build_year,
            gen_predetermined_cap: cap,
            gen_predetermined_storage_energy_mwh: None,
        }
    }

    fn cost(project: &str, build_year: u32, storage_cost: Option<f64>) -> BuildCostRaw {
        BuildCostRaw {
            project_id: project.into(),
            build_year,
            gen_overnight_cost: 1000.0,
            gen_fixed_om: 10.0,
            gen_storage_energy_overnight_cost: storage_cost,
        }
    }

    #[rstest]
    fn test_read_build_vintages(gas_project: GenerationProject, timescales: Timescales) {
        let id = gas_project.id.to_string();
        let mut projects = projects(gas_project);
        let predetermined = read_predetermined_from_iter(
            [predetermined(&id, 2015, 300.0)].into_iter(),
            &projects,
            &timescales,
        )
        .unwrap();
        read_build_costs_from_iter(
            [cost(&id, 2030, None), cost(&id, 2015, None)].into_iter(),
            predetermined,
            &mut projects,
            &timescales,
        )
        .unwrap();

        let vintages = &projects[id.as_str()].vintages;
        assert_eq!(vintages.keys().copied().collect::<Vec<_>>(), [2015, 2030]);
        assert_eq!(
            vintages[&2015].predetermined.unwrap().capacity,
            Power(300.0)
        );
        assert!(vintages[&2030].predetermined.is_none());
    }

    #[rstest]
    fn test_predetermined_on_period_label(gas_project: GenerationProject, timescales: Timescales) {
        let id = gas_project.id.to_string();
        let projects = projects(gas_project);
        assert_error!(
            read_predetermined_from_iter(
                [predetermined(&id, 2030, 300.0)].into_iter(),
                &projects,
                &timescales
            ),
            format!("Predetermined build year 2030 for project {id} is also a period label")
        );
    }

    #[rstest]
    fn test_cost_for_unknown_build_year(gas_project: GenerationProject, timescales: Timescales) {
        let id = gas_project.id.to_string();
        let mut projects = projects(gas_project);
        assert_error!(
            read_build_costs_from_iter(
                [cost(&id, 2021, None)].into_iter(),
                PredeterminedMap::new(),
                &mut projects,
                &timescales
            ),
            format!("Build year 2021 for project {id} is neither a predetermined build nor a period")
        );
    }

    #[rstest]
    fn test_predetermined_without_cost(gas_project: GenerationProject, timescales: Timescales) {
        let id = gas_project.id.to_string();
        let mut projects = projects(gas_project);
        let predetermined = read_predetermined_from_iter(
            [predetermined(&id, 2015, 300.0)].into_iter(),
            &projects,
            &timescales,
        )
        .unwrap();
        assert_error!(
            read_build_costs_from_iter(
                [cost(&id, 2030, None)].into_iter(),
                predetermined,
                &mut projects,
                &timescales
            ),
            format!("Missing build costs for predetermined build of project {id} in 2015")
        );
    }

    #[rstest]
    fn test_storage_vintage_needs_energy_cost(
        battery_project: GenerationProject,
        timescales: Timescales,
    ) {
        let id = battery_project.id.to_string();
        let mut projects = projects(battery_project);
        assert!(
            read_build_costs_from_iter(
                [cost(&id, 2030, None)].into_iter(),
                PredeterminedMap::new(),
                &mut projects,
                &timescales
            )
            .is_err()
        );

        read_build_costs_from_iter(
            [cost(&id, 2030, Some(200.0))].into_iter(),
            PredeterminedMap::new(),
            &mut projects,
            &timescales,
        )
        .unwrap();
        assert_eq!(
            projects[id.as_str()].vintages[&2030].storage_energy_overnight_cost,
            Some(MoneyPerEnergy(200.0))
        );
    }

    #[rstest]
    fn test_storage_energy_on_non_storage(gas_project: GenerationProject, timescales: Timescales) {
        let id = gas_project.id.to_string();
        let projects = projects(gas_project);
        let mut raw = predetermined(&id, 2015, 300.0);
        raw.gen_predetermined_storage_energy_mwh = Some(100.0);
        assert!(read_predetermined_from_iter([raw].into_iter(), &projects, &timescales).is_err());
    }
}
