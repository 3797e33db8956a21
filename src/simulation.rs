//! Functionality for solving a capacity expansion model and saving its results.
use crate::formulation::{Formulation, build_formulation};
use crate::model::Model;
use crate::optimisation::{Solution, solve};
use crate::output::DataWriter;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Build and solve the program for a model.
pub fn optimise(model: &Model) -> Result<(Formulation, Solution)> {
    let formulation = build_formulation(model).context("Failed to build the program.")?;

    let solution = solve(&formulation.program, model.parameters.mip_rel_gap)
        .context("Failed to solve the program.")?;
    info!("Total cost: {:.2}", solution.objective_value);

    Ok((formulation, solution))
}

/// Run the model.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `write_duals` - Whether to write raw dual values to additional CSV files
pub fn run(model: &Model, output_path: &Path, write_duals: bool) -> Result<()> {
    let (formulation, solution) = optimise(model)?;

    if write_duals && formulation.program.is_mip() {
        warn!("Dual values of a mixed-integer program are not meaningful");
    }

    let mut writer = DataWriter::create(output_path, model, write_duals)?;
    writer.write_results(model, &formulation, &solution)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{battery_project, model, solar_project};
    use crate::project::{BuildKind, BuildVintage, GenerationProject, PredeterminedBuild, ProjectID};
    use crate::units::{Dimensionless, Energy, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const TOLERANCE: f64 = 1e-6;

    /// Check the energy balance holds in every zone and timepoint of a solved model
    fn assert_balanced(model: &Model, formulation: &Formulation, solution: &Solution) {
        let balance = &formulation.balance;
        for zone in model.load_zones.keys() {
            for timepoint in model.timescales.iter_timepoints() {
                let injected: f64 = balance
                    .injections()
                    .iter()
                    .map(|term| term.value(solution, zone, &timepoint.id))
                    .sum();
                let withdrawn: f64 = balance
                    .withdrawals()
                    .iter()
                    .map(|term| term.value(solution, zone, &timepoint.id))
                    .sum();
                assert_approx_eq!(f64, injected, withdrawn, epsilon = TOLERANCE);
            }
        }
    }

    #[rstest]
    fn test_single_zone_gas(model: Model) {
        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        // Just enough capacity is built to meet demand in every timepoint
        let gas = ProjectID::from("gas");
        let capacity = formulation.builds.capacity(&gas, 2030).unwrap();
        assert_approx_eq!(f64, solution.evaluate(capacity), 80.0, epsilon = TOLERANCE);
        for timepoint in model.timescales.iter_timepoints() {
            let dispatch = formulation.dispatch.get(&gas, &timepoint.id).unwrap();
            assert_approx_eq!(f64, solution.value(dispatch), 80.0, epsilon = TOLERANCE);
        }
    }

    /// Add a predetermined vintage, built before the first period, to a project
    fn add_existing_capacity(project: &mut GenerationProject, capacity: Power) {
        let vintage = BuildVintage {
            build_year: 2020,
            predetermined: Some(PredeterminedBuild {
                capacity,
                storage_energy: None,
            }),
            ..project.vintages[&2030].clone()
        };
        project.vintages.insert(2020, vintage);
    }

    /// A gas plant existing before the first period, with no option of new builds
    fn existing_gas(model: &Model, capacity: Power) -> GenerationProject {
        let mut project = model.projects["gas"].clone();
        project.id = "gas_existing".into();
        add_existing_capacity(&mut project, capacity);
        project.vintages.shift_remove(&2030);
        project
    }

    #[rstest]
    fn test_predetermined_capacity(mut model: Model) {
        let gas = model.projects.get_mut("gas").unwrap();
        add_existing_capacity(gas, Power(100.0));
        let annual_capital_cost = gas
            .annual_capital_cost(&gas.vintages[&2020], model.parameters.interest_rate)
            .value();

        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        // Capacity built in 2020 is still online in 2030 and covers all demand
        let gas = ProjectID::from("gas");
        let builds = &formulation.builds;
        let existing = builds.build_gen[&(gas.clone(), 2020)];
        assert_approx_eq!(f64, solution.value(existing), 100.0, epsilon = TOLERANCE);
        let new = builds.build_gen[&(gas.clone(), 2030)];
        assert_approx_eq!(f64, solution.value(new), 0.0, epsilon = TOLERANCE);
        assert_approx_eq!(
            f64,
            solution.evaluate(builds.capacity(&gas, 2030).unwrap()),
            100.0,
            epsilon = TOLERANCE
        );
        for timepoint in model.timescales.iter_timepoints() {
            let dispatch = formulation.dispatch.get(&gas, &timepoint.id).unwrap();
            assert_approx_eq!(f64, solution.value(dispatch), 80.0, epsilon = TOLERANCE);
        }

        // Capital costs of the existing vintage are charged in full, with nothing for new builds
        assert_approx_eq!(
            f64,
            solution.evaluate(builds.capital_costs(&gas, 2030).unwrap()),
            100.0 * annual_capital_cost,
            epsilon = 1e-6 * annual_capital_cost
        );
    }

    #[rstest]
    fn test_storage_state_of_charge(
        mut model: Model,
        solar_project: GenerationProject,
        mut battery_project: GenerationProject,
    ) {
        // Predetermined storage must match its inputs
        battery_project.vintages[&2030].predetermined = Some(PredeterminedBuild {
            capacity: Power(20.0),
            storage_energy: Some(Energy(60.0)),
        });
        model
            .projects
            .insert(solar_project.id.clone(), solar_project);
        model
            .projects
            .insert(battery_project.id.clone(), battery_project.clone());

        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        let key = (battery_project.id.clone(), 2030);
        let storage = &formulation.storage;
        assert_approx_eq!(
            f64,
            solution.value(formulation.builds.build_gen[&key]),
            20.0,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            solution.value(storage.energy_builds[&key]),
            60.0,
            epsilon = TOLERANCE
        );

        let capacity = solution.evaluate(
            storage
                .energy_capacity(&battery_project.id, 2030)
                .unwrap(),
        );
        for timepoint in model.timescales.iter_timepoints() {
            let soc = storage.state_of_charge[&(battery_project.id.clone(), timepoint.id.clone())];
            let soc = solution.value(soc);
            assert!(soc >= -TOLERANCE);
            assert!(soc <= capacity + TOLERANCE);
        }
    }

    #[rstest]
    fn test_storage_round_trip_losses(mut model: Model, mut battery_project: GenerationProject) {
        // Without self-discharge, energy discharged over a timeseries is what was stored
        battery_project.storage.as_mut().unwrap().self_discharge_rate = Dimensionless(0.0);
        model
            .projects
            .insert(battery_project.id.clone(), battery_project.clone());

        let (formulation, solution) = optimise(&model).unwrap();
        let mut charged = 0.0;
        let mut discharged = 0.0;
        for timepoint in model.timescales.iter_timepoints() {
            let key = (battery_project.id.clone(), timepoint.id.clone());
            let hours = timepoint.duration.value();
            charged += solution.value(formulation.storage.charge[&key]) * hours;
            discharged += solution
                .value(formulation.dispatch.get(&key.0, &key.1).unwrap())
                * hours;
        }
        assert_approx_eq!(f64, discharged, 0.85 * charged, epsilon = TOLERANCE);
    }

    #[rstest]
    #[case(Power(50.0), 80.0)]
    #[case(Power(100.0), 100.0)]
    fn test_minimum_build_gate_open(
        mut model: Model,
        #[case] min_build: Power,
        #[case] expected: f64,
    ) {
        let gas = model.projects.get_mut("gas").unwrap();
        gas.build_kind = BuildKind::new(None, Some(min_build));

        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        // Capacity is built, but never less than the minimum
        let key = (ProjectID::from("gas"), 2030);
        assert_approx_eq!(
            f64,
            solution.value(formulation.builds.build_gen[&key]),
            expected,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            solution.value(formulation.builds.gates[&key]),
            1.0,
            epsilon = TOLERANCE
        );
    }

    #[rstest]
    fn test_minimum_build_gate_closed(mut model: Model) {
        // Existing capacity already meets demand, so nothing new is built
        let existing = existing_gas(&model, Power(100.0));
        model.projects.insert(existing.id.clone(), existing);
        let gas = model.projects.get_mut("gas").unwrap();
        gas.build_kind = BuildKind::new(None, Some(Power(50.0)));

        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        let key = (ProjectID::from("gas"), 2030);
        assert_approx_eq!(
            f64,
            solution.value(formulation.builds.build_gen[&key]),
            0.0,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            solution.value(formulation.builds.gates[&key]),
            0.0,
            epsilon = TOLERANCE
        );
    }

    #[rstest]
    fn test_minimum_build_exceeds_shortfall(mut model: Model) {
        // Only 20 MW is missing, but a new plant must be at least 50 MW
        let existing = existing_gas(&model, Power(60.0));
        model.projects.insert(existing.id.clone(), existing);
        let gas = model.projects.get_mut("gas").unwrap();
        gas.build_kind = BuildKind::new(None, Some(Power(50.0)));

        let (formulation, solution) = optimise(&model).unwrap();
        assert_balanced(&model, &formulation, &solution);

        let key = (ProjectID::from("gas"), 2030);
        let build = solution.value(formulation.builds.build_gen[&key]);
        assert!(build < TOLERANCE || build > 50.0 - TOLERANCE);
        assert_approx_eq!(f64, build, 50.0, epsilon = TOLERANCE);
    }

    #[rstest]
    fn test_run_writes_outputs(model: Model) {
        let dir = tempfile::tempdir().unwrap();
        run(&model, dir.path(), false).unwrap();
        assert!(dir.path().join("load_balance.csv").is_file());
        assert!(dir.path().join("gen_cap.csv").is_file());
    }
}
