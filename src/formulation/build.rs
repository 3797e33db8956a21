//! Build decisions for generation capacity and the capacity online in each period.
use super::costs::CostRegistry;
use crate::model::Model;
use crate::optimisation::{LinearExpr, Program, Variable};
use crate::project::{BuildKind, GenerationProject, ProjectID};
use crate::units::Power;
use anyhow::Result;
use indexmap::IndexMap;

/// Name of the per-period cost component for fixed costs of generation capacity
pub const TOTAL_GEN_FIXED_COSTS: &str = "TotalGenFixedCosts";

/// Decision variables and expressions for generation capacity
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationBuilds {
    /// Capacity built, keyed by project and build year
    pub build_gen: IndexMap<(ProjectID, u32), Variable>,
    /// Binary gates for projects with a minimum build, keyed by project and build year
    pub gates: IndexMap<(ProjectID, u32), Variable>,
    /// Number of units built, for discretely sized projects
    pub units: IndexMap<(ProjectID, u32), Variable>,
    capacity: IndexMap<(ProjectID, u32), LinearExpr>,
    capital_costs: IndexMap<(ProjectID, u32), LinearExpr>,
    fixed_om_costs: IndexMap<(ProjectID, u32), LinearExpr>,
}

impl GenerationBuilds {
    /// Capacity of a project online in a period
    pub fn capacity(&self, project: &ProjectID, period: u32) -> Option<&LinearExpr> {
        self.capacity.get(&(project.clone(), period))
    }

    /// Annualised capital costs of a project's capacity online in a period
    pub fn capital_costs(&self, project: &ProjectID, period: u32) -> Option<&LinearExpr> {
        self.capital_costs.get(&(project.clone(), period))
    }

    /// Fixed O&M costs of a project's capacity online in a period
    pub fn fixed_om_costs(&self, project: &ProjectID, period: u32) -> Option<&LinearExpr> {
        self.fixed_om_costs.get(&(project.clone(), period))
    }

    /// Whether a project has any capacity which can operate in a period
    pub fn has_capacity(&self, project: &ProjectID, period: u32) -> bool {
        self.capacity(project, period)
            .is_some_and(|expr| !expr.is_constant())
    }
}

/// Add a build variable for one vintage, with the gate and unit variables its build kind needs
fn add_build_variable(
    program: &mut Program,
    project: &GenerationProject,
    predetermined: Option<Power>,
    big_m: Power,
) -> (Variable, Option<Variable>, Option<Variable>) {
    if let Some(capacity) = predetermined {
        let var = program.add_continuous(capacity.value()..=capacity.value());
        return (var, None, None);
    }

    let build = match project.capacity_limit {
        Some(limit) => program.add_continuous(0.0..=limit.value()),
        None => program.add_continuous(0.0..),
    };

    let units = if let BuildKind::Discrete { unit_size, .. } = project.build_kind {
        let units = program.add_integer(0.0..);
        program.add_equality(LinearExpr::from(build), units * unit_size.value());
        Some(units)
    } else {
        None
    };

    let gate = project.build_kind.min_build().map(|min_build| {
        let gate = program.add_binary();
        program.add_greater_equal(LinearExpr::from(build), gate * min_build.value());
        program.add_less_equal(LinearExpr::from(build), gate * big_m.value());
        gate
    });

    (build, gate, units)
}

/// Add build decisions, online capacity and fixed costs of generation projects.
///
/// Predetermined vintages are pinned to their capacity. New builds are bounded above by the
/// project's capacity limit, if any.
pub fn add_generation_builds(
    program: &mut Program,
    model: &Model,
    costs: &mut CostRegistry,
) -> Result<GenerationBuilds> {
    let parameters = &model.parameters;
    let timescales = &model.timescales;

    let mut build_gen = IndexMap::new();
    let mut gates = IndexMap::new();
    let mut units = IndexMap::new();
    for project in model.projects.values() {
        for vintage in project.vintages.values() {
            let key = (project.id.clone(), vintage.build_year);
            let predetermined = vintage.predetermined.map(|build| build.capacity);
            let (build, gate, unit_count) = add_build_variable(
                program,
                project,
                predetermined,
                parameters.max_capacity_for_binary_constraints,
            );
            build_gen.insert(key.clone(), build);
            if let Some(gate) = gate {
                gates.insert(key.clone(), gate);
            }
            if let Some(unit_count) = unit_count {
                units.insert(key, unit_count);
            }
        }
    }

    let mut capacity = IndexMap::new();
    let mut capital_costs = IndexMap::new();
    let mut fixed_om_costs = IndexMap::new();
    let mut total_fixed_costs: IndexMap<u32, LinearExpr> = timescales
        .iter_periods()
        .map(|period| (period.label, LinearExpr::new()))
        .collect();
    for project in model.projects.values() {
        for period in timescales.iter_periods() {
            let mut online = LinearExpr::new();
            let mut capital = LinearExpr::new();
            let mut fixed_om = LinearExpr::new();
            for vintage in project.vintages.values() {
                if !project.can_operate_in_period(vintage.build_year, period, timescales) {
                    continue;
                }

                let build = build_gen[&(project.id.clone(), vintage.build_year)];
                online.add_term(build, 1.0);
                capital.add_term(
                    build,
                    project
                        .annual_capital_cost(vintage, parameters.interest_rate)
                        .value(),
                );
                fixed_om.add_term(build, vintage.fixed_om.value());
            }

            // Capacity limits apply to everything online, including predetermined capacity
            let limit = project.capacity_limit.filter(|_| !online.is_constant());
            if let Some(limit) = limit {
                program.add_less_equal(online.clone(), LinearExpr::constant(limit.value()));
            }

            total_fixed_costs[&period.label] += &capital;
            total_fixed_costs[&period.label] += &fixed_om;
            let key = (project.id.clone(), period.label);
            capacity.insert(key.clone(), online);
            capital_costs.insert(key.clone(), capital);
            fixed_om_costs.insert(key, fixed_om);
        }
    }
    costs.add_period_cost(TOTAL_GEN_FIXED_COSTS, total_fixed_costs)?;

    Ok(GenerationBuilds {
        build_gen,
        gates,
        units,
        capacity,
        capital_costs,
        fixed_om_costs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{gas_project, model};
    use crate::optimisation::VariableKind;
    use crate::project::PredeterminedBuild;
    use rstest::rstest;

    fn builds_for(mut model: Model, project: GenerationProject) -> (Program, GenerationBuilds) {
        model.projects = [(project.id.clone(), project)].into_iter().collect();
        let mut program = Program::new();
        let mut costs = CostRegistry::new();
        let builds = add_generation_builds(&mut program, &model, &mut costs).unwrap();
        (program, builds)
    }

    #[rstest]
    fn test_new_build_is_free(model: Model, gas_project: GenerationProject) {
        let (program, builds) = builds_for(model, gas_project);
        let build = builds.build_gen[&(ProjectID::from("gas"), 2030)];
        let column = &program.columns()[build.index()];
        assert_eq!((column.lower, column.upper), (0.0, f64::INFINITY));
        assert!(builds.gates.is_empty());
        assert!(builds.units.is_empty());
        assert_eq!(
            builds.capacity(&"gas".into(), 2030).unwrap().terms().count(),
            1
        );
    }

    #[rstest]
    fn test_predetermined_build_is_pinned(model: Model, mut gas_project: GenerationProject) {
        let mut vintage = gas_project.vintages[&2030].clone();
        vintage.build_year = 2020;
        vintage.predetermined = Some(PredeterminedBuild {
            capacity: Power(50.0),
            storage_energy: None,
        });
        gas_project.vintages.insert(2020, vintage);

        let (program, builds) = builds_for(model, gas_project);
        let build = builds.build_gen[&(ProjectID::from("gas"), 2020)];
        let column = &program.columns()[build.index()];
        assert_eq!((column.lower, column.upper), (50.0, 50.0));
        assert_eq!(
            builds.capacity(&"gas".into(), 2030).unwrap().terms().count(),
            2
        );
    }

    #[rstest]
    fn test_capacity_limit(model: Model, mut gas_project: GenerationProject) {
        gas_project.capacity_limit = Some(Power(30.0));
        let (program, builds) = builds_for(model, gas_project);
        let build = builds.build_gen[&(ProjectID::from("gas"), 2030)];
        assert_eq!(program.columns()[build.index()].upper, 30.0);

        // One row limiting capacity online in the period
        assert_eq!(program.num_rows(), 1);
        assert_eq!(program.rows()[0].upper, 30.0);
    }

    #[rstest]
    fn test_gated_build(model: Model, mut gas_project: GenerationProject) {
        gas_project.build_kind = BuildKind::Gated {
            min_build: Power(20.0),
        };
        let (program, builds) = builds_for(model, gas_project);
        let gate = builds.gates[&(ProjectID::from("gas"), 2030)];
        assert_eq!(program.columns()[gate.index()].kind, VariableKind::Binary);
        assert_eq!(program.num_rows(), 2);
    }

    #[rstest]
    fn test_discrete_build(model: Model, mut gas_project: GenerationProject) {
        gas_project.build_kind = BuildKind::Discrete {
            unit_size: Power(40.0),
            min_build: None,
        };
        let (program, builds) = builds_for(model, gas_project);
        let units = builds.units[&(ProjectID::from("gas"), 2030)];
        assert_eq!(program.columns()[units.index()].kind, VariableKind::Integer);
        assert!(builds.gates.is_empty());
        assert_eq!(program.num_rows(), 1);
    }
}
