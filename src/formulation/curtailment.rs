//! Limits on the fraction of ideal variable generation that is curtailed.
use super::dispatch::GeneratorDispatch;
use crate::curtailment::{CurtailmentLimit, LimitType};
use crate::model::Model;
use crate::optimisation::{LinearExpr, Program, Solution};
use crate::project::EnergySourceID;
use crate::units::Energy;
use indexmap::IndexMap;

/// Ideal and actual generation of an energy source over a period
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeneration {
    /// Generation if nothing were curtailed
    pub ideal: LinearExpr,
    /// Generation dispatched
    pub actual: LinearExpr,
}

impl SourceGeneration {
    /// The ideal and actual energy generated in a solution
    pub fn evaluate(&self, solution: &Solution) -> (Energy, Energy) {
        (
            Energy(solution.evaluate(&self.ideal)),
            Energy(solution.evaluate(&self.actual)),
        )
    }
}

/// Generation of each energy source with a curtailment limit, keyed by period and source
pub type CurtailmentMap = IndexMap<(u32, EnergySourceID), SourceGeneration>;

/// Weighted ideal and actual generation of variable projects using `energy_source` in a period
fn source_generation(
    model: &Model,
    dispatch: &GeneratorDispatch,
    period: u32,
    energy_source: &EnergySourceID,
) -> SourceGeneration {
    let mut ideal = LinearExpr::new();
    let mut actual = LinearExpr::new();
    let projects = model
        .projects
        .values()
        .filter(|project| project.is_variable && project.energy_source == *energy_source);
    for project in projects {
        for id in model.timescales.timepoints_in_period(period) {
            let (Some(tp), Some(var), Some(limit)) = (
                model.timescales.timepoint(id),
                dispatch.get(&project.id, id),
                dispatch.upper_limit(&project.id, id),
            ) else {
                continue;
            };
            ideal.add_expr(limit, tp.weight);
            actual.add_term(var, tp.weight);
        }
    }

    SourceGeneration { ideal, actual }
}

/// Add a row for every curtailment limit of the model.
///
/// Curtailed energy is the difference between ideal and dispatched generation, summed over the
/// period's timepoints weighted by the hours each represents.
pub fn add_curtailment_limits(
    program: &mut Program,
    model: &Model,
    dispatch: &GeneratorDispatch,
) -> CurtailmentMap {
    let mut generation = CurtailmentMap::new();
    for CurtailmentLimit {
        period,
        energy_source,
        limit_type,
        value,
    } in &model.curtailment_limits
    {
        let source = generation
            .entry((*period, energy_source.clone()))
            .or_insert_with(|| source_generation(model, dispatch, *period, energy_source));
        if source.ideal.is_constant() {
            continue;
        }

        let curtailed = source.ideal.clone() - source.actual.clone();
        let bound = source.ideal.scaled(value.value());
        match limit_type {
            LimitType::Max => program.add_less_equal(curtailed, bound),
            LimitType::Min => program.add_greater_equal(curtailed, bound),
        };
    }

    generation
}
