//! Code for reading fuel prices from a CSV file.
use super::*;
use crate::fuel::FuelCostMap;
use crate::id::IDCollection;
use crate::load_zone::LoadZoneMap;
use crate::project::ProjectMap;
use crate::timescale::Timescales;
use crate::units::MoneyPerFuel;
use serde::Deserialize;
use std::path::Path;

const FUEL_COST_FILE_NAME: &str = "fuel_cost.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct FuelCostRaw {
    load_zone: String,
    fuel: String,
    period: u32,
    fuel_cost: f64,
}

/// Read fuel prices.
///
/// The file is optional, but every fuel-based project needs a price for its fuel in its zone in
/// every period in which it can operate.
pub fn read_fuel_costs(
    model_dir: &Path,
    load_zones: &LoadZoneMap,
    timescales: &Timescales,
    projects: &ProjectMap,
) -> Result<FuelCostMap> {
    let file_path = model_dir.join(FUEL_COST_FILE_NAME);
    read_fuel_costs_from_iter(
        read_csv_optional(&file_path)?,
        load_zones,
        timescales,
        projects,
    )
    .with_context(|| input_err_msg(&file_path))
}

fn read_fuel_costs_from_iter<I>(
    iter: I,
    load_zones: &LoadZoneMap,
    timescales: &Timescales,
    projects: &ProjectMap,
) -> Result<FuelCostMap>
where
    I: Iterator<Item = FuelCostRaw>,
{
    let mut costs = FuelCostMap::new();
    for raw in iter {
        let zone = load_zones.get_id_by_str(&raw.load_zone)?;
        ensure!(
            timescales.is_period_label(raw.period),
            "Unknown period {}",
            raw.period
        );
        check_non_negative(raw.fuel_cost, "fuel_cost")?;

        let fuel = raw.fuel.as_str().into();
        if costs
            .insert(zone, fuel, raw.period, MoneyPerFuel(raw.fuel_cost))
            .is_some()
        {
            bail!(
                "Duplicate fuel cost for {} in zone {} in period {}",
                raw.fuel,
                raw.load_zone,
                raw.period
            );
        }
    }

    for project in projects.values().filter(|project| project.uses_fuel()) {
        for build_year in project.vintages.keys() {
            for period in project.operable_periods(*build_year, timescales) {
                ensure!(
                    costs
                        .get(&project.load_zone, &project.energy_source, period)
                        .is_some(),
                    "Missing cost of fuel {} for project {} in zone {} in period {period}",
                    project.energy_source,
                    project.id,
                    project.load_zone
                );
            }
        }
    }

    Ok(costs)
}
