//! Code for reading load zones and their demand from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::load_zone::{LoadZone, LoadZoneID, LoadZoneMap};
use crate::timescale::Timescales;
use crate::units::Power;
use serde::Deserialize;
use std::path::Path;

const LOAD_ZONES_FILE_NAME: &str = "load_zones.csv";
const LOADS_FILE_NAME: &str = "loads.csv";
const PEAK_DEMAND_FILE_NAME: &str = "zone_coincident_peak_demand.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct LoadZoneRaw {
    #[serde(rename = "LOAD_ZONE")]
    id: String,
    #[serde(default, deserialize_with = "deserialise_optional")]
    zone_ccs_distance_km: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    zone_dbid: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct LoadRaw {
    #[serde(rename = "LOAD_ZONE")]
    load_zone: String,
    #[serde(rename = "TIMEPOINT")]
    timepoint: String,
    zone_demand_mw: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct PeakDemandRaw {
    #[serde(rename = "LOAD_ZONE")]
    load_zone: String,
    #[serde(rename = "PERIOD")]
    period: u32,
    zone_expected_coincident_peak_demand: f64,
}

/// Read load zones along with their demand in each timepoint.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `timescales` - The temporal index of the model
pub fn read_load_zones(model_dir: &Path, timescales: &Timescales) -> Result<LoadZoneMap> {
    let file_path = model_dir.join(LOAD_ZONES_FILE_NAME);
    let mut zones = read_load_zones_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(LOADS_FILE_NAME);
    read_loads_from_iter(read_csv(&file_path)?, &mut zones, timescales)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(PEAK_DEMAND_FILE_NAME);
    read_peak_demand_from_iter(read_csv_optional(&file_path)?, &mut zones, timescales)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(zones)
}

fn read_load_zones_from_iter<I>(iter: I) -> Result<LoadZoneMap>
where
    I: Iterator<Item = LoadZoneRaw>,
{
    let mut zones = LoadZoneMap::new();
    for raw in iter {
        let ccs_distance_km = raw.zone_ccs_distance_km.unwrap_or(0.0);
        check_non_negative(ccs_distance_km, "zone_ccs_distance_km")?;

        let id: LoadZoneID = raw.id.into();
        let zone = LoadZone {
            dbid: raw.zone_dbid.unwrap_or_else(|| id.to_string()),
            id: id.clone(),
            ccs_distance_km,
            demand: IndexMap::new(),
            coincident_peak_demand: IndexMap::new(),
        };
        try_insert(&mut zones, id, zone)?;
    }

    Ok(zones)
}

/// Attach demand to zones, checking that every zone has demand in every timepoint
fn read_loads_from_iter<I>(iter: I, zones: &mut LoadZoneMap, timescales: &Timescales) -> Result<()>
where
    I: Iterator<Item = LoadRaw>,
{
    let timepoints = timescales.timepoint_ids();
    for raw in iter {
        let zone_id = zones.get_id_by_str(&raw.load_zone)?;
        let timepoint = timepoints.get_id_by_str(&raw.timepoint)?;
        check_non_negative(raw.zone_demand_mw, "zone_demand_mw")?;

        let zone = &mut zones[&zone_id];
        try_insert(&mut zone.demand, timepoint, Power(raw.zone_demand_mw))
            .with_context(|| format!("Duplicate demand entry for zone {zone_id}"))?;
    }

    for zone in zones.values() {
        for timepoint in timepoints.keys() {
            ensure!(
                zone.demand.contains_key(timepoint),
                "Missing demand for zone {} in timepoint {timepoint}",
                zone.id
            );
        }
    }

    Ok(())
}

fn read_peak_demand_from_iter<I>(
    iter: I,
    zones: &mut LoadZoneMap,
    timescales: &Timescales,
) -> Result<()>
where
    I: Iterator<Item = PeakDemandRaw>,
{
    for raw in iter {
        let zone_id = zones.get_id_by_str(&raw.load_zone)?;
        ensure!(
            timescales.is_period_label(raw.period),
            "Unknown period {}",
            raw.period
        );
        check_non_negative(
            raw.zone_expected_coincident_peak_demand,
            "zone_expected_coincident_peak_demand",
        )?;

        let zone = &mut zones[&zone_id];
        try_insert(
            &mut zone.coincident_peak_demand,
            raw.period,
            Power(raw.zone_expected_coincident_peak_demand),
        )?;
    }

    Ok(())
}
