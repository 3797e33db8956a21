//! Code for reading transmission lines from a CSV file.
use super::*;
use crate::id::IDCollection;
use crate::load_zone::LoadZoneMap;
use crate::transmission::{TransmissionLine, TransmissionLineMap};
use crate::units::{Dimensionless, Power};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const TRANSMISSION_LINES_FILE_NAME: &str = "transmission_lines.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct TransmissionLineRaw {
    #[serde(rename = "TRANSMISSION_LINE")]
    id: String,
    trans_lz1: String,
    trans_lz2: String,
    trans_length_km: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    trans_efficiency: Dimensionless,
    existing_trans_cap: f64,
    #[serde(default, deserialize_with = "deserialise_optional")]
    trans_dbid: Option<String>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    trans_derating_factor: Option<Dimensionless>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    trans_terrain_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional")]
    trans_new_build_allowed: Option<String>,
}

/// Read transmission lines. The file is optional, as a single-zone model needs no transmission.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `load_zones` - Load zones of the model
pub fn read_transmission_lines(
    model_dir: &Path,
    load_zones: &LoadZoneMap,
) -> Result<TransmissionLineMap> {
    let file_path = model_dir.join(TRANSMISSION_LINES_FILE_NAME);
    read_transmission_lines_from_iter(read_csv_optional(&file_path)?, load_zones)
        .with_context(|| input_err_msg(&file_path))
}

fn read_transmission_lines_from_iter<I>(
    iter: I,
    load_zones: &LoadZoneMap,
) -> Result<TransmissionLineMap>
where
    I: Iterator<Item = TransmissionLineRaw>,
{
    let mut lines = TransmissionLineMap::new();
    let mut zone_pairs = HashSet::new();
    for raw in iter {
        let id = raw.id.as_str();
        let zone1 = load_zones
            .get_id_by_str(&raw.trans_lz1)
            .with_context(|| format!("Invalid load zone for transmission line {id}"))?;
        let zone2 = load_zones
            .get_id_by_str(&raw.trans_lz2)
            .with_context(|| format!("Invalid load zone for transmission line {id}"))?;
        ensure!(
            zone1 != zone2,
            "Transmission line {id} connects load zone {zone1} to itself"
        );

        // Lines are undirected, so the same pair in either order is a duplicate
        let pair = if zone1 < zone2 {
            (zone1.clone(), zone2.clone())
        } else {
            (zone2.clone(), zone1.clone())
        };
        ensure!(
            zone_pairs.insert(pair),
            "More than one transmission line connects {zone1} and {zone2}"
        );

        check_non_negative(raw.trans_length_km, "trans_length_km")?;
        check_non_negative(raw.existing_trans_cap, "existing_trans_cap")?;
        let terrain_multiplier = raw.trans_terrain_multiplier.unwrap_or(1.0);
        check_non_negative(terrain_multiplier, "trans_terrain_multiplier")?;
        let new_build_allowed = match raw.trans_new_build_allowed.as_deref() {
            None => true,
            Some(value) => parse_flag(value)
                .with_context(|| format!("Invalid value for trans_new_build_allowed: {value}"))?,
        };

        let line = TransmissionLine {
            id: id.into(),
            dbid: raw.trans_dbid.clone().unwrap_or_else(|| raw.id.clone()),
            zone1,
            zone2,
            length_km: raw.trans_length_km,
            efficiency: raw.trans_efficiency,
            existing_capacity: Power(raw.existing_trans_cap),
            derating_factor: raw.trans_derating_factor.unwrap_or(Dimensionless(1.0)),
            terrain_multiplier,
            new_build_allowed,
        };
        try_insert(&mut lines, line.id.clone(), line)?;
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::load_zone::LoadZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn two_zones() -> LoadZoneMap {
        ["north", "south"]
            .into_iter()
            .map(|id| {
                let zone = LoadZone {
                    id: id.into(),
                    ccs_distance_km: 0.0,
                    dbid: id.into(),
                    demand: IndexMap::new(),
                    coincident_peak_demand: IndexMap::new(),
                };
                (zone.id.clone(), zone)
            })
            .collect()
    }

    fn raw(id: &str, zone1: &str, zone2: &str) -> TransmissionLineRaw {
        TransmissionLineRaw {
            id: id.into(),
            trans_lz1: zone1.into(),
            trans_lz2: zone2.into(),
            trans_length_km: 300.0,
            trans_efficiency: Dimensionless(0.95),
            existing_trans_cap: 200.0,
            trans_dbid: None,
            trans_derating_factor: None,
            trans_terrain_multiplier: None,
            trans_new_build_allowed: None,
        }
    }

    #[rstest]
    fn test_read_transmission_lines(two_zones: LoadZoneMap) {
        let lines =
            read_transmission_lines_from_iter([raw("N-S", "north", "south")].into_iter(), &two_zones)
                .unwrap();
        let line = &lines["N-S"];
        assert_eq!(line.dbid, "N-S");
        assert_eq!(line.existing_capacity, Power(200.0));
        assert_eq!(line.derating_factor, Dimensionless(1.0));
        assert_eq!(line.terrain_multiplier, 1.0);
        assert!(line.new_build_allowed);
    }

    #[rstest]
    fn test_new_build_flag(two_zones: LoadZoneMap) {
        let mut line = raw("N-S", "north", "south");
        line.trans_new_build_allowed = Some("0".into());
        let lines = read_transmission_lines_from_iter([line].into_iter(), &two_zones).unwrap();
        assert!(!lines["N-S"].new_build_allowed);
    }

    #[rstest]
    fn test_self_loop(two_zones: LoadZoneMap) {
        assert_error!(
            read_transmission_lines_from_iter([raw("N-N", "north", "north")].into_iter(), &two_zones),
            "Transmission line N-N connects load zone north to itself"
        );
    }

    #[rstest]
    fn test_duplicate_pair(two_zones: LoadZoneMap) {
        assert_error!(
            read_transmission_lines_from_iter(
                [raw("N-S", "north", "south"), raw("S-N", "south", "north")].into_iter(),
                &two_zones
            ),
            "More than one transmission line connects south and north"
        );
    }

    #[rstest]
    fn test_unknown_zone(two_zones: LoadZoneMap) {
        assert_error!(
            read_transmission_lines_from_iter([raw("N-E", "north", "east")].into_iter(), &two_zones),
            "Invalid load zone for transmission line N-E"
        );
    }

    #[rstest]
    fn test_negative_capacity(two_zones: LoadZoneMap) {
        let mut line = raw("N-S", "north", "south");
        line.existing_trans_cap = -1.0;
        assert!(read_transmission_lines_from_iter([line].into_iter(), &two_zones).is_err());
    }
}
