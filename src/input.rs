//! Common routines for handling input data.
//!
//! Input tables are CSV files with a header row. A `.` (or an empty field) marks a missing value
//! for optional columns.
use crate::model::{Model, ModelParameters};
use crate::units::Dimensionless;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::fmt::{Debug, Display};
use std::fs;
use std::hash::Hash;
use std::path::Path;
use std::str::FromStr;

mod curtailment;
use curtailment::read_curtailment_limits;
mod fuel;
use fuel::read_fuel_costs;
mod load_zone;
use load_zone::read_load_zones;
mod project;
use project::read_generation_projects;
mod timescale;
use timescale::read_timescales;
mod transmission;
use transmission::read_transmission_lines;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file which may not exist.
///
/// A missing file is treated the same as a file with a header and no rows.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Whether the string marks a missing value
fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "."
}

/// Read an optional value, treating `.` and empty fields as missing.
///
/// Use together with `#[serde(default)]` so that the column itself may be omitted.
pub fn deserialise_optional<'de, D, T>(deserialiser: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let value: Option<String> = Option::deserialize(deserialiser)?;
    match value.as_deref().map(str::trim) {
        None => Ok(None),
        Some(s) if is_missing(s) => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a boolean flag, which may be written as `0`/`1` or `false`/`true`
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "0" | "false" => Some(false),
        "1" | "true" => Some(true),
        _ => None,
    }
}

/// Read a mandatory boolean flag
pub fn deserialise_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserialiser)?;
    parse_flag(value.trim())
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid flag value: {value}")))
}

/// Read an optional boolean flag, defaulting to `false` when missing
pub fn deserialise_optional_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserialiser)?;
    match value.as_deref().map(str::trim) {
        None => Ok(false),
        Some(s) if is_missing(s) => Ok(false),
        Some(s) => parse_flag(s)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid flag value: {s}"))),
    }
}

/// Read a f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Read an optional f64 which must be between 0 and 1 if present
pub fn deserialise_optional_proportion<'de, D>(
    deserialiser: D,
) -> Result<Option<Dimensionless>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Dimensionless> = deserialise_optional(deserialiser)?;
    if value.is_some_and(|value| !(0.0..=1.0).contains(&value.value())) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value)
}

/// Check that a value is finite and not negative
pub fn check_non_negative<T: Into<f64>>(value: T, name: &str) -> Result<()> {
    let value = value.into();
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero (got {value})"
    );

    Ok(())
}

/// Insert a key-value pair into a map, raising an error if the key already exists
pub fn try_insert<K, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> Result<()>
where
    K: Eq + Hash + Clone + Debug,
{
    let existing = map.insert(key.clone(), value).is_some();
    ensure!(!existing, "Key {key:?} already exists in the map");
    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The fully validated [`Model`] or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let timescales = read_timescales(model_dir)?;
    let load_zones = read_load_zones(model_dir, &timescales)?;
    let projects = read_generation_projects(model_dir, &load_zones, &timescales)?;
    let transmission_lines = read_transmission_lines(model_dir, &load_zones)?;
    let fuel_costs = read_fuel_costs(model_dir, &load_zones, &timescales, &projects)?;
    let curtailment_limits = read_curtailment_limits(model_dir, &timescales, &projects)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        timescales,
        load_zones,
        projects,
        transmission_lines,
        fuel_costs,
        curtailment_limits,
    })
}
