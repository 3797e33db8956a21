//! Build and solve zonal capacity expansion models of power systems.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod curtailment;
pub mod finance;
pub mod formulation;
pub mod fuel;
pub mod id;
pub mod input;
pub mod load_zone;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod project;
pub mod settings;
pub mod simulation;
pub mod timescale;
pub mod transmission;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the folder in which program configuration files are kept
pub fn get_expanse_config_dir() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("expanse");
    dir
}
