//! Integration tests for loading the demo model.
use expanse::input::load_model;
use std::path::PathBuf;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test which attempts to load the demo model
#[test]
fn test_load_model() {
    let model = load_model(get_model_dir()).unwrap();
    assert_eq!(model.load_zones.len(), 2);
    assert_eq!(model.projects.len(), 4);
    assert_eq!(model.transmission_lines.len(), 1);
    assert_eq!(model.timescales.num_timepoints(), 8);
    assert_eq!(model.iter_storage_projects().count(), 1);
    assert_eq!(model.curtailment_limits.len(), 1);
}
