//! Code for reading periods, timeseries and timepoints from CSV files.
use super::*;
use crate::timescale::{Period, TimepointDefinition, Timescales, Timeseries};
use crate::units::Hours;
use serde::Deserialize;
use std::path::Path;

const PERIODS_FILE_NAME: &str = "periods.csv";
const TIMESERIES_FILE_NAME: &str = "timeseries.csv";
const TIMEPOINTS_FILE_NAME: &str = "timepoints.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct PeriodRaw {
    #[serde(rename = "INVESTMENT_PERIOD")]
    label: u32,
    period_start: u32,
    period_end: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
struct TimeseriesRaw {
    #[serde(rename = "TIMESERIES")]
    id: String,
    ts_period: u32,
    ts_duration_of_tp: f64,
    ts_num_tps: u32,
    ts_scale_to_period: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct TimepointRaw {
    timepoint_id: String,
    timestamp: String,
    timeseries: String,
}

/// Read the temporal index of the model.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The validated [`Timescales`] or an error naming the offending file.
pub fn read_timescales(model_dir: &Path) -> Result<Timescales> {
    let periods_path = model_dir.join(PERIODS_FILE_NAME);
    let periods = read_csv::<PeriodRaw>(&periods_path)?
        .map(|raw| Period {
            label: raw.label,
            start: raw.period_start,
            end: raw.period_end,
        })
        .collect();

    let timeseries_path = model_dir.join(TIMESERIES_FILE_NAME);
    let timeseries = read_csv::<TimeseriesRaw>(&timeseries_path)?
        .map(|raw| Timeseries {
            id: raw.id.into(),
            period: raw.ts_period,
            duration_of_tp: Hours(raw.ts_duration_of_tp),
            num_tps: raw.ts_num_tps,
            scale_to_period: raw.ts_scale_to_period,
        })
        .collect();

    let timepoints_path = model_dir.join(TIMEPOINTS_FILE_NAME);
    let timepoints = read_csv::<TimepointRaw>(&timepoints_path)?
        .map(|raw| TimepointDefinition {
            id: raw.timepoint_id.into(),
            timestamp: raw.timestamp,
            timeseries: raw.timeseries.into(),
        })
        .collect();

    Timescales::new(periods, timeseries, timepoints).with_context(|| {
        format!(
            "Invalid temporal index in {}, {} and {}",
            periods_path.display(),
            timeseries_path.display(),
            timepoints_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    fn create_timescale_files(dir: &Path, timepoints: &str) {
        write_file(
            dir,
            PERIODS_FILE_NAME,
            "INVESTMENT_PERIOD,period_start,period_end\n2020,2018,2022\n2030,2023,2037\n",
        );
        write_file(
            dir,
            TIMESERIES_FILE_NAME,
            "TIMESERIES,ts_period,ts_duration_of_tp,ts_num_tps,ts_scale_to_period\n\
             2020_all,2020,12,2,1826.25\n\
             2030_all,2030,12,2,5478.75\n",
        );
        write_file(dir, TIMEPOINTS_FILE_NAME, timepoints);
    }

    #[test]
    fn test_read_timescales() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "timepoint_id,timestamp,timeseries\n\
             1,2020_day,2020_all\n\
             2,2020_night,2020_all\n\
             3,2030_day,2030_all\n\
             4,2030_night,2030_all\n",
        );

        let timescales = read_timescales(dir.path()).unwrap();
        assert_eq!(timescales.iter_periods().count(), 2);
        assert_eq!(timescales.num_timepoints(), 4);
        assert_eq!(timescales.period(2030).unwrap().length_years(), 15);

        let tp = timescales.timepoint(&"3".into()).unwrap();
        assert_eq!(tp.timestamp, "2030_day");
        assert_eq!(tp.period, 2030);
        assert_eq!(tp.previous, "4".into());
    }

    #[test]
    fn test_read_timescales_unknown_timeseries() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "timepoint_id,timestamp,timeseries\n\
             1,2020_day,2020_all\n\
             2,2020_night,2020_all\n\
             3,2030_day,2030_all\n\
             4,2030_night,2040_all\n",
        );

        assert!(read_timescales(dir.path()).is_err());
    }
}
