//! The temporal index: investment periods, timeseries and timepoints.
//!
//! Every other part of the model indexes against the structures defined here. Timepoints are
//! grouped into timeseries, which in turn belong to a single period. Within a timeseries, the
//! timepoint before the first one is the last one, so that recursive relations such as storage
//! state of charge wrap around rather than crossing into a different timeseries.
use crate::id::define_id_type;
use crate::units::Hours;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

define_id_type! {TimeseriesID}
define_id_type! {TimepointID}

/// A multi-year investment period, identified by its label (e.g. `2030`)
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// The label used to identify the period
    pub label: u32,
    /// First year of the period
    pub start: u32,
    /// Last year of the period (inclusive)
    pub end: u32,
}

impl Period {
    /// Number of years covered by the period
    pub fn length_years(&self) -> u32 {
        self.end - self.start + 1
    }

    /// The year used to decide whether capacity is online during the period
    pub fn midpoint(&self) -> f64 {
        self.start as f64 + 0.5 * self.length_years() as f64
    }
}

/// A run of consecutive timepoints sampled from a single period
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    /// Unique identifier
    pub id: TimeseriesID,
    /// The period this timeseries belongs to
    pub period: u32,
    /// Duration of each timepoint in hours
    pub duration_of_tp: Hours,
    /// Expected number of timepoints
    pub num_tps: u32,
    /// How many times this timeseries recurs within the period
    pub scale_to_period: f64,
}

/// The finest unit of time for dispatch decisions
#[derive(Debug, Clone, PartialEq)]
pub struct Timepoint {
    /// Unique identifier
    pub id: TimepointID,
    /// A human-readable label for the timepoint
    pub timestamp: String,
    /// The timeseries this timepoint belongs to
    pub timeseries: TimeseriesID,
    /// The period this timepoint belongs to
    pub period: u32,
    /// Duration of the timepoint in hours
    pub duration: Hours,
    /// Number of hours of the whole period that this timepoint represents
    pub weight: f64,
    /// Number of hours of an average year in the period that this timepoint represents
    pub weight_in_year: f64,
    /// The preceding timepoint in the same timeseries (wrapping around)
    pub previous: TimepointID,
}

/// The input form of a timepoint, before derived quantities are calculated
#[derive(Debug, Clone, PartialEq)]
pub struct TimepointDefinition {
    /// Unique identifier
    pub id: TimepointID,
    /// A human-readable label for the timepoint
    pub timestamp: String,
    /// The timeseries this timepoint belongs to
    pub timeseries: TimeseriesID,
}

/// The complete temporal index of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Timescales {
    periods: IndexMap<u32, Period>,
    timepoints: IndexMap<TimepointID, Timepoint>,
    timepoints_in_period: IndexMap<u32, Vec<TimepointID>>,
}

impl Timescales {
    /// Build the temporal index, validating the relationships between its parts.
    ///
    /// # Arguments
    ///
    /// * `periods` - Investment periods, in chronological order
    /// * `timeseries` - Timeseries definitions
    /// * `timepoints` - Timepoints, listed so that the members of each timeseries are contiguous
    ///   and in order
    pub fn new(
        periods: Vec<Period>,
        timeseries: Vec<Timeseries>,
        timepoints: Vec<TimepointDefinition>,
    ) -> Result<Self> {
        let periods = build_periods(periods)?;
        let timeseries = build_timeseries(timeseries, &periods)?;

        // Group timepoints by timeseries, checking that each series is contiguous
        let mut members: IndexMap<TimeseriesID, Vec<TimepointDefinition>> = IndexMap::new();
        let mut last_series: Option<TimeseriesID> = None;
        for tp in timepoints {
            let series = timeseries
                .get(&tp.timeseries)
                .with_context(|| format!("Timepoint {} has unknown timeseries", tp.id))?;
            if last_series.as_ref() != Some(&series.id) {
                ensure!(
                    !members.contains_key(&series.id),
                    "Timepoints of timeseries {} are not contiguous",
                    series.id
                );
            }
            last_series = Some(series.id.clone());
            members.entry(series.id.clone()).or_default().push(tp);
        }

        let mut tps = IndexMap::new();
        let mut timepoints_in_period: IndexMap<u32, Vec<TimepointID>> =
            periods.keys().map(|label| (*label, Vec::new())).collect();
        for series in timeseries.values() {
            let defs = members
                .get(&series.id)
                .with_context(|| format!("Timeseries {} has no timepoints", series.id))?;
            ensure!(
                defs.len() == series.num_tps as usize,
                "Timeseries {} should have {} timepoints but {} were found",
                series.id,
                series.num_tps,
                defs.len()
            );

            let period = &periods[&series.period];
            let weight = series.duration_of_tp.value() * series.scale_to_period;
            for (idx, def) in defs.iter().enumerate() {
                let previous = if idx == 0 { defs.len() - 1 } else { idx - 1 };
                let timepoint = Timepoint {
                    id: def.id.clone(),
                    timestamp: def.timestamp.clone(),
                    timeseries: series.id.clone(),
                    period: series.period,
                    duration: series.duration_of_tp,
                    weight,
                    weight_in_year: weight / period.length_years() as f64,
                    previous: defs[previous].id.clone(),
                };
                ensure!(
                    tps.insert(def.id.clone(), timepoint).is_none(),
                    "Duplicate timepoint ID {}",
                    def.id
                );
                timepoints_in_period[&series.period].push(def.id.clone());
            }
        }

        for (label, tps) in &timepoints_in_period {
            ensure!(!tps.is_empty(), "Period {label} has no timepoints");
        }

        Ok(Self {
            periods,
            timepoints: tps,
            timepoints_in_period,
        })
    }

    /// Iterate over the periods in chronological order
    pub fn iter_periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    /// Get a period by its label
    pub fn period(&self, label: u32) -> Option<&Period> {
        self.periods.get(&label)
    }

    /// Whether `year` is the label of one of the periods
    pub fn is_period_label(&self, year: u32) -> bool {
        self.periods.contains_key(&year)
    }

    /// Iterate over all timepoints, grouped by timeseries
    pub fn iter_timepoints(&self) -> impl Iterator<Item = &Timepoint> {
        self.timepoints.values()
    }

    /// Get a timepoint by its ID
    pub fn timepoint(&self, id: &TimepointID) -> Option<&Timepoint> {
        self.timepoints.get(id)
    }

    /// The IDs of the timepoints belonging to a period
    pub fn timepoints_in_period(&self, period: u32) -> &[TimepointID] {
        self.timepoints_in_period
            .get(&period)
            .map_or(&[], Vec::as_slice)
    }

    /// The timepoint before `id` in its timeseries
    pub fn previous(&self, id: &TimepointID) -> Option<&TimepointID> {
        self.timepoints.get(id).map(|tp| &tp.previous)
    }

    /// The IDs of all timepoints, for resolving the IDs used in input files
    pub fn timepoint_ids(&self) -> &IndexMap<TimepointID, Timepoint> {
        &self.timepoints
    }

    /// The number of timepoints
    pub fn num_timepoints(&self) -> usize {
        self.timepoints.len()
    }
}

/// Check that periods are well-formed, ordered and do not overlap
fn build_periods(periods: Vec<Period>) -> Result<IndexMap<u32, Period>> {
    ensure!(!periods.is_empty(), "At least one period must be defined");

    let mut map = IndexMap::new();
    let mut last_end: Option<u32> = None;
    for period in periods {
        ensure!(
            period.start <= period.end,
            "Period {} ends before it starts",
            period.label
        );
        if let Some(last_end) = last_end {
            ensure!(
                period.start > last_end,
                "Period {} overlaps or precedes the period before it",
                period.label
            );
        }
        last_end = Some(period.end);

        ensure!(
            map.insert(period.label, period.clone()).is_none(),
            "Duplicate period {}",
            period.label
        );
    }

    Ok(map)
}

/// Check timeseries parameters and that they refer to known periods
fn build_timeseries(
    timeseries: Vec<Timeseries>,
    periods: &IndexMap<u32, Period>,
) -> Result<IndexMap<TimeseriesID, Timeseries>> {
    let mut map = IndexMap::new();
    for series in timeseries {
        ensure!(
            periods.contains_key(&series.period),
            "Timeseries {} refers to unknown period {}",
            series.id,
            series.period
        );
        ensure!(
            series.duration_of_tp.is_finite() && series.duration_of_tp > Hours(0.0),
            "Timeseries {} must have a positive timepoint duration",
            series.id
        );
        ensure!(
            series.scale_to_period.is_finite() && series.scale_to_period > 0.0,
            "Timeseries {} must have a positive scaling factor",
            series.id
        );
        ensure!(
            series.num_tps > 0,
            "Timeseries {} must have at least one timepoint",
            series.id
        );

        let id = series.id.clone();
        ensure!(
            map.insert(id.clone(), series).is_none(),
            "Duplicate timeseries {id}"
        );
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, timescales};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn period(label: u32, start: u32, end: u32) -> Period {
        Period { label, start, end }
    }

    fn series(id: &str, period: u32, num_tps: u32) -> Timeseries {
        Timeseries {
            id: id.into(),
            period,
            duration_of_tp: Hours(6.0),
            num_tps,
            scale_to_period: 10.0,
        }
    }

    fn tp(id: &str, series: &str) -> TimepointDefinition {
        TimepointDefinition {
            id: id.into(),
            timestamp: format!("ts_{id}"),
            timeseries: series.into(),
        }
    }

    #[test]
    fn test_period() {
        let p = period(2030, 2025, 2034);
        assert_eq!(p.length_years(), 10);
        assert_approx_eq!(f64, p.midpoint(), 2030.0);
    }

    #[rstest]
    fn test_timescales_derived_values(timescales: Timescales) {
        assert_eq!(timescales.num_timepoints(), 4);
        let ids = timescales.timepoints_in_period(2030);
        assert_eq!(ids.len(), 4);

        let first = timescales.timepoint(&ids[0]).unwrap();
        assert_eq!(first.duration, Hours(6.0));
        assert_approx_eq!(f64, first.weight, 6.0 * 3652.5);
        assert_approx_eq!(f64, first.weight_in_year, 6.0 * 365.25);
    }

    #[rstest]
    fn test_previous_wraps_within_timeseries(timescales: Timescales) {
        let ids = timescales.timepoints_in_period(2030).to_vec();
        assert_eq!(timescales.previous(&ids[0]), Some(&ids[3]));
        assert_eq!(timescales.previous(&ids[1]), Some(&ids[0]));
        assert_eq!(timescales.previous(&ids[3]), Some(&ids[2]));
    }

    #[test]
    fn test_previous_does_not_cross_timeseries() {
        let timescales = Timescales::new(
            vec![period(2030, 2025, 2034)],
            vec![series("a", 2030, 2), series("b", 2030, 1)],
            vec![tp("1", "a"), tp("2", "a"), tp("3", "b")],
        )
        .unwrap();

        assert_eq!(timescales.previous(&"1".into()), Some(&"2".into()));
        assert_eq!(timescales.previous(&"3".into()), Some(&"3".into()));
    }

    #[test]
    fn test_timepoints_in_period() {
        let timescales = Timescales::new(
            vec![period(2020, 2018, 2022), period(2030, 2023, 2032)],
            vec![series("a", 2020, 1), series("b", 2030, 2)],
            vec![tp("1", "a"), tp("2", "b"), tp("3", "b")],
        )
        .unwrap();

        assert_eq!(timescales.timepoints_in_period(2020), &["1".into()]);
        assert_eq!(
            timescales.timepoints_in_period(2030),
            &["2".into(), "3".into()]
        );
        assert!(timescales.timepoints_in_period(2040).is_empty());
        assert!(timescales.is_period_label(2020));
        assert!(!timescales.is_period_label(2021));
    }

    #[test]
    fn test_timescales_bad_periods() {
        assert_error!(
            Timescales::new(vec![period(2030, 2034, 2025)], vec![], vec![]),
            "Period 2030 ends before it starts"
        );
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034), period(2040, 2030, 2044)],
                vec![],
                vec![]
            ),
            "Period 2040 overlaps or precedes the period before it"
        );
    }

    #[test]
    fn test_timescales_non_contiguous() {
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034)],
                vec![series("a", 2030, 2), series("b", 2030, 1)],
                vec![tp("1", "a"), tp("3", "b"), tp("2", "a")],
            ),
            "Timepoints of timeseries a are not contiguous"
        );
    }

    #[test]
    fn test_timescales_wrong_count() {
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034)],
                vec![series("a", 2030, 3)],
                vec![tp("1", "a"), tp("2", "a")],
            ),
            "Timeseries a should have 3 timepoints but 2 were found"
        );
    }

    #[test]
    fn test_timescales_unknown_references() {
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034)],
                vec![series("a", 2040, 1)],
                vec![tp("1", "a")],
            ),
            "Timeseries a refers to unknown period 2040"
        );
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034)],
                vec![series("a", 2030, 1)],
                vec![tp("1", "b")],
            ),
            "Timepoint 1 has unknown timeseries"
        );
    }

    #[test]
    fn test_timescales_empty_period() {
        assert_error!(
            Timescales::new(
                vec![period(2030, 2025, 2034), period(2040, 2035, 2044)],
                vec![series("a", 2030, 1)],
                vec![tp("1", "a")],
            ),
            "Period 2040 has no timepoints"
        );
    }
}
