//! Generation projects and their build vintages.
//!
//! A generation project is a technology at a location. Capacity is added to a project in build
//! vintages: either predetermined (historical or committed capacity) or new builds, which may
//! only occur at the start of an investment period. Storage projects are generation projects
//! with additional storage parameters; their discharge is ordinary dispatch.
use crate::finance::annual_capital_cost;
use crate::id::{define_id_getter, define_id_type};
use crate::load_zone::LoadZoneID;
use crate::timescale::{Period, TimepointID, Timescales};
use crate::units::{
    Dimensionless, Energy, FuelPerEnergy, MoneyPerEnergy, MoneyPerEnergyPerYear, MoneyPerPower,
    MoneyPerPowerPerYear, Power,
};
use indexmap::IndexMap;

define_id_type! {ProjectID}
define_id_type! {TechnologyID}
define_id_type! {EnergySourceID}

/// A map of [`GenerationProject`]s, keyed by project ID
pub type ProjectMap = IndexMap<ProjectID, GenerationProject>;

/// A technology at a location which can generate (and possibly store) electricity
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProject {
    /// Unique identifier for the project
    pub id: ProjectID,
    /// External identifier used when exporting results
    pub dbid: String,
    /// The technology class
    pub technology: TechnologyID,
    /// The fuel or other energy source used
    pub energy_source: EnergySourceID,
    /// The zone the project is connected to
    pub load_zone: LoadZoneID,
    /// Operating lifetime in years
    pub max_age: u32,
    /// A fixed retirement year overriding `max_age`
    pub retirement_year: Option<u32>,
    /// Whether output depends on an intermittent resource
    pub is_variable: bool,
    /// Whether output must stay flat at its available capacity
    pub is_baseload: bool,
    /// Whether the project is a cogeneration plant
    pub is_cogen: bool,
    /// Whether the project is distributed generation
    pub is_distributed: bool,
    /// Fraction of time offline for scheduled maintenance
    pub scheduled_outage_rate: Dimensionless,
    /// Fraction of time offline due to forced outages
    pub forced_outage_rate: Dimensionless,
    /// Fuel use per unit of energy produced, for fuel-based projects
    pub full_load_heat_rate: Option<FuelPerEnergy>,
    /// Variable operation and maintenance cost
    pub variable_om: MoneyPerEnergy,
    /// Cost of connecting capacity to the grid
    pub connect_cost_per_mw: MoneyPerPower,
    /// Maximum capacity that may be online at any time
    pub capacity_limit: Option<Power>,
    /// How new capacity may be built
    pub build_kind: BuildKind,
    /// Carbon capture parameters, for CCS-equipped projects
    pub ccs: Option<CcsParameters>,
    /// Storage parameters, for storage projects
    pub storage: Option<StorageParameters>,
    /// Build vintages, keyed by build year
    pub vintages: IndexMap<u32, BuildVintage>,
    /// Maximum capacity factor in each timepoint, for variable projects
    pub capacity_factors: IndexMap<TimepointID, Dimensionless>,
}
define_id_getter! {GenerationProject, ProjectID}

/// How new-build capacity is sized for a project
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildKind {
    /// Any non-negative amount of capacity may be built
    Continuous,
    /// Either nothing is built or at least `min_build`
    Gated {
        /// Smallest non-zero amount that may be built
        min_build: Power,
    },
    /// Capacity is built in whole units
    Discrete {
        /// The capacity of a single unit
        unit_size: Power,
        /// Smallest non-zero amount that may be built, if any
        min_build: Option<Power>,
    },
}

impl BuildKind {
    /// Determine the build kind from the optional unit size and minimum build parameters
    pub fn new(unit_size: Option<Power>, min_build: Option<Power>) -> Self {
        let min_build = min_build.filter(|min| *min > Power(0.0));
        match (unit_size, min_build) {
            (Some(unit_size), min_build) => Self::Discrete {
                unit_size,
                min_build,
            },
            (None, Some(min_build)) => Self::Gated { min_build },
            (None, None) => Self::Continuous,
        }
    }

    /// The minimum non-zero build, if there is one
    pub fn min_build(&self) -> Option<Power> {
        match self {
            Self::Continuous => None,
            Self::Gated { min_build } => Some(*min_build),
            Self::Discrete { min_build, .. } => *min_build,
        }
    }

    /// The unit size, for discretely sized projects
    pub fn unit_size(&self) -> Option<Power> {
        match self {
            Self::Discrete { unit_size, .. } => Some(*unit_size),
            _ => None,
        }
    }
}

/// Parameters for projects equipped with carbon capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcsParameters {
    /// Fraction of CO2 captured
    pub capture_efficiency: Dimensionless,
    /// Fraction of gross output consumed by the capture equipment
    pub energy_load: Dimensionless,
}

/// Parameters for storage projects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageParameters {
    /// Efficiency of charging (energy stored per unit of energy drawn from the grid)
    pub efficiency: Dimensionless,
    /// Efficiency of discharging
    pub discharge_efficiency: Dimensionless,
    /// Maximum charging rate as a multiple of discharge capacity
    pub store_to_release_ratio: Dimensionless,
    /// Fixed ratio of energy capacity (MWh) to power capacity (MW), if any
    pub energy_to_power_ratio: Option<f64>,
    /// Maximum number of full cycles per year, if limited
    pub max_cycles_per_year: Option<f64>,
    /// Fraction of stored energy lost per day
    pub self_discharge_rate: Dimensionless,
    /// Land used per MWh of energy capacity, in m²
    pub land_use_rate: f64,
    /// Minimum state of charge as a fraction of energy capacity
    pub min_soc: Dimensionless,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            efficiency: Dimensionless(1.0),
            discharge_efficiency: Dimensionless(1.0),
            store_to_release_ratio: Dimensionless(1.0),
            energy_to_power_ratio: None,
            max_cycles_per_year: None,
            self_discharge_rate: Dimensionless(0.0),
            land_use_rate: 0.0,
            min_soc: Dimensionless(0.0),
        }
    }
}

impl StorageParameters {
    /// Fraction of stored energy retained after one day
    pub fn daily_retention(&self) -> f64 {
        1.0 - self.self_discharge_rate.value()
    }
}

/// Capacity fixed by history or commitments rather than by the optimisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredeterminedBuild {
    /// Power capacity
    pub capacity: Power,
    /// Storage energy capacity, for storage projects
    pub storage_energy: Option<Energy>,
}

/// Capacity added to a project in a particular year
#[derive(Debug, Clone, PartialEq)]
pub struct BuildVintage {
    /// The year the capacity comes online (a period label for new builds)
    pub build_year: u32,
    /// The predetermined capacity, if this is not a new build
    pub predetermined: Option<PredeterminedBuild>,
    /// Overnight capital cost
    pub overnight_cost: MoneyPerPower,
    /// Fixed operation and maintenance cost
    pub fixed_om: MoneyPerPowerPerYear,
    /// Overnight cost of storage energy capacity, for storage projects
    pub storage_energy_overnight_cost: Option<MoneyPerEnergy>,
}

impl GenerationProject {
    /// Whether this project can store energy
    pub fn is_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Whether this project consumes fuel
    pub fn uses_fuel(&self) -> bool {
        self.full_load_heat_rate.is_some()
    }

    /// Fraction of installed capacity which is available on average.
    ///
    /// Scheduled maintenance of non-baseload plants is assumed to happen when they are not needed,
    /// so it only derates baseload plants.
    pub fn availability(&self) -> Dimensionless {
        let forced = Dimensionless(1.0) - self.forced_outage_rate;
        if self.is_baseload {
            forced * (Dimensionless(1.0) - self.scheduled_outage_rate)
        } else {
            forced
        }
    }

    /// Maximum capacity factor in a timepoint (always 1 for non-variable projects)
    pub fn capacity_factor(&self, timepoint: &TimepointID) -> Dimensionless {
        if self.is_variable {
            self.capacity_factors
                .get(timepoint)
                .copied()
                .unwrap_or_default()
        } else {
            Dimensionless(1.0)
        }
    }

    /// Whether capacity built in `build_year` is online during `period`.
    ///
    /// New builds come online at the start of their period; predetermined capacity comes online in
    /// its build year. Capacity counts as operable in a period if it is online at the period's
    /// midpoint and has not yet retired.
    pub fn can_operate_in_period(
        &self,
        build_year: u32,
        period: &Period,
        timescales: &Timescales,
    ) -> bool {
        let online = timescales
            .period(build_year)
            .map_or(build_year, |build_period| build_period.start);
        let retirement = self.retirement_year.unwrap_or(online + self.max_age);

        let midpoint = period.midpoint();
        online as f64 <= midpoint && midpoint < retirement as f64
    }

    /// The periods in which capacity built in `build_year` is operable
    pub fn operable_periods(
        &self,
        build_year: u32,
        timescales: &Timescales,
    ) -> impl Iterator<Item = u32> {
        timescales
            .iter_periods()
            .filter(move |period| self.can_operate_in_period(build_year, period, timescales))
            .map(|period| period.label)
    }

    /// Annualised capital cost per MW of a vintage, including grid connection
    pub fn annual_capital_cost(
        &self,
        vintage: &BuildVintage,
        interest_rate: Dimensionless,
    ) -> MoneyPerPowerPerYear {
        annual_capital_cost(
            vintage.overnight_cost + self.connect_cost_per_mw,
            self.max_age,
            interest_rate,
        )
    }

    /// Annualised capital cost per MWh of storage energy capacity of a vintage
    pub fn annual_storage_energy_cost(
        &self,
        vintage: &BuildVintage,
        interest_rate: Dimensionless,
    ) -> MoneyPerEnergyPerYear {
        let cost = vintage.storage_energy_overnight_cost.unwrap_or_default();
        annual_capital_cost(cost, self.max_age, interest_rate)
    }
}
