//! Limits on the curtailment of variable energy sources.
use crate::project::EnergySourceID;
use crate::units::{Dimensionless, Energy};
use serde_string_enum::DeserializeLabeledStringEnum;

/// Whether a curtailment limit is a floor or a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum)]
pub enum LimitType {
    /// At least this fraction of ideal generation must be curtailed
    #[string = "min"]
    Min,
    /// At most this fraction of ideal generation may be curtailed
    #[string = "max"]
    Max,
}

/// A limit on the fraction of ideal generation of an energy source that is curtailed in a period
#[derive(Debug, Clone, PartialEq)]
pub struct CurtailmentLimit {
    /// The period the limit applies to
    pub period: u32,
    /// The variable energy source the limit applies to
    pub energy_source: EnergySourceID,
    /// Whether the limit is a floor or a ceiling
    pub limit_type: LimitType,
    /// The limit, as a fraction of ideal generation
    pub value: Dimensionless,
}

/// The fraction of ideal generation that was curtailed (zero if there was no ideal generation)
pub fn curtailment_ratio(ideal: Energy, actual: Energy) -> Dimensionless {
    if ideal <= Energy(0.0) {
        return Dimensionless(0.0);
    }

    Dimensionless((ideal - actual).value() / ideal.value())
}
