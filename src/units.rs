//! This module defines various unit types and their conversions.
//!
//! Values are stored as `f64`s in the units used throughout the input files: power in MW, energy
//! in MWh, durations in hours and money in the currency of the base financial year.
#![allow(missing_docs)]

use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Default,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseFloatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity, such as a fraction or an efficiency.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn powi(self, rhs: i32) -> Self {
        Self(self.0.powi(rhs))
    }

    pub fn powf(self, rhs: f64) -> Self {
        Self(self.0.powf(rhs))
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

impl FromStr for Dimensionless {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl std::fmt::Display for Dimensionless {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ApproxEq for Dimensionless {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.0.approx_eq(other.0, margin)
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

/// An overnight cost per unit of capacity, which can be spread over the years of a lifetime
pub trait CapitalCost: Copy {
    /// The cost per unit of capacity per year
    type PerYear;

    /// The annual cost, given the fraction of the overnight cost recovered each year
    fn annualise(self, recovery_factor: Dimensionless) -> Self::PerYear;
}

macro_rules! impl_capital_cost {
    ($Cost:ty, $PerYear:ty) => {
        impl CapitalCost for $Cost {
            type PerYear = $PerYear;

            fn annualise(self, recovery_factor: Dimensionless) -> $PerYear {
                <$PerYear>::new(self.0 * recovery_factor.0)
            }
        }
    };
}

// Base quantities
unit_struct!(Money);
unit_struct!(Power);
unit_struct!(Energy);
unit_struct!(Hours);
unit_struct!(Fuel);

// Derived quantities
unit_struct!(MoneyPerPower);
unit_struct!(MoneyPerPowerPerYear);
unit_struct!(MoneyPerEnergy);
unit_struct!(MoneyPerEnergyPerYear);
unit_struct!(MoneyPerFuel);
unit_struct!(FuelPerEnergy);

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(MoneyPerPower, Power, Money);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(MoneyPerFuel, Fuel, Money);
impl_mul!(FuelPerEnergy, Energy, Fuel);
impl_mul!(MoneyPerFuel, FuelPerEnergy, MoneyPerEnergy);

// Division rules
impl_div!(Energy, Hours, Power);
impl_div!(Energy, Power, Hours);
impl_div!(Money, Energy, MoneyPerEnergy);

// Annualised capital costs
impl_capital_cost!(MoneyPerPower, MoneyPerPowerPerYear);
impl_capital_cost!(MoneyPerEnergy, MoneyPerEnergyPerYear);
