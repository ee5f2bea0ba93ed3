//! Unit-tagged angle values
//!
//! An [`Angle`] stores a single `f64` interpreted in one of four units:
//! turns, degrees, radians or gradians. Conversions are explicit through
//! the unit getters; arithmetic converts the right-hand operand into the
//! left-hand operand's stored unit, so the unit of an expression is always
//! the unit of its leftmost angle.
//!
//! Catalog data frequently leaves orientation angles unset; the degenerate
//! value [`Angle::NO_DATA`] marks that case and propagates through
//! arithmetic the way NaN does.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::constants::TAU;

/// The unit an [`Angle`]'s payload is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AngleUnit {
    /// Full revolutions (1 turn = 360°)
    Turns,
    /// Degrees (360 per turn)
    Degrees,
    /// Radians (2π per turn)
    Radians,
    /// Gradians (400 per turn)
    Gradians,
}

impl AngleUnit {
    /// How many of this unit make one full turn
    fn per_turn(self) -> f64 {
        match self {
            AngleUnit::Turns => 1.0,
            AngleUnit::Degrees => 360.0,
            AngleUnit::Radians => TAU,
            AngleUnit::Gradians => 400.0,
        }
    }
}

/// A scalar angle with an explicit unit tag
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Angle {
    value: f64,
    unit: AngleUnit,
}

impl Angle {
    /// Sentinel for "unset"; propagates through arithmetic like NaN
    pub const NO_DATA: Angle = Angle {
        value: f64::NAN,
        unit: AngleUnit::Radians,
    };

    /// Angle from full turns
    pub const fn from_turns(value: f64) -> Self {
        Angle {
            value,
            unit: AngleUnit::Turns,
        }
    }

    /// Angle from degrees
    pub const fn from_degrees(value: f64) -> Self {
        Angle {
            value,
            unit: AngleUnit::Degrees,
        }
    }

    /// Angle from radians
    pub const fn from_radians(value: f64) -> Self {
        Angle {
            value,
            unit: AngleUnit::Radians,
        }
    }

    /// Angle from gradians
    pub const fn from_gradians(value: f64) -> Self {
        Angle {
            value,
            unit: AngleUnit::Gradians,
        }
    }

    /// Value in full turns
    pub fn turns(self) -> f64 {
        self.value / self.unit.per_turn()
    }

    /// Value in degrees
    pub fn degrees(self) -> f64 {
        self.turns() * 360.0
    }

    /// Value in radians
    pub fn radians(self) -> f64 {
        self.turns() * TAU
    }

    /// Value in gradians
    pub fn gradians(self) -> f64 {
        self.turns() * 400.0
    }

    /// The unit the payload is stored in
    pub fn unit(self) -> AngleUnit {
        self.unit
    }

    /// Raw payload in the stored unit
    pub fn value(self) -> f64 {
        self.value
    }

    /// True if this is the unset sentinel (NaN payload)
    pub fn is_no_data(self) -> bool {
        self.value.is_nan()
    }

    /// Same angle expressed in another unit
    pub fn to_unit(self, unit: AngleUnit) -> Self {
        Angle {
            value: self.turns() * unit.per_turn(),
            unit,
        }
    }

    /// Same numeric value reduced to [0, 1) turn, kept in the stored unit
    pub fn normalized(self) -> Self {
        let full = self.unit.per_turn();
        Angle {
            value: self.value.rem_euclid(full),
            unit: self.unit,
        }
    }

    /// Reduced to (−half turn, half turn], kept in the stored unit
    pub fn normalized_signed(self) -> Self {
        let full = self.unit.per_turn();
        let mut v = self.value.rem_euclid(full);
        if v > full / 2.0 {
            v -= full;
        }
        Angle {
            value: v,
            unit: self.unit,
        }
    }

    pub fn sin(self) -> f64 {
        self.radians().sin()
    }

    pub fn cos(self) -> f64 {
        self.radians().cos()
    }

    pub fn tan(self) -> f64 {
        self.radians().tan()
    }

    pub fn abs(self) -> Self {
        Angle {
            value: self.value.abs(),
            unit: self.unit,
        }
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle {
            value: self.value + rhs.to_unit(self.unit).value,
            unit: self.unit,
        }
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle {
            value: self.value - rhs.to_unit(self.unit).value,
            unit: self.unit,
        }
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle {
            value: self.value * rhs,
            unit: self.unit,
        }
    }
}

impl Div<f64> for Angle {
    type Output = Angle;

    fn div(self, rhs: f64) -> Angle {
        Angle {
            value: self.value / rhs,
            unit: self.unit,
        }
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle {
            value: -self.value,
            unit: self.unit,
        }
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        self.turns() == other.turns()
    }
}

impl PartialOrd for Angle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.turns().partial_cmp(&other.turns())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_data() {
            return write!(f, "NoData");
        }
        let suffix = match self.unit {
            AngleUnit::Turns => " rev",
            AngleUnit::Degrees => "°",
            AngleUnit::Radians => " rad",
            AngleUnit::Gradians => " gon",
        };
        write!(f, "{}{}", self.value, suffix)
    }
}
