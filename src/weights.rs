use std::fmt;

use serde::Serialize;

/// Convex weights over the reach, air, light and outlet ratings.
///
/// Only [`WeightVector::normalize`] constructs one, so the components are
/// always non-negative and sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightVector {
    reach: f64,
    air: f64,
    light: f64,
    outlet: f64,
}

impl WeightVector {
    pub const UNIFORM: Self = Self {
        reach: 0.25,
        air: 0.25,
        light: 0.25,
        outlet: 0.25,
    };

    /// Clamp each slider to `[0, 1]` and rescale to a unit sum.
    ///
    /// Falls back to [`WeightVector::UNIFORM`] when nothing positive remains.
    pub fn normalize(reach: f64, air: f64, light: f64, outlet: f64) -> Self {
        let clamped = [reach, air, light, outlet].map(clamp_unit);
        let sum: f64 = clamped.iter().sum();
        if sum <= 0.0 {
            return Self::UNIFORM;
        }
        let [reach, air, light, outlet] = clamped.map(|w| w / sum);
        Self {
            reach,
            air,
            light,
            outlet,
        }
    }

    pub fn reach(&self) -> f64 {
        self.reach
    }

    pub fn air(&self) -> f64 {
        self.air
    }

    pub fn light(&self) -> f64 {
        self.light
    }

    pub fn outlet(&self) -> f64 {
        self.outlet
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.reach, self.air, self.light, self.outlet]
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::UNIFORM
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} / {:.2} / {:.2} / {:.2}",
            self.reach, self.air, self.light, self.outlet
        )
    }
}

fn clamp_unit(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}
