//! Alert vocabulary shared by the bus codec, the mode machine and the
//! plant-profile check.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Mode;
use crate::config::PlantProfile;
use crate::sensors::TelemetrySample;
use crate::sensors::water_level::WaterLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Moisture,
    Luminosity,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Min,
    Max,
}

/// A metric that crossed one of its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    pub metric: Metric,
    pub bound: Bound,
}

impl Alert {
    pub const fn new(metric: Metric, bound: Bound) -> Self {
        Self { metric, bound }
    }

    /// Mode this alert puts the device in. An overfull tank has no mode.
    pub const fn mode(self) -> Option<Mode> {
        match (self.metric, self.bound) {
            (Metric::Temperature, Bound::Max) => Some(Mode::Hot),
            (Metric::Temperature, Bound::Min) => Some(Mode::Cold),
            (Metric::Moisture, Bound::Max) => Some(Mode::Drowned),
            (Metric::Moisture, Bound::Min) => Some(Mode::Thirsty),
            (Metric::Luminosity, Bound::Min) => Some(Mode::TooDark),
            (Metric::Luminosity, Bound::Max) => Some(Mode::TooBright),
            (Metric::Water, Bound::Min) => Some(Mode::OutOfWater),
            (Metric::Water, Bound::Max) => None,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.metric.as_str(), self.bound.as_str())
    }
}

impl Metric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Moisture => "moisture",
            Self::Luminosity => "luminosity",
            Self::Water => "water",
        }
    }
}

impl Bound {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownName;

impl FromStr for Metric {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, UnknownName> {
        match s {
            "temperature" => Ok(Self::Temperature),
            "moisture" => Ok(Self::Moisture),
            "luminosity" => Ok(Self::Luminosity),
            "water" => Ok(Self::Water),
            _ => Err(UnknownName),
        }
    }
}

impl FromStr for Bound {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, UnknownName> {
        match s {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(UnknownName),
        }
    }
}

/// First bound `sample` breaks, checked in a fixed order: tank, moisture,
/// temperature, light.
pub fn first_breach(profile: &PlantProfile, sample: &TelemetrySample) -> Option<Alert> {
    if sample.water == WaterLevel::Dry {
        return Some(Alert::new(Metric::Water, Bound::Min));
    }
    let checks = [
        (Metric::Moisture, sample.moisture, profile.moisture_min, profile.moisture_max),
        (
            Metric::Temperature,
            sample.temperature,
            profile.temperature_min,
            profile.temperature_max,
        ),
        (
            Metric::Luminosity,
            sample.luminosity,
            profile.luminosity_min,
            profile.luminosity_max,
        ),
    ];
    checks.into_iter().find_map(|(metric, value, min, max)| {
        if value < min {
            Some(Alert::new(metric, Bound::Min))
        } else if value > max {
            Some(Alert::new(metric, Bound::Max))
        } else {
            None
        }
    })
}
