//! Climate records that drive decomposition.

use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Climate that does not change over the simulation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstantClimate {
    /// Mean annual temperature
    /// unit: °C
    pub mean_temperature: FloatValue,
    /// Annual precipitation
    /// unit: mm
    pub annual_rainfall: FloatValue,
    /// Half of the difference between the warmest and coldest monthly means
    /// unit: °C
    pub amplitude: FloatValue,
}

/// Mean climate of one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClimate {
    /// Calendar month (1-12)
    pub month: u32,
    /// unit: °C
    pub temperature: FloatValue,
    /// unit: mm
    pub rainfall: FloatValue,
}

/// Climate of one year in a series of yearly records.
///
/// The series is used in order and restarts from the first record when the
/// simulation runs past its end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyClimate {
    /// Year (or timestep) the record was entered for
    #[serde(default)]
    pub timestep: u32,
    /// unit: °C
    pub mean_temperature: FloatValue,
    /// unit: mm
    pub annual_rainfall: FloatValue,
    /// unit: °C
    pub amplitude: FloatValue,
}

/// How monthly rainfall is reduced over the months a timestep spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallAggregation {
    /// Rainfall of the last spanned month divided by the number of months.
    ///
    /// Reproduces the historical outputs of the desktop application.
    #[default]
    LastMonth,
    /// Mean rainfall of the spanned months
    Mean,
}

/// Climate passed to the kernel for a single timestep
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateVector {
    pub temperature: FloatValue,
    pub rainfall: FloatValue,
    pub amplitude: FloatValue,
}

impl ClimateVector {
    pub fn new(temperature: FloatValue, rainfall: FloatValue, amplitude: FloatValue) -> Self {
        Self {
            temperature,
            rainfall,
            amplitude,
        }
    }

    /// `[temperature, rainfall, amplitude]`
    pub fn to_array(&self) -> [FloatValue; 3] {
        [self.temperature, self.rainfall, self.amplitude]
    }
}

impl From<ConstantClimate> for ClimateVector {
    fn from(value: ConstantClimate) -> Self {
        Self::new(value.mean_temperature, value.annual_rainfall, value.amplitude)
    }
}

impl From<YearlyClimate> for ClimateVector {
    fn from(value: YearlyClimate) -> Self {
        Self::new(value.mean_temperature, value.annual_rainfall, value.amplitude)
    }
}
