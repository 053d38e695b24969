//! Run configuration.
//!
//! A [`SimulationConfig`] fully describes a Monte Carlo run: the run settings,
//! how the initial state is obtained, the litter input and the climate.
//! Each input is a tagged union so that only the fields relevant to the
//! selected mode exist. Configurations are usually written as TOML:
//!
//! ```toml
//! [settings]
//! sample_size = 100
//! simulation_length = 50
//! start_date = "2000-01-01"
//!
//! [initial]
//! mode = "zero"
//!
//! [litter]
//! mode = "constant"
//!
//! [[litter.components]]
//! mass = 2.0
//! acid = 50.0
//! water = 10.0
//! ethanol = 5.0
//! non_soluble = 35.0
//!
//! [climate]
//! mode = "constant"
//! climate = { mean_temperature = 4.0, annual_rainfall = 500.0, amplitude = 12.0 }
//! ```

use crate::climate::{ConstantClimate, MonthlyClimate, RainfallAggregation, YearlyClimate};
use crate::errors::{YassoError, YassoResult};
use crate::litter::{LitterComponent, TimedLitterComponent};
use crate::FloatValue;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Unit of the timestep length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    #[default]
    Year,
    Month,
}

impl DurationUnit {
    /// Number of calendar months in one unit
    pub fn months(&self) -> u32 {
        match self {
            DurationUnit::Year => 12,
            DurationUnit::Month => 1,
        }
    }
}

/// Settings shared by every sample of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Number of Monte Carlo samples.
    /// Sample 0 is always the maximum-likelihood pass.
    pub sample_size: usize,
    /// Length of a timestep in `duration_unit`s
    pub timestep_length: u32,
    pub duration_unit: DurationUnit,
    /// Number of timesteps to simulate
    pub simulation_length: usize,
    /// Calendar date of the start of the first timestep
    pub start_date: NaiveDate,
    /// Duration used to bring the kernel to equilibrium
    /// unit: years
    pub steady_state_duration: FloatValue,
    /// Expected width of the parameter table
    pub parameter_columns: usize,
    pub rainfall_aggregation: RainfallAggregation,
    /// Seed for reproducible runs; runs are seeded from entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            sample_size: 10,
            timestep_length: 1,
            duration_unit: DurationUnit::Year,
            simulation_length: 10,
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            steady_state_duration: 10000.0,
            parameter_columns: crate::parameters::DEFAULT_PARAMETER_COLUMNS,
            rainfall_aggregation: RainfallAggregation::default(),
            seed: None,
        }
    }
}

impl RunSettings {
    /// Number of calendar months covered by one timestep.
    ///
    /// `None` if the count does not fit in a `u32`.
    pub fn months_per_step(&self) -> Option<u32> {
        self.timestep_length.checked_mul(self.duration_unit.months())
    }

    /// Duration of one timestep in years
    pub fn step_duration(&self) -> FloatValue {
        self.timestep_length as FloatValue * self.duration_unit.months() as FloatValue / 12.0
    }
}

/// How the soil state at the start of the simulation is obtained
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InitialState {
    /// No organic matter at the start
    #[default]
    Zero,
    /// Measured initial state
    NonZero { components: Vec<LitterComponent> },
    /// Equilibrium stock under the steady-state litter and climate
    SteadyState,
}

/// Litter input to the soil
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LitterInput {
    /// The same yearly litterfall every timestep
    Constant { components: Vec<LitterComponent> },
    /// Litterfall per year, tagged with the simulation year (1 is the first)
    Yearly { records: Vec<TimedLitterComponent> },
    /// Litterfall per month, tagged with the simulation month (1 is the first)
    Monthly { records: Vec<TimedLitterComponent> },
}

impl LitterInput {
    /// Number of months a timeseries record covers, `None` for constant litter
    pub fn resolution_months(&self) -> Option<u32> {
        match self {
            LitterInput::Constant { .. } => None,
            LitterInput::Yearly { .. } => Some(12),
            LitterInput::Monthly { .. } => Some(1),
        }
    }

    pub fn is_timeseries(&self) -> bool {
        self.resolution_months().is_some()
    }

    fn components(&self) -> Vec<&LitterComponent> {
        match self {
            LitterInput::Constant { components } => components.iter().collect(),
            LitterInput::Yearly { records } | LitterInput::Monthly { records } => {
                records.iter().map(|r| &r.litter).collect()
            }
        }
    }
}

/// Climate driving the decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClimateInput {
    Constant { climate: ConstantClimate },
    /// Twelve calendar months, repeated every year
    Monthly { months: Vec<MonthlyClimate> },
    /// Yearly records used in rotation
    Yearly { years: Vec<YearlyClimate> },
}

/// Complete description of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub settings: RunSettings,
    #[serde(default)]
    pub initial: InitialState,
    pub litter: LitterInput,
    pub climate: ClimateInput,
}

impl SimulationConfig {
    pub fn new(
        settings: RunSettings,
        initial: InitialState,
        litter: LitterInput,
        climate: ClimateInput,
    ) -> Self {
        Self {
            settings,
            initial,
            litter,
            climate,
        }
    }

    pub fn from_toml_str(value: &str) -> YassoResult<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Read a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> YassoResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> YassoResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`YassoError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> YassoResult<()> {
        let invalid = |message: String| Err(YassoError::Configuration(message));
        let settings = &self.settings;

        if settings.sample_size == 0 {
            return invalid("sample_size must be at least 1".to_string());
        }
        if settings.timestep_length == 0 {
            return invalid("timestep_length must be at least 1".to_string());
        }
        let first_step_end = settings
            .months_per_step()
            .and_then(|months| settings.start_date.checked_add_months(Months::new(months)));
        if first_step_end.is_none() {
            return invalid(format!(
                "timestep_length {} ({:?}) runs past the last representable date",
                settings.timestep_length, settings.duration_unit
            ));
        }
        if settings.simulation_length == 0 {
            return invalid("simulation_length must be at least 1".to_string());
        }
        if !(settings.steady_state_duration.is_finite() && settings.steady_state_duration > 0.0)
        {
            return invalid(format!(
                "steady_state_duration must be positive, got {}",
                settings.steady_state_duration
            ));
        }
        if settings.parameter_columns == 0 {
            return invalid("parameter_columns must be at least 1".to_string());
        }

        if let InitialState::NonZero { components } = &self.initial {
            if components.is_empty() {
                return invalid("non-zero initial state has no components".to_string());
            }
            for component in components {
                component
                    .check()
                    .or_else(|e| invalid(format!("initial state: {}", e)))?;
            }
        }

        if let LitterInput::Constant { components } = &self.litter {
            if components.is_empty() {
                return invalid("constant litter input has no components".to_string());
            }
        }
        if let LitterInput::Yearly { records } | LitterInput::Monthly { records } = &self.litter {
            if records.is_empty() {
                return invalid("litter timeseries has no records".to_string());
            }
        }
        for component in self.litter.components() {
            component
                .check()
                .or_else(|e| invalid(format!("litter input: {}", e)))?;
        }

        match &self.climate {
            ClimateInput::Constant { climate } => {
                let values = [
                    climate.mean_temperature,
                    climate.annual_rainfall,
                    climate.amplitude,
                ];
                if values.iter().any(|v| !v.is_finite()) {
                    return invalid("constant climate values must be finite".to_string());
                }
            }
            ClimateInput::Monthly { months } => {
                if months.len() != 12 {
                    return invalid(format!(
                        "monthly climate needs 12 months, got {}",
                        months.len()
                    ));
                }
                for month in 1..=12 {
                    if !months.iter().any(|m| m.month == month) {
                        return invalid(format!("monthly climate is missing month {}", month));
                    }
                }
            }
            ClimateInput::Yearly { years } => {
                if years.is_empty() {
                    return invalid("yearly climate has no records".to_string());
                }
            }
        }

        Ok(())
    }
}
