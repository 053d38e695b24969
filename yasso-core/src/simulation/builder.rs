//! Builder for assembling a simulation from its configuration.

use crate::config::{ClimateInput, InitialState, LitterInput, RunSettings, SimulationConfig};
use crate::errors::{YassoError, YassoResult};
use crate::kernel::DecompositionKernel;
use crate::parameters::ParameterTable;
use log::debug;
use std::path::PathBuf;

use super::runtime::Simulation;

#[derive(Debug, Clone)]
enum ParameterSource {
    Table(ParameterTable),
    File(PathBuf),
}

/// Build a new simulation.
///
/// The litter input, the climate and the parameter table are required.
/// Settings and the initial state fall back to their defaults.
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    settings: RunSettings,
    initial: InitialState,
    litter: Option<LitterInput>,
    climate: Option<ClimateInput>,
    parameters: Option<ParameterSource>,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration
    pub fn from_config(config: SimulationConfig) -> Self {
        Self {
            settings: config.settings,
            initial: config.initial,
            litter: Some(config.litter),
            climate: Some(config.climate),
            parameters: None,
        }
    }

    pub fn with_settings(&mut self, settings: RunSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn with_initial_state(&mut self, initial: InitialState) -> &mut Self {
        self.initial = initial;
        self
    }

    pub fn with_litter(&mut self, litter: LitterInput) -> &mut Self {
        self.litter = Some(litter);
        self
    }

    pub fn with_climate(&mut self, climate: ClimateInput) -> &mut Self {
        self.climate = Some(climate);
        self
    }

    /// Use an already loaded parameter table
    pub fn with_parameters(&mut self, parameters: ParameterTable) -> &mut Self {
        self.parameters = Some(ParameterSource::Table(parameters));
        self
    }

    /// Read the parameter table from a file when the simulation is built
    pub fn with_parameter_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.parameters = Some(ParameterSource::File(path.into()));
        self
    }

    /// Validate the configuration and create the simulation.
    ///
    /// A parameter file is read once, here, so that configuration problems surface
    /// before any sampling starts.
    ///
    /// # Errors
    ///
    /// * [`YassoError::Configuration`] if an input is missing or invalid
    /// * [`YassoError::DataFormat`] if the parameter table does not have
    ///   `parameter_columns` columns
    pub fn build<K: DecompositionKernel>(&self, kernel: K) -> YassoResult<Simulation<K>> {
        let litter = self
            .litter
            .clone()
            .ok_or_else(|| YassoError::Configuration("no litter input defined".to_string()))?;
        let climate = self
            .climate
            .clone()
            .ok_or_else(|| YassoError::Configuration("no climate defined".to_string()))?;
        let config =
            SimulationConfig::new(self.settings.clone(), self.initial.clone(), litter, climate);
        config.validate()?;

        let columns = config.settings.parameter_columns;
        let parameters = match &self.parameters {
            Some(ParameterSource::Table(table)) => table.clone(),
            Some(ParameterSource::File(path)) => ParameterTable::load(path, columns)?,
            None => {
                return Err(YassoError::Configuration(
                    "no parameter table defined".to_string(),
                ))
            }
        };
        if parameters.n_columns() != columns {
            return Err(YassoError::data_format(
                "parameter table",
                format!(
                    "expected {} parameters per row, got {}",
                    columns,
                    parameters.n_columns()
                ),
            ));
        }
        debug!(
            "Built simulation with {} parameter sets",
            parameters.n_rows()
        );

        Ok(Simulation::new(config, parameters, kernel))
    }
}
