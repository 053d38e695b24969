//! Scenario tests for the simulation driver.

#[cfg(test)]
mod sampling;

use crate::climate::ConstantClimate;
use crate::config::{ClimateInput, InitialState, LitterInput, RunSettings};
use crate::litter::LitterComponent;
use crate::parameters::ParameterTable;
use crate::simulation::SimulationBuilder;
use crate::FloatValue;
use ndarray::Array2;

/// Litter with a given mass and all of it acid soluble
pub(crate) fn acid_litter(mass: FloatValue, size_class: FloatValue) -> LitterComponent {
    LitterComponent {
        mass,
        acid: 100.0,
        size_class,
        ..Default::default()
    }
}

/// Parameter table of `rows` rows of 5 columns; row `i` is filled with `0.1 * (i + 1)`
pub(crate) fn parameter_table(rows: usize) -> ParameterTable {
    let values = Array2::from_shape_fn((rows, 5), |(i, _)| 0.1 * (i + 1) as FloatValue);
    ParameterTable::from_array(values).unwrap()
}

pub(crate) fn constant_climate() -> ClimateInput {
    ClimateInput::Constant {
        climate: ConstantClimate {
            mean_temperature: 4.0,
            annual_rainfall: 500.0,
            amplitude: 12.0,
        },
    }
}

/// One sample of three yearly timesteps with 100 units of acid litter per year
pub(crate) fn builder() -> SimulationBuilder {
    let settings = RunSettings {
        sample_size: 1,
        simulation_length: 3,
        parameter_columns: 5,
        seed: Some(1),
        ..Default::default()
    };

    let mut builder = SimulationBuilder::new();
    builder
        .with_settings(settings)
        .with_initial_state(InitialState::Zero)
        .with_litter(LitterInput::Constant {
            components: vec![acid_litter(100.0, 0.0)],
        })
        .with_climate(constant_climate())
        .with_parameters(parameter_table(10));
    builder
}
