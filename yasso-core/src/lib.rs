//! Monte Carlo driver for the Yasso soil carbon model.
//!
//! A run draws model parameters, initial state and litter input from their
//! distributions, steps a [`kernel::DecompositionKernel`] through time under the
//! configured climate and collects the stock, change and CO2 yield of every
//! sample. The raw results are reduced to summary statistics per timestep.
//!
//! Runs are configured with a [`config::SimulationConfig`] and started from a
//! [`simulation::SimulationBuilder`].

pub mod aggregate;
pub mod climate;
pub mod config;
pub mod example_kernels;
pub mod io;
pub mod kernel;
pub mod litter;
pub mod parameters;
pub mod resolver;
pub mod results;
pub mod sampler;
pub mod simulation;
pub mod stats;
pub mod summary;

pub mod errors;

pub type FloatValue = f64;

pub use config::SimulationConfig;
pub use errors::{YassoError, YassoResult};
pub use kernel::DecompositionKernel;
pub use simulation::{Simulation, SimulationBuilder, SimulationOutput};
