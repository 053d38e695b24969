//! Monte Carlo simulation of soil organic matter.
//!
//! A simulation repeatedly runs the decomposition kernel over the configured
//! timesteps. Every sample starts from the initial state and follows its own
//! trajectory:
//!
//! * sample 0 is the maximum-likelihood pass. It uses the first parameter row and
//!   the mean of every input distribution.
//! * every later sample draws a parameter row, the initial state and the litter
//!   input at its first timestep and keeps that draw for the remaining timesteps.
//!   Litter given as a timeseries is drawn again at every timestep.
//!
//! Within a timestep each size class is decomposed independently. The end state
//! of a timestep is the initial state of the next.
//!
//! The per-sample results are collected in [`RawResults`](crate::results::RawResults)
//! and can be reduced into summary statistics with [`SimulationOutput::summarize`].

mod builder;
mod runtime;
mod steady_state;

#[cfg(test)]
mod tests;

pub use builder::SimulationBuilder;
pub use runtime::{Phase, ProgressInfo, SampleError, Simulation, SimulationOutput};
pub use steady_state::SteadyState;
