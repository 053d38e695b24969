//! Simulation struct and the Monte Carlo sample loop.

use crate::aggregate::InputAggregator;
use crate::config::{InitialState, SimulationConfig};
use crate::errors::{YassoError, YassoResult};
use crate::kernel::DecompositionKernel;
use crate::litter::{ComponentMasses, SizeClass, SizeClassMap, SizeClassState};
use crate::parameters::ParameterTable;
use crate::resolver::Resolver;
use crate::results::{Co2Row, RawResults};
use crate::sampler;
use crate::summary::Summary;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::ops::ControlFlow;

use super::steady_state::SteadyState;

/// Sampling phase of a sample.
///
/// Sample 0 runs entirely in [`Phase::MaximumLikelihood`].
/// Other samples start in [`Phase::Draw`] and switch to [`Phase::Replay`] once
/// their first timestep has been computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Mean values and the maximum-likelihood parameters
    MaximumLikelihood,
    /// Random draw of the parameters, initial state and litter
    Draw,
    /// Reuse of the draw made in [`Phase::Draw`]
    Replay,
}

/// Information about sampling progress.
///
/// Passed to progress callbacks before each sample is run.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Sample about to be run (0-indexed)
    pub sample: usize,
    /// Total number of samples
    pub total: usize,
    /// Number of samples aborted so far
    pub errors: usize,
}

/// A sample that was aborted before its last timestep
#[derive(Debug, Clone, PartialEq)]
pub struct SampleError {
    pub sample: usize,
    pub timestep: usize,
    pub message: String,
}

/// Everything produced by a run
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub raw: RawResults,
    /// Number of samples that were run, including aborted ones
    pub completed_samples: usize,
    /// Whether the run was stopped by the progress callback
    pub cancelled: bool,
    pub sample_errors: Vec<SampleError>,
    /// Steady state used as the initial state, if any
    pub steady_state: Option<SteadyState>,
}

impl SimulationOutput {
    /// Summary statistics of every output channel
    pub fn summarize(&self) -> Summary {
        Summary::from_results(&self.raw)
    }
}

/// A configured Monte Carlo simulation.
///
/// Created with [`SimulationBuilder`](super::SimulationBuilder).
pub struct Simulation<K> {
    config: SimulationConfig,
    parameters: ParameterTable,
    kernel: K,
}

impl<K: DecompositionKernel> Simulation<K> {
    pub(crate) fn new(config: SimulationConfig, parameters: ParameterTable, kernel: K) -> Self {
        Self {
            config,
            parameters,
            kernel,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Random number generator for a run
    pub(crate) fn rng(&self) -> StdRng {
        match self.config.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Run all samples
    pub fn run(&self) -> YassoResult<SimulationOutput> {
        self.execute(None::<fn(&ProgressInfo) -> ControlFlow<()>>)
    }

    /// Run all samples, reporting progress before each sample.
    ///
    /// Returning [`ControlFlow::Break`] from the callback stops the run. The samples
    /// completed so far are kept in the output.
    pub fn run_with_progress<F>(&self, progress_callback: F) -> YassoResult<SimulationOutput>
    where
        F: FnMut(&ProgressInfo) -> ControlFlow<()>,
    {
        self.execute(Some(progress_callback))
    }

    /// Compute the steady state used by the `steady_state` initial mode
    pub fn steady_state(&self) -> YassoResult<SteadyState> {
        let resolver = Resolver::new(&self.config);
        let mut rng = self.rng();
        self.compute_steady_state(&resolver, &mut rng)
    }

    fn execute<F>(&self, mut progress_callback: Option<F>) -> YassoResult<SimulationOutput>
    where
        F: FnMut(&ProgressInfo) -> ControlFlow<()>,
    {
        let settings = &self.config.settings;
        info!(
            "Starting run of {} samples over {} timesteps",
            settings.sample_size, settings.simulation_length
        );

        let mut rng = self.rng();
        let mut resolver = Resolver::new(&self.config);
        let aggregator = InputAggregator::new(&self.config);

        let steady_state = match self.config.initial {
            InitialState::SteadyState => Some(self.compute_steady_state(&resolver, &mut rng)?),
            InitialState::Zero | InitialState::NonZero { .. } => None,
        };
        let initial = match &steady_state {
            Some(steady_state) => steady_state.states.clone(),
            None => aggregator.initial_state(),
        };

        let mut output = SimulationOutput {
            raw: RawResults::new(),
            completed_samples: 0,
            cancelled: false,
            sample_errors: vec![],
            steady_state,
        };

        for sample in 0..settings.sample_size {
            if let Some(callback) = progress_callback.as_mut() {
                let info = ProgressInfo {
                    sample,
                    total: settings.sample_size,
                    errors: output.sample_errors.len(),
                };
                if callback(&info).is_break() {
                    warn!(
                        "Run cancelled after {} of {} samples",
                        sample, settings.sample_size
                    );
                    output.cancelled = true;
                    break;
                }
            }

            debug!("Running sample {}", sample);
            match self.run_sample(
                sample,
                &initial,
                &mut resolver,
                &aggregator,
                &mut rng,
                &mut output.raw,
            ) {
                Ok(()) => {}
                Err(YassoError::TemporalRange { timestep }) => {
                    let message = YassoError::TemporalRange { timestep }.to_string();
                    warn!("Sample {} aborted: {}", sample, message);
                    output.sample_errors.push(SampleError {
                        sample,
                        timestep,
                        message,
                    });
                }
                Err(e) => return Err(e),
            }
            output.completed_samples += 1;
        }

        info!(
            "Finished run: {} samples, {} aborted",
            output.completed_samples,
            output.sample_errors.len()
        );
        Ok(output)
    }

    /// Run one sample over every timestep, appending to `raw`.
    ///
    /// Rows are keyed by time point: the drawn initial state at 0 and the end
    /// state of timestep `i` at `i + 1`.
    fn run_sample<R: Rng + ?Sized>(
        &self,
        sample: usize,
        initial: &SizeClassMap,
        resolver: &mut Resolver,
        aggregator: &InputAggregator,
        rng: &mut R,
        raw: &mut RawResults,
    ) -> YassoResult<()> {
        let is_maximum_likelihood = sample == 0;
        let mut phase = if is_maximum_likelihood {
            Phase::MaximumLikelihood
        } else {
            Phase::Draw
        };
        let redraw_litter = self.config.litter.is_timeseries();

        let parameters = self.parameters.sample(is_maximum_likelihood, rng);
        let mut litter_draws: BTreeMap<SizeClass, ComponentMasses> = BTreeMap::new();
        let mut state = initial.clone();

        for timestep in 0..self.config.settings.simulation_length {
            let step = resolver.construct_climate(timestep)?;
            let (initial, litter) = aggregator.aggregate(timestep, &state, resolver);

            // Steps without any size class still report an empty stock
            if timestep == 0 {
                raw.stock.ensure(sample, 0);
            }
            raw.stock.ensure(sample, timestep + 1);

            let mut initial_total = 0.0;
            let mut input_total = 0.0;
            let mut end_total = 0.0;
            let mut end_states = SizeClassMap::new();

            for (size_class, initial_state) in &initial {
                let litter_state = litter.get(size_class).copied().unwrap_or_default();
                let initial_masses = sampler::draw(initial_state, phase != Phase::Draw, rng);
                let input = if redraw_litter {
                    sampler::draw(&litter_state, is_maximum_likelihood, rng)
                } else {
                    *litter_draws
                        .entry(*size_class)
                        .or_insert_with(|| sampler::draw(&litter_state, is_maximum_likelihood, rng))
                };

                if timestep == 0 {
                    raw.stock.add(sample, 0, *size_class, &initial_masses);
                }

                let end = self.kernel.decompose(
                    parameters.as_slice(),
                    step.duration,
                    step.climate.to_array(),
                    initial_masses.to_array(),
                    input.to_array(),
                    size_class.diameter(),
                )?;
                let end = ComponentMasses::from_array(end);
                raw.stock.add(sample, timestep + 1, *size_class, &end);

                initial_total += initial_masses.total();
                input_total += input.total() * step.duration;
                end_total += end.total();
                end_states.insert(*size_class, SizeClassState::from_masses(&end));
            }

            if phase == Phase::Draw {
                phase = Phase::Replay;
            }
            state = end_states;

            let change = match (
                raw.stock.get(sample, timestep + 1),
                raw.stock.get(sample, timestep),
            ) {
                (Some(current), Some(previous)) => Some(current.difference(previous)),
                _ => None,
            };
            if let Some(change) = change {
                raw.change.push(change);
            }
            raw.co2.push(Co2Row {
                sample,
                timestep: timestep + 1,
                co2: initial_total + input_total - end_total,
            });
        }

        Ok(())
    }
}
