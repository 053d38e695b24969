//! Merging litter records into one state per size class.
//!
//! Records sharing a size class are combined by mass: the combined mass is the
//! (weighted) sum of the masses, each fraction and its standard deviation is
//! the mass-weighted mean `Σ(mass · fraction) / Σ mass`.

use crate::config::{InitialState, LitterInput, SimulationConfig};
use crate::litter::{Estimate, LitterComponent, SizeClass, SizeClassMap, SizeClassState};
use crate::resolver::Resolver;
use crate::FloatValue;
use std::collections::BTreeMap;

#[derive(Default)]
struct Accumulator {
    mass: FloatValue,
    mass_variance: FloatValue,
    fractions: [Estimate; 5],
}

impl Accumulator {
    fn add(&mut self, litter: &LitterComponent, weight: FloatValue) {
        let state = litter.state();
        let mass = weight * state.mass.mean;
        self.mass += mass;
        self.mass_variance += (weight * state.mass.std).powi(2);

        let fractions = [
            state.acid,
            state.water,
            state.ethanol,
            state.non_soluble,
            state.humus,
        ];
        for (acc, fraction) in self.fractions.iter_mut().zip(fractions) {
            acc.mean += mass * fraction.mean;
            acc.std += mass * fraction.std;
        }
    }

    fn finish(self) -> SizeClassState {
        let share = |sum: Estimate| {
            if self.mass == 0.0 {
                Estimate::ZERO
            } else {
                Estimate::new(sum.mean / self.mass, sum.std / self.mass)
            }
        };
        let [acid, water, ethanol, non_soluble, humus] = self.fractions.map(share);

        SizeClassState {
            mass: Estimate::new(self.mass, self.mass_variance.sqrt()),
            acid,
            water,
            ethanol,
            non_soluble,
            humus,
        }
    }
}

/// Combine weighted litter records into one state per size class.
///
/// Each record's mass (and its standard deviation) is multiplied by its weight.
/// Standard deviations of the masses are combined as independent errors.
pub fn aggregate<'a, I>(records: I) -> SizeClassMap
where
    I: IntoIterator<Item = (&'a LitterComponent, FloatValue)>,
{
    let mut classes: BTreeMap<SizeClass, Accumulator> = BTreeMap::new();
    for (litter, weight) in records {
        classes
            .entry(litter.size_class())
            .or_default()
            .add(litter, weight);
    }
    classes
        .into_iter()
        .map(|(size_class, acc)| (size_class, acc.finish()))
        .collect()
}

/// Make sure both maps contain the same size classes.
///
/// Classes missing from either map are inserted with an empty state.
pub fn fill(initial: &mut SizeClassMap, litter: &mut SizeClassMap) {
    for size_class in initial.keys() {
        litter.entry(*size_class).or_insert(SizeClassState::ZERO);
    }
    for size_class in litter.keys() {
        initial.entry(*size_class).or_insert(SizeClassState::ZERO);
    }
}

/// Resolves the initial state and litter input of each timestep
pub struct InputAggregator<'a> {
    config: &'a SimulationConfig,
}

impl<'a> InputAggregator<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Initial state given as measurements, or an empty map for the other modes
    pub fn initial_state(&self) -> SizeClassMap {
        match &self.config.initial {
            InitialState::NonZero { components } => aggregate(components.iter().map(|c| (c, 1.0))),
            InitialState::Zero | InitialState::SteadyState => SizeClassMap::new(),
        }
    }

    /// Litter input of `timestep` as a yearly rate.
    ///
    /// Timeseries records are pro-rated by the share of each record that falls
    /// inside the timestep, then scaled from the amount delivered during the
    /// timestep to a rate per year.
    pub fn litter(&self, timestep: usize, resolver: &mut Resolver) -> SizeClassMap {
        match &self.config.litter {
            LitterInput::Constant { components } => aggregate(components.iter().map(|c| (c, 1.0))),
            LitterInput::Yearly { records } | LitterInput::Monthly { records } => {
                let duration = resolver.duration();
                let shares = resolver.map_timestep_to_index(timestep);
                aggregate(shares.iter().filter_map(|share| {
                    records
                        .get(share.index)
                        .map(|record| (&record.litter, share.weight / duration))
                }))
            }
        }
    }

    /// Litter input used for the steady state, as a yearly rate
    pub fn steady_state_litter(&self, resolver: &Resolver) -> SizeClassMap {
        match &self.config.litter {
            LitterInput::Constant { components } => aggregate(components.iter().map(|c| (c, 1.0))),
            LitterInput::Yearly { records } | LitterInput::Monthly { records } => {
                let records_per_year =
                    12.0 / self.config.litter.resolution_months().unwrap_or(12) as FloatValue;
                let indices = resolver.steady_state_records();
                aggregate(
                    indices
                        .iter()
                        .filter_map(|i| records.get(*i))
                        .map(|record| (&record.litter, records_per_year)),
                )
            }
        }
    }

    /// Initial state and litter input of `timestep` with matching size classes.
    ///
    /// `initial` is the state at the start of the timestep: the configured initial
    /// state at timestep 0 and the end state of the previous timestep afterwards.
    pub fn aggregate(
        &self,
        timestep: usize,
        initial: &SizeClassMap,
        resolver: &mut Resolver,
    ) -> (SizeClassMap, SizeClassMap) {
        let mut initial = initial.clone();
        let mut litter = self.litter(timestep, resolver);
        fill(&mut initial, &mut litter);
        (initial, litter)
    }
}
