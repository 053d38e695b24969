//! Equilibrium stock used as an initial state.
//!
//! The kernel is run from an empty soil for a very long period under the
//! steady-state litter input and climate. The end states of all samples are
//! reduced to a mean and a standard deviation per size class.

use crate::aggregate::InputAggregator;
use crate::errors::YassoResult;
use crate::kernel::DecompositionKernel;
use crate::litter::{ComponentMasses, Estimate, SizeClass, SizeClassMap, SizeClassState};
use crate::resolver::Resolver;
use crate::sampler;
use crate::stats;
use log::info;
use rand::Rng;
use std::collections::BTreeMap;

use super::runtime::Simulation;

/// Steady state per size class
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyState {
    pub states: SizeClassMap,
    /// Number of samples the states were reduced from
    pub samples: usize,
}

impl<K: DecompositionKernel> Simulation<K> {
    pub(crate) fn compute_steady_state<R: Rng + ?Sized>(
        &self,
        resolver: &Resolver,
        rng: &mut R,
    ) -> YassoResult<SteadyState> {
        let settings = &self.config().settings;
        let duration = settings.steady_state_duration;
        let litter = InputAggregator::new(self.config()).steady_state_litter(resolver);
        let climate = resolver.steady_state_climate().to_array();
        info!(
            "Computing steady state for {} size classes over {} years",
            litter.len(),
            duration
        );

        let mut end_states: BTreeMap<SizeClass, Vec<ComponentMasses>> = BTreeMap::new();
        for sample in 0..settings.sample_size {
            let is_maximum_likelihood = sample == 0;
            let parameters = self.parameters().sample(is_maximum_likelihood, rng);

            for (size_class, state) in &litter {
                let input = sampler::draw(state, is_maximum_likelihood, rng);
                let end = self.kernel().decompose(
                    parameters.as_slice(),
                    duration,
                    climate,
                    [0.0; 5],
                    input.to_array(),
                    size_class.diameter(),
                )?;
                end_states
                    .entry(*size_class)
                    .or_default()
                    .push(ComponentMasses::from_array(end));
            }
        }

        let states = end_states
            .into_iter()
            .map(|(size_class, masses)| (size_class, reduce_states(&masses)))
            .collect();
        Ok(SteadyState {
            states,
            samples: settings.sample_size,
        })
    }
}

/// Mean and standard deviation of the mass and composition of end states
fn reduce_states(masses: &[ComponentMasses]) -> SizeClassState {
    let states: Vec<SizeClassState> = masses.iter().map(SizeClassState::from_masses).collect();
    let estimate = |value: fn(&SizeClassState) -> f64| {
        let values: Vec<f64> = states.iter().map(value).collect();
        Estimate::new(stats::mean(&values), stats::variance(&values).sqrt())
    };

    SizeClassState {
        mass: estimate(|s| s.mass.mean),
        acid: estimate(|s| s.acid.mean),
        water: estimate(|s| s.water.mean),
        ethanol: estimate(|s| s.ethanol.mean),
        non_soluble: estimate(|s| s.non_soluble.mean),
        humus: estimate(|s| s.humus.mean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reduce_end_states() {
        let masses = [
            ComponentMasses::from_array([2.0, 2.0, 0.0, 0.0, 0.0]),
            ComponentMasses::from_array([6.0, 2.0, 0.0, 0.0, 0.0]),
        ];
        let state = reduce_states(&masses);

        assert_relative_eq!(state.mass.mean, 6.0);
        assert_relative_eq!(state.mass.std, 8.0f64.sqrt());
        assert_relative_eq!(state.acid.mean, (50.0 + 75.0) / 2.0);
        assert_relative_eq!(state.water.mean, (50.0 + 25.0) / 2.0);
        assert_eq!(state.humus, Estimate::ZERO);
    }

    #[test]
    fn single_end_state_has_no_spread() {
        let state = reduce_states(&[ComponentMasses::from_array([1.0, 1.0, 1.0, 1.0, 0.0])]);
        assert_eq!(state.mass, Estimate::exact(4.0));
        assert_eq!(state.acid, Estimate::exact(25.0));
    }
}
