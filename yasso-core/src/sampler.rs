//! Drawing concrete component masses from a [`SizeClassState`].
//!
//! The total mass is drawn first. Acid, ethanol, non-soluble and humus masses
//! are their (drawn) percentage of the total; water receives the remainder so
//! that the five components always add up to the drawn total.

use crate::litter::{ComponentMasses, Estimate, SizeClassState};
use crate::FloatValue;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Draw a single value from an estimate.
///
/// The mean is returned when `use_mean` is set or the estimate has no spread.
pub fn draw_value<R: Rng + ?Sized>(estimate: &Estimate, use_mean: bool, rng: &mut R) -> FloatValue {
    if use_mean || !(estimate.std > 0.0) {
        return estimate.mean;
    }
    match Normal::new(estimate.mean, estimate.std) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => estimate.mean,
    }
}

/// Draw the component masses of a size class
pub fn draw<R: Rng + ?Sized>(
    state: &SizeClassState,
    use_mean: bool,
    rng: &mut R,
) -> ComponentMasses {
    let mass = draw_value(&state.mass, use_mean, rng);
    let [acid, ethanol, non_soluble, humus] =
        [&state.acid, &state.ethanol, &state.non_soluble, &state.humus]
            .map(|fraction| draw_value(fraction, use_mean, rng) / 100.0 * mass);

    ComponentMasses {
        acid,
        water: mass - acid - ethanol - non_soluble - humus,
        ethanol,
        non_soluble,
        humus,
    }
}
