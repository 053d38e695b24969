//! Interface to the decomposition kernel.
//!
//! The kernel advances the five organic matter compartments of one size class
//! over a period of time. The driver owns the conversion between its own
//! representations and the flat vectors the kernel works on:
//!
//! * `climate`: `[temperature, rainfall, amplitude]`
//! * `initial`, `input` and the returned end state: `[acid, water, ethanol, non_soluble, humus]`
//!
//! `input` is a rate per year; `duration` is given in years.

use crate::errors::YassoResult;
use crate::FloatValue;

pub trait DecompositionKernel {
    /// Compute the state at the end of `duration` years.
    ///
    /// # Arguments
    ///
    /// * `parameters` - One row of the calibrated parameter table
    /// * `duration` - Length of the period in years
    /// * `climate` - Climate over the period
    /// * `initial` - Compartment masses at the start of the period
    /// * `input` - Litter input per year
    /// * `size_class` - Litter diameter in cm, 0 for non-woody litter
    fn decompose(
        &self,
        parameters: &[FloatValue],
        duration: FloatValue,
        climate: [FloatValue; 3],
        initial: [FloatValue; 5],
        input: [FloatValue; 5],
        size_class: FloatValue,
    ) -> YassoResult<[FloatValue; 5]>;
}

impl<F> DecompositionKernel for F
where
    F: Fn(&[FloatValue], FloatValue, [FloatValue; 3], [FloatValue; 5], [FloatValue; 5], FloatValue) -> [FloatValue; 5],
{
    fn decompose(
        &self,
        parameters: &[FloatValue],
        duration: FloatValue,
        climate: [FloatValue; 3],
        initial: [FloatValue; 5],
        input: [FloatValue; 5],
        size_class: FloatValue,
    ) -> YassoResult<[FloatValue; 5]> {
        Ok(self(parameters, duration, climate, initial, input, size_class))
    }
}
