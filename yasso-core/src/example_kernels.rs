//! Simple kernels for exercising the driver without the native decomposition model.

use crate::errors::YassoResult;
use crate::kernel::DecompositionKernel;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Keeps a fixed share of the initial state and of the litter input.
///
/// `end = initial * retention + input * uptake`, componentwise.
/// Parameters, duration, climate and size class are ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearKernel {
    pub retention: FloatValue,
    pub uptake: FloatValue,
}

impl Default for LinearKernel {
    fn default() -> Self {
        Self {
            retention: 0.9,
            uptake: 0.5,
        }
    }
}

impl DecompositionKernel for LinearKernel {
    fn decompose(
        &self,
        _parameters: &[FloatValue],
        _duration: FloatValue,
        _climate: [FloatValue; 3],
        initial: [FloatValue; 5],
        input: [FloatValue; 5],
        _size_class: FloatValue,
    ) -> YassoResult<[FloatValue; 5]> {
        let mut end = [0.0; 5];
        for (i, value) in end.iter_mut().enumerate() {
            *value = initial[i] * self.retention + input[i] * self.uptake;
        }
        Ok(end)
    }
}

/// First order decay towards the equilibrium `input / rate`.
///
/// The decay rate of each compartment is `parameters[i]`, scaled by the
/// temperature (`1 + 0.1 * temperature`). Beyond `converged_after` years the
/// equilibrium is returned exactly, so the end state no longer depends on the
/// duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquilibriumKernel {
    /// unit: years
    pub converged_after: FloatValue,
}

impl Default for EquilibriumKernel {
    fn default() -> Self {
        Self {
            converged_after: 500.0,
        }
    }
}

impl DecompositionKernel for EquilibriumKernel {
    fn decompose(
        &self,
        parameters: &[FloatValue],
        duration: FloatValue,
        climate: [FloatValue; 3],
        initial: [FloatValue; 5],
        input: [FloatValue; 5],
        _size_class: FloatValue,
    ) -> YassoResult<[FloatValue; 5]> {
        let modifier = (1.0 + 0.1 * climate[0]).max(0.01);
        let mut end = [0.0; 5];
        for (i, value) in end.iter_mut().enumerate() {
            let rate = parameters.get(i).copied().unwrap_or(1.0).abs().max(1e-6) * modifier;
            let equilibrium = input[i] / rate;
            *value = if duration >= self.converged_after {
                equilibrium
            } else {
                equilibrium + (initial[i] - equilibrium) * (-rate * duration).exp()
            };
        }
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_kernel() {
        let end = LinearKernel::default()
            .decompose(&[], 1.0, [0.0; 3], [10.0; 5], [100.0, 0.0, 0.0, 0.0, 0.0], 0.0)
            .unwrap();
        assert_eq!(end, [59.0, 9.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn equilibrium_kernel_converges() {
        let kernel = EquilibriumKernel::default();
        let parameters = [0.5, 0.5, 0.5, 0.5, 0.5];
        let input = [1.0, 2.0, 0.0, 0.0, 0.0];

        let long = kernel
            .decompose(&parameters, 1000.0, [0.0; 3], [0.0; 5], input, 0.0)
            .unwrap();
        let longer = kernel
            .decompose(&parameters, 100000.0, [0.0; 3], [0.0; 5], input, 0.0)
            .unwrap();
        assert_eq!(long, longer);
        assert_relative_eq!(long[0], 2.0);

        let short = kernel
            .decompose(&parameters, 1.0, [0.0; 3], [0.0; 5], input, 0.0)
            .unwrap();
        assert!(short[0] < long[0]);
    }
}
