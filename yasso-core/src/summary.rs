//! Reduction of raw sample results into per-timestep statistics.

use crate::results::{OutputChannel, RawResults};
use crate::stats;
use crate::FloatValue;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Statistics of one output channel at one timestep, over all samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub timestep: usize,
    pub mean: FloatValue,
    pub mode: FloatValue,
    pub variance: FloatValue,
    pub skewness: FloatValue,
    pub kurtosis: FloatValue,
    /// `mean - 2 sd`, an approximate 95% lower bound
    pub lower: FloatValue,
    /// `mean + 2 sd`, an approximate 95% upper bound
    pub upper: FloatValue,
}

impl SummaryRow {
    /// Summarise the values observed at `timestep`
    pub fn from_values(timestep: usize, values: &[FloatValue]) -> Self {
        let mean = stats::mean(values);
        let variance = stats::variance(values);
        let spread = 2.0 * variance.max(0.0).sqrt();

        Self {
            timestep,
            mean,
            mode: stats::mode(values),
            variance,
            skewness: stats::skewness(values),
            kurtosis: stats::kurtosis(values),
            lower: mean - spread,
            upper: mean + spread,
        }
    }

    /// `[timestep, mean, mode, var, skewness, kurtosis, lower, upper]`
    pub fn to_array(&self) -> [FloatValue; 8] {
        [
            self.timestep as FloatValue,
            self.mean,
            self.mode,
            self.variance,
            self.skewness,
            self.kurtosis,
            self.lower,
            self.upper,
        ]
    }
}

/// Group `(timestep, value)` observations by timestep and summarise each group.
///
/// Rows are ordered by timestep.
pub fn reduce(observations: &[(usize, FloatValue)]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<usize, Vec<FloatValue>> = BTreeMap::new();
    for (timestep, value) in observations {
        groups.entry(*timestep).or_default().push(*value);
    }
    groups
        .iter()
        .map(|(timestep, values)| SummaryRow::from_values(*timestep, values))
        .collect()
}

/// Summary tables of every output channel
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    tables: Vec<(OutputChannel, Vec<SummaryRow>)>,
}

impl Summary {
    pub fn from_results(raw: &RawResults) -> Self {
        let tables = OutputChannel::all()
            .into_iter()
            .map(|channel| (channel, reduce(&raw.observations(channel))))
            .collect();
        Self { tables }
    }

    pub fn get(&self, channel: OutputChannel) -> Option<&[SummaryRow]> {
        self.tables
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, rows)| rows.as_slice())
    }

    pub fn tables(&self) -> &[(OutputChannel, Vec<SummaryRow>)] {
        &self.tables
    }

    /// A channel as a `(timesteps, 8)` array, see [`SummaryRow::to_array`]
    pub fn to_array(&self, channel: OutputChannel) -> Array2<FloatValue> {
        let rows = self.get(channel).unwrap_or_default();
        let mut array = Array2::zeros((rows.len(), 8));
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.to_array().into_iter().enumerate() {
                array[[i, j]] = value;
            }
        }
        array
    }
}
