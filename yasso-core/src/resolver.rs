//! Calendar and climate resolution for simulation timesteps.
//!
//! Timestep `i` covers the calendar window `[now(i), now(i + 1))`.
//! The [`Resolver`] reduces the configured climate to the three values the
//! kernel needs for such a window and maps timesteps onto the records of a
//! litter timeseries.
//!
//! A resolver is created once per run. Its yearly-climate rotation cursor is
//! carried from one sample to the next. The cursor only advances past the
//! years a timestep covers completely, so a partially covered final year is
//! read again by the next timestep.

use crate::climate::{ClimateVector, MonthlyClimate, RainfallAggregation, YearlyClimate};
use crate::config::{ClimateInput, LitterInput, RunSettings, SimulationConfig};
use crate::errors::{YassoError, YassoResult};
use crate::FloatValue;
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashMap;

/// Share of a litter record delivered during a timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordShare {
    /// Index into the litter timeseries
    pub index: usize,
    /// Fraction of the record's mass falling inside the timestep
    pub weight: FloatValue,
}

/// Climate resolved for a single timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepClimate {
    /// Calendar month (1-12) the timestep starts in
    pub start_month: u32,
    /// unit: years
    pub duration: FloatValue,
    pub climate: ClimateVector,
}

pub struct Resolver<'a> {
    settings: &'a RunSettings,
    climate: &'a ClimateInput,
    litter: &'a LitterInput,
    /// Monthly climate ordered January to December
    months: Vec<MonthlyClimate>,
    yearly_cursor: usize,
    timemap: HashMap<usize, Vec<RecordShare>>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        let mut months = match &config.climate {
            ClimateInput::Monthly { months } => months.clone(),
            _ => vec![],
        };
        months.sort_by_key(|m| m.month);

        Self {
            settings: &config.settings,
            climate: &config.climate,
            litter: &config.litter,
            months,
            yearly_cursor: 0,
            timemap: HashMap::new(),
        }
    }

    /// Calendar date at the start of `timestep`.
    ///
    /// Returns `None` when the date cannot be represented.
    pub fn now(&self, timestep: usize) -> Option<NaiveDate> {
        let months = u32::try_from(timestep)
            .ok()?
            .checked_mul(self.settings.months_per_step()?)?;
        self.settings
            .start_date
            .checked_add_months(Months::new(months))
    }

    /// Duration of a timestep in years
    pub fn duration(&self) -> FloatValue {
        self.settings.step_duration()
    }

    /// Index of the yearly climate record the next timestep starts with
    pub fn yearly_cursor(&self) -> usize {
        self.yearly_cursor
    }

    /// Resolve the climate of `timestep`.
    ///
    /// For yearly climate this advances the rotation cursor, so every timestep
    /// must be resolved exactly once and in order.
    ///
    /// # Errors
    ///
    /// [`YassoError::TemporalRange`] if the timestep window cannot be placed on the calendar.
    pub fn construct_climate(&mut self, timestep: usize) -> YassoResult<StepClimate> {
        let start = self
            .now(timestep)
            .ok_or(YassoError::TemporalRange { timestep })?;
        self.now(timestep + 1)
            .ok_or(YassoError::TemporalRange { timestep })?;

        let start_month = start.month();
        let span = self
            .settings
            .months_per_step()
            .ok_or(YassoError::TemporalRange { timestep })?;
        let climate = match self.climate {
            ClimateInput::Constant { climate } => ClimateVector::from(*climate),
            ClimateInput::Monthly { .. } => self.monthly_climate(start_month, span),
            ClimateInput::Yearly { years } => {
                let climate = self.yearly_climate(years, start_month, span);
                let advance = ((start_month - 1 + span) / 12) as usize;
                self.yearly_cursor = (self.yearly_cursor + advance)
                    .checked_rem(years.len())
                    .unwrap_or_default();
                climate
            }
        };

        Ok(StepClimate {
            start_month,
            duration: self.duration(),
            climate,
        })
    }

    /// Climate used for the steady-state computation.
    ///
    /// Monthly climate is averaged over the whole year and yearly climate over all
    /// records. The rotation cursor is not touched.
    pub fn steady_state_climate(&self) -> ClimateVector {
        match self.climate {
            ClimateInput::Constant { climate } => ClimateVector::from(*climate),
            ClimateInput::Monthly { .. } => self.monthly_climate(1, 12),
            ClimateInput::Yearly { years } => {
                let n = years.len().max(1) as FloatValue;
                let sum = years.iter().fold([0.0; 3], |acc, year| {
                    let values = ClimateVector::from(*year).to_array();
                    [acc[0] + values[0], acc[1] + values[1], acc[2] + values[2]]
                });
                ClimateVector::new(sum[0] / n, sum[1] / n, sum[2] / n)
            }
        }
    }

    /// Average the monthly climate over `span` months starting at `start_month`,
    /// wrapping from December to January.
    fn monthly_climate(&self, start_month: u32, span: u32) -> ClimateVector {
        let indices: Vec<usize> = if span >= 12 {
            (0..12).collect()
        } else {
            (0..span)
                .map(|offset| ((start_month - 1 + offset) % 12) as usize)
                .collect()
        };
        let spanned: Vec<&MonthlyClimate> =
            indices.iter().filter_map(|i| self.months.get(*i)).collect();
        if spanned.is_empty() {
            return ClimateVector::default();
        }
        let n = spanned.len() as FloatValue;

        let temperature = spanned.iter().map(|m| m.temperature).sum::<FloatValue>() / n;
        let max = spanned
            .iter()
            .map(|m| m.temperature)
            .fold(FloatValue::NEG_INFINITY, FloatValue::max);
        let min = spanned
            .iter()
            .map(|m| m.temperature)
            .fold(FloatValue::INFINITY, FloatValue::min);
        let rainfall = match self.settings.rainfall_aggregation {
            RainfallAggregation::LastMonth => {
                spanned.last().map(|m| m.rainfall).unwrap_or_default() / n
            }
            RainfallAggregation::Mean => spanned.iter().map(|m| m.rainfall).sum::<FloatValue>() / n,
        };

        ClimateVector::new(temperature, rainfall, (max - min) / 2.0)
    }

    /// Weighted average of the yearly records spanned by a timestep.
    ///
    /// The span is split at year boundaries. Each piece is weighted by the fraction of
    /// the year it covers and uses the next record in the rotation.
    fn yearly_climate(&self, years: &[YearlyClimate], start_month: u32, span: u32) -> ClimateVector {
        if years.is_empty() {
            return ClimateVector::default();
        }

        let mut segments = Vec::new();
        let first = (13 - start_month).min(span);
        segments.push(first);
        let mut remaining = span - first;
        while remaining > 0 {
            let segment = remaining.min(12);
            segments.push(segment);
            remaining -= segment;
        }

        let mut total_weight = 0.0;
        let mut sum = [0.0; 3];
        for (offset, months) in segments.iter().enumerate() {
            let weight = *months as FloatValue / 12.0;
            let record = years[(self.yearly_cursor + offset) % years.len()];
            let values = ClimateVector::from(record).to_array();
            for (acc, value) in sum.iter_mut().zip(values) {
                *acc += weight * value;
            }
            total_weight += weight;
        }

        ClimateVector::new(
            sum[0] / total_weight,
            sum[1] / total_weight,
            sum[2] / total_weight,
        )
    }

    /// Litter records delivered during `timestep` together with their share.
    ///
    /// A record tagged `t` with a resolution of `r` months covers the months
    /// `[(t - 1) r, t r)` counted from the start of the simulation. Its share is the
    /// fraction of those months that fall inside the timestep. Records tagged 0 only
    /// describe the steady state and are never delivered.
    ///
    /// Results are cached per timestep.
    pub fn map_timestep_to_index(&mut self, timestep: usize) -> &[RecordShare] {
        let litter = self.litter;
        let span = self.settings.months_per_step().unwrap_or_default() as usize;

        self.timemap.entry(timestep).or_insert_with(|| {
            let (records, resolution) = match litter {
                LitterInput::Constant { .. } => return vec![],
                LitterInput::Yearly { records } => (records, 12usize),
                LitterInput::Monthly { records } => (records, 1usize),
            };
            let window_start = timestep * span;
            let window_end = window_start + span;

            records
                .iter()
                .enumerate()
                .filter(|(_, record)| record.timestep > 0)
                .filter_map(|(index, record)| {
                    let record_start = (record.timestep as usize - 1) * resolution;
                    let record_end = record_start + resolution;
                    let overlap = window_end
                        .min(record_end)
                        .saturating_sub(window_start.max(record_start));
                    (overlap > 0).then_some(RecordShare {
                        index,
                        weight: overlap as FloatValue / resolution as FloatValue,
                    })
                })
                .collect()
        })
    }

    /// Indices of the litter records describing the steady state.
    ///
    /// These are the records tagged 0, or those tagged 1 if there are none tagged 0.
    pub fn steady_state_records(&self) -> Vec<usize> {
        let records = match self.litter {
            LitterInput::Constant { .. } => return vec![],
            LitterInput::Yearly { records } | LitterInput::Monthly { records } => records,
        };
        let tagged = |tag: u32| -> Vec<usize> {
            records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.timestep == tag)
                .map(|(i, _)| i)
                .collect()
        };
        let initial = tagged(0);
        if initial.is_empty() {
            tagged(1)
        } else {
            initial
        }
    }
}
