//! Plain-text input and result files.
//!
//! Input data is kept in a single sectioned file. Each section starts with a
//! `[Name]` header line and holds whitespace-separated numeric rows:
//!
//! ```text
//! [Initial state]
//! # mass mass_std acid acid_std water water_std ethanol ethanol_std non_soluble non_soluble_std humus humus_std size_class
//! 10 0 50 0 30 0 10 0 10 0 0 0 0
//! [Constant climate]
//! 4.0 500 12
//! ```
//!
//! Everything after a `#` is a comment. Rows of timed sections carry a leading
//! time tag. Results are written in the same whitespace-separated layout with
//! a commented header naming the columns.

use crate::climate::{ConstantClimate, MonthlyClimate, YearlyClimate};
use crate::config::{ClimateInput, InitialState, LitterInput};
use crate::errors::{YassoError, YassoResult};
use crate::litter::{parse_time_tag, LitterComponent, TimedLitterComponent};
use crate::parameters::parse_numeric_line;
use crate::results::{Co2Table, OutputChannel, StockColumn, StockTable};
use crate::summary::Summary;
use crate::FloatValue;
use log::warn;
use std::fmt::Display;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column header of the stock and change tables
pub const STOCK_HEADER: &str =
    "# sample, time step, total om, woody om, acid, water, ethanol, non soluble, humus";
/// Column header of the CO2 table
pub const CO2_HEADER: &str = "# sample, time step, CO2 yield";
/// Column header of the moment tables
pub const MOMENT_HEADER: &str = "# component, time step, mean, mode, var, skewness, kurtosis, \
                                 95% confidence lower limit, 95% upper limit";

/// Which form of a time-varying input to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Constant,
    Monthly,
    Yearly,
}

/// Sections of an input data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    InitialState,
    ConstantLitter,
    MonthlyLitter,
    YearlyLitter,
    ConstantClimate,
    MonthlyClimate,
    YearlyClimate,
}

impl Section {
    const ALL: [Section; 7] = [
        Section::InitialState,
        Section::ConstantLitter,
        Section::MonthlyLitter,
        Section::YearlyLitter,
        Section::ConstantClimate,
        Section::MonthlyClimate,
        Section::YearlyClimate,
    ];

    fn name(&self) -> &'static str {
        match self {
            Section::InitialState => "Initial state",
            Section::ConstantLitter => "Constant litterfall",
            Section::MonthlyLitter => "Monthly litterfall",
            Section::YearlyLitter => "Yearly litterfall",
            Section::ConstantClimate => "Constant climate",
            Section::MonthlyClimate => "Monthly climate",
            Section::YearlyClimate => "Yearly climate",
        }
    }

    fn from_name(name: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// Contents of an input data file.
///
/// Empty sections are left out when writing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputData {
    pub initial_state: Vec<LitterComponent>,
    pub constant_litter: Vec<LitterComponent>,
    pub monthly_litter: Vec<TimedLitterComponent>,
    pub yearly_litter: Vec<TimedLitterComponent>,
    pub constant_climate: Option<ConstantClimate>,
    pub monthly_climate: Vec<MonthlyClimate>,
    pub yearly_climate: Vec<YearlyClimate>,
}

impl InputData {
    pub fn load(path: impl AsRef<Path>) -> YassoResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse the content of an input data file.
    ///
    /// Rows outside of a known section are skipped.
    pub fn parse(content: &str) -> YassoResult<Self> {
        let mut data = InputData::default();
        let mut active: Option<Section> = None;

        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                active = Section::from_name(name.trim());
                if active.is_none() {
                    warn!("Skipping unknown section [{}]", name);
                }
                continue;
            }

            let origin = format!("input data line {}", number + 1);
            let values = parse_numeric_line(trimmed).map_err(|token| {
                YassoError::data_format(&origin, format!("'{}' is not a number", token))
            })?;
            if values.is_empty() {
                continue;
            }
            match active {
                Some(section) => data.push_row(section, &values, &origin)?,
                None => warn!("Skipping {}: not inside a known section", origin),
            }
        }
        Ok(data)
    }

    fn push_row(&mut self, section: Section, values: &[FloatValue], origin: &str) -> YassoResult<()> {
        match section {
            Section::InitialState => self
                .initial_state
                .push(LitterComponent::from_row(values, origin)?),
            Section::ConstantLitter => self
                .constant_litter
                .push(LitterComponent::from_row(values, origin)?),
            Section::MonthlyLitter => self
                .monthly_litter
                .push(TimedLitterComponent::from_row(values, origin)?),
            Section::YearlyLitter => self
                .yearly_litter
                .push(TimedLitterComponent::from_row(values, origin)?),
            Section::ConstantClimate => {
                let [mean_temperature, annual_rainfall, amplitude] = climate_row(values, origin)?;
                if self.constant_climate.is_some() {
                    warn!("Ignoring additional constant climate at {}", origin);
                } else {
                    self.constant_climate = Some(ConstantClimate {
                        mean_temperature,
                        annual_rainfall,
                        amplitude,
                    });
                }
            }
            Section::MonthlyClimate => {
                let [month, temperature, rainfall] = climate_row(values, origin)?;
                self.monthly_climate.push(MonthlyClimate {
                    month: parse_time_tag(month, origin)?,
                    temperature,
                    rainfall,
                });
            }
            Section::YearlyClimate => {
                // The time tag is optional, untagged records are numbered in order
                let (timestep, values) = match values.len() {
                    4 => (parse_time_tag(values[0], origin)?, &values[1..]),
                    _ => (self.yearly_climate.len() as u32 + 1, values),
                };
                let [mean_temperature, annual_rainfall, amplitude] = climate_row(values, origin)?;
                self.yearly_climate.push(YearlyClimate {
                    timestep,
                    mean_temperature,
                    annual_rainfall,
                    amplitude,
                });
            }
        }
        Ok(())
    }

    /// Write the data in the sectioned format
    pub fn write<W: Write>(&self, writer: &mut W) -> YassoResult<()> {
        let litter = |rows: &[LitterComponent]| -> Vec<Vec<FloatValue>> {
            rows.iter().map(LitterComponent::to_row).collect()
        };
        let timed = |rows: &[TimedLitterComponent]| -> Vec<Vec<FloatValue>> {
            rows.iter().map(TimedLitterComponent::to_row).collect()
        };

        let sections = [
            (Section::InitialState, litter(&self.initial_state)),
            (Section::ConstantLitter, litter(&self.constant_litter)),
            (Section::MonthlyLitter, timed(&self.monthly_litter)),
            (Section::YearlyLitter, timed(&self.yearly_litter)),
            (
                Section::ConstantClimate,
                self.constant_climate
                    .iter()
                    .map(|c| vec![c.mean_temperature, c.annual_rainfall, c.amplitude])
                    .collect(),
            ),
            (
                Section::MonthlyClimate,
                self.monthly_climate
                    .iter()
                    .map(|c| vec![c.month as FloatValue, c.temperature, c.rainfall])
                    .collect(),
            ),
            (
                Section::YearlyClimate,
                self.yearly_climate
                    .iter()
                    .map(|c| {
                        vec![
                            c.timestep as FloatValue,
                            c.mean_temperature,
                            c.annual_rainfall,
                            c.amplitude,
                        ]
                    })
                    .collect(),
            ),
        ];

        for (section, rows) in sections.iter().filter(|(_, rows)| !rows.is_empty()) {
            writeln!(writer, "[{}]", section.name())?;
            for row in rows {
                write_row(writer, row)?;
            }
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> YassoResult<()> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Initial state described by the `[Initial state]` section
    pub fn initial_state(&self) -> InitialState {
        if self.initial_state.is_empty() {
            InitialState::Zero
        } else {
            InitialState::NonZero {
                components: self.initial_state.clone(),
            }
        }
    }

    pub fn litter_input(&self, series: Series) -> YassoResult<LitterInput> {
        let input = match series {
            Series::Constant => LitterInput::Constant {
                components: self.constant_litter.clone(),
            },
            Series::Monthly => LitterInput::Monthly {
                records: self.monthly_litter.clone(),
            },
            Series::Yearly => LitterInput::Yearly {
                records: self.yearly_litter.clone(),
            },
        };
        let empty = match &input {
            LitterInput::Constant { components } => components.is_empty(),
            LitterInput::Monthly { records } | LitterInput::Yearly { records } => {
                records.is_empty()
            }
        };
        if empty {
            return Err(YassoError::Configuration(format!(
                "no {:?} litter in the input data",
                series
            )));
        }
        Ok(input)
    }

    pub fn climate_input(&self, series: Series) -> YassoResult<ClimateInput> {
        let missing = || {
            YassoError::Configuration(format!("no {:?} climate in the input data", series))
        };
        match series {
            Series::Constant => self
                .constant_climate
                .map(|climate| ClimateInput::Constant { climate })
                .ok_or_else(missing),
            Series::Monthly if self.monthly_climate.is_empty() => Err(missing()),
            Series::Monthly => Ok(ClimateInput::Monthly {
                months: self.monthly_climate.clone(),
            }),
            Series::Yearly if self.yearly_climate.is_empty() => Err(missing()),
            Series::Yearly => Ok(ClimateInput::Yearly {
                years: self.yearly_climate.clone(),
            }),
        }
    }
}

fn climate_row(values: &[FloatValue], origin: &str) -> YassoResult<[FloatValue; 3]> {
    <[FloatValue; 3]>::try_from(values).map_err(|_| {
        YassoError::data_format(
            origin,
            format!("climate rows should contain 3 values, got {}", values.len()),
        )
    })
}

fn write_row<W: Write, T: Display>(writer: &mut W, row: &[T]) -> YassoResult<()> {
    let line: Vec<String> = row.iter().map(|value| value.to_string()).collect();
    writeln!(writer, "{}", line.join(" "))?;
    Ok(())
}

/// Write the raw stock or change table
pub fn write_stock<W: Write>(writer: &mut W, table: &StockTable) -> YassoResult<()> {
    writeln!(writer, "{}", STOCK_HEADER)?;
    for row in table.rows() {
        write!(writer, "{} {} ", row.sample, row.timestep)?;
        let values: Vec<FloatValue> = StockColumn::ALL.iter().map(|c| row.value(*c)).collect();
        write_row(writer, &values)?;
    }
    Ok(())
}

/// Write the raw CO2 table
pub fn write_co2<W: Write>(writer: &mut W, table: &Co2Table) -> YassoResult<()> {
    writeln!(writer, "{}", CO2_HEADER)?;
    for row in table.rows() {
        writeln!(writer, "{} {} {}", row.sample, row.timestep, row.co2)?;
    }
    Ok(())
}

/// Result kinds with their own moment file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Stock,
    Change,
    Co2,
}

impl ResultKind {
    fn title(&self) -> &'static str {
        match self {
            ResultKind::Stock => "C stock",
            ResultKind::Change => "C change",
            ResultKind::Co2 => "CO2 yield",
        }
    }

    fn channels(&self) -> Vec<OutputChannel> {
        match self {
            ResultKind::Stock => StockColumn::ALL.map(OutputChannel::Stock).to_vec(),
            ResultKind::Change => StockColumn::ALL.map(OutputChannel::Change).to_vec(),
            ResultKind::Co2 => vec![OutputChannel::Co2],
        }
    }
}

/// Single word label of a channel in a moment file
fn component_label(channel: OutputChannel) -> &'static str {
    match channel {
        OutputChannel::Stock(column) | OutputChannel::Change(column) => match column {
            StockColumn::TotalOrganicMatter => "tom",
            StockColumn::Woody => "woody",
            StockColumn::Acid => "acid",
            StockColumn::Water => "water",
            StockColumn::Ethanol => "ethanol",
            StockColumn::NonSoluble => "non_soluble",
            StockColumn::Humus => "humus",
        },
        OutputChannel::Co2 => "CO2",
    }
}

/// Write the moments of every component of a result kind.
///
/// Each row is prefixed with the component label.
pub fn write_moments<W: Write>(
    writer: &mut W,
    summary: &Summary,
    kind: ResultKind,
) -> YassoResult<()> {
    writeln!(writer, "# {}", kind.title())?;
    writeln!(writer, "{}", MOMENT_HEADER)?;
    for channel in kind.channels() {
        let label = component_label(channel);
        for row in summary.get(channel).unwrap_or_default() {
            write!(writer, "{} {} ", label, row.timestep)?;
            write_row(
                writer,
                &[
                    row.mean,
                    row.mode,
                    row.variance,
                    row.skewness,
                    row.kurtosis,
                    row.lower,
                    row.upper,
                ],
            )?;
        }
    }
    Ok(())
}
