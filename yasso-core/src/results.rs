//! Raw per-sample results of a run.
//!
//! Three tables are accumulated while sampling:
//!
//! * stock: organic matter at each time point
//! * change: the difference in stock from the previous time point
//! * CO2 yield: carbon released during each timestep
//!
//! Each row is keyed by `(sample, timestep)`. Stock rows are additive: the
//! results of every size class of a sample and time point are summed into one row.

use crate::litter::{ComponentMasses, SizeClass};
use crate::FloatValue;
use ndarray::Array2;
use std::collections::HashMap;
use std::fmt;

/// Columns of the stock and change tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockColumn {
    TotalOrganicMatter,
    Woody,
    Acid,
    Water,
    Ethanol,
    NonSoluble,
    Humus,
}

impl StockColumn {
    pub const ALL: [StockColumn; 7] = [
        StockColumn::TotalOrganicMatter,
        StockColumn::Woody,
        StockColumn::Acid,
        StockColumn::Water,
        StockColumn::Ethanol,
        StockColumn::NonSoluble,
        StockColumn::Humus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StockColumn::TotalOrganicMatter => "total om",
            StockColumn::Woody => "woody om",
            StockColumn::Acid => "acid",
            StockColumn::Water => "water",
            StockColumn::Ethanol => "ethanol",
            StockColumn::NonSoluble => "non soluble",
            StockColumn::Humus => "humus",
        }
    }
}

/// One of the 15 summarised outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    Stock(StockColumn),
    Change(StockColumn),
    Co2,
}

impl OutputChannel {
    /// All channels: the stock columns, the change columns, then CO2 yield
    pub fn all() -> Vec<OutputChannel> {
        StockColumn::ALL
            .iter()
            .map(|c| OutputChannel::Stock(*c))
            .chain(StockColumn::ALL.iter().map(|c| OutputChannel::Change(*c)))
            .chain(std::iter::once(OutputChannel::Co2))
            .collect()
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputChannel::Stock(column) => write!(f, "stock {}", column.name()),
            OutputChannel::Change(column) => write!(f, "change {}", column.name()),
            OutputChannel::Co2 => write!(f, "CO2 yield"),
        }
    }
}

/// Row of the stock or change table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockRow {
    pub sample: usize,
    pub timestep: usize,
    pub total_organic_matter: FloatValue,
    /// Organic matter in woody size classes
    pub woody: FloatValue,
    pub masses: ComponentMasses,
}

impl StockRow {
    pub fn value(&self, column: StockColumn) -> FloatValue {
        match column {
            StockColumn::TotalOrganicMatter => self.total_organic_matter,
            StockColumn::Woody => self.woody,
            StockColumn::Acid => self.masses.acid,
            StockColumn::Water => self.masses.water,
            StockColumn::Ethanol => self.masses.ethanol,
            StockColumn::NonSoluble => self.masses.non_soluble,
            StockColumn::Humus => self.masses.humus,
        }
    }

    /// `[sample, timestep, total om, woody om, acid, water, ethanol, non soluble, humus]`
    pub fn to_array(&self) -> [FloatValue; 9] {
        [
            self.sample as FloatValue,
            self.timestep as FloatValue,
            self.total_organic_matter,
            self.woody,
            self.masses.acid,
            self.masses.water,
            self.masses.ethanol,
            self.masses.non_soluble,
            self.masses.humus,
        ]
    }

    /// Componentwise difference `self - previous`, keyed like `self`
    pub fn difference(&self, previous: &StockRow) -> StockRow {
        StockRow {
            sample: self.sample,
            timestep: self.timestep,
            total_organic_matter: self.total_organic_matter - previous.total_organic_matter,
            woody: self.woody - previous.woody,
            masses: self.masses + previous.masses.scaled(-1.0),
        }
    }
}

/// Table of [`StockRow`]s with at most one row per `(sample, timestep)`
#[derive(Debug, Clone, Default)]
pub struct StockTable {
    rows: Vec<StockRow>,
    index: HashMap<(usize, usize), usize>,
}

impl StockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the masses of one size class to the row of `(sample, timestep)`.
    ///
    /// The row is created if it does not exist yet.
    /// Woody size classes also contribute to the woody column.
    pub fn add(
        &mut self,
        sample: usize,
        timestep: usize,
        size_class: SizeClass,
        masses: &ComponentMasses,
    ) {
        let total = masses.total();
        let woody = if size_class.is_woody() { total } else { 0.0 };

        match self.index.get(&(sample, timestep)) {
            Some(position) => {
                let row = &mut self.rows[*position];
                row.total_organic_matter += total;
                row.woody += woody;
                row.masses += *masses;
            }
            None => self.push(StockRow {
                sample,
                timestep,
                total_organic_matter: total,
                woody,
                masses: *masses,
            }),
        }
    }

    /// Append a row, replacing any existing row with the same key
    pub fn push(&mut self, row: StockRow) {
        match self.index.get(&(row.sample, row.timestep)) {
            Some(position) => self.rows[*position] = row,
            None => {
                self.index.insert((row.sample, row.timestep), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    /// Create an empty row for `(sample, timestep)` unless one exists
    pub fn ensure(&mut self, sample: usize, timestep: usize) {
        if !self.index.contains_key(&(sample, timestep)) {
            self.push(StockRow {
                sample,
                timestep,
                total_organic_matter: 0.0,
                woody: 0.0,
                masses: ComponentMasses::default(),
            });
        }
    }

    pub fn get(&self, sample: usize, timestep: usize) -> Option<&StockRow> {
        self.index
            .get(&(sample, timestep))
            .map(|position| &self.rows[*position])
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[StockRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(timestep, value)` pairs of a column
    pub fn observations(&self, column: StockColumn) -> Vec<(usize, FloatValue)> {
        self.rows
            .iter()
            .map(|row| (row.timestep, row.value(column)))
            .collect()
    }

    /// The table as a `(rows, 9)` array, see [`StockRow::to_array`]
    pub fn to_array(&self) -> Array2<FloatValue> {
        let mut array = Array2::zeros((self.rows.len(), 9));
        for (mut target, row) in array.rows_mut().into_iter().zip(&self.rows) {
            target.assign(&ndarray::aview1(&row.to_array()));
        }
        array
    }
}

/// Row of the CO2 yield table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Co2Row {
    pub sample: usize,
    pub timestep: usize,
    /// Carbon released during the timestep ending at `timestep`
    pub co2: FloatValue,
}

#[derive(Debug, Clone, Default)]
pub struct Co2Table {
    rows: Vec<Co2Row>,
}

impl Co2Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Co2Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Co2Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn observations(&self) -> Vec<(usize, FloatValue)> {
        self.rows.iter().map(|row| (row.timestep, row.co2)).collect()
    }

    /// The table as a `(rows, 3)` array of `[sample, timestep, co2]`
    pub fn to_array(&self) -> Array2<FloatValue> {
        let mut array = Array2::zeros((self.rows.len(), 3));
        for (i, row) in self.rows.iter().enumerate() {
            array[[i, 0]] = row.sample as FloatValue;
            array[[i, 1]] = row.timestep as FloatValue;
            array[[i, 2]] = row.co2;
        }
        array
    }
}

/// All raw results of a run
#[derive(Debug, Clone, Default)]
pub struct RawResults {
    pub stock: StockTable,
    pub change: StockTable,
    pub co2: Co2Table,
}

impl RawResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(timestep, value)` pairs of an output channel
    pub fn observations(&self, channel: OutputChannel) -> Vec<(usize, FloatValue)> {
        match channel {
            OutputChannel::Stock(column) => self.stock.observations(column),
            OutputChannel::Change(column) => self.change.observations(column),
            OutputChannel::Co2 => self.co2.observations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn masses(acid: FloatValue, humus: FloatValue) -> ComponentMasses {
        ComponentMasses {
            acid,
            humus,
            ..Default::default()
        }
    }

    #[test]
    fn stock_rows_are_additive() {
        let mut table = StockTable::new();
        table.add(0, 1, SizeClass::NON_WOODY, &masses(1.0, 2.0));
        table.add(0, 1, SizeClass::new(5.0), &masses(3.0, 0.0));
        table.add(1, 1, SizeClass::NON_WOODY, &masses(1.0, 0.0));

        assert_eq!(table.len(), 2);
        let row = table.get(0, 1).unwrap();
        assert_eq!(row.total_organic_matter, 6.0);
        assert_eq!(row.woody, 3.0);
        assert_eq!(row.masses.acid, 4.0);
        assert_eq!(row.masses.humus, 2.0);
        assert!(table.get(0, 2).is_none());
    }

    #[test]
    fn ensured_rows_stay_additive() {
        let mut table = StockTable::new();
        table.ensure(0, 0);
        table.add(0, 1, SizeClass::NON_WOODY, &masses(1.0, 0.0));
        table.ensure(0, 1);
        table.add(0, 1, SizeClass::NON_WOODY, &masses(2.0, 0.0));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, 0).unwrap().total_organic_matter, 0.0);
        assert_eq!(table.get(0, 1).unwrap().total_organic_matter, 3.0);
    }

    #[test]
    fn row_difference() {
        let mut table = StockTable::new();
        table.add(0, 0, SizeClass::NON_WOODY, &masses(1.0, 2.0));
        table.add(0, 1, SizeClass::new(1.0), &masses(4.0, 1.0));

        let change = table.get(0, 1).unwrap().difference(table.get(0, 0).unwrap());
        assert_eq!(change.timestep, 1);
        assert_eq!(change.total_organic_matter, 2.0);
        assert_eq!(change.woody, 5.0);
        assert_eq!(change.masses.acid, 3.0);
        assert_eq!(change.masses.humus, -1.0);
    }

    #[test]
    fn export_arrays() {
        let mut raw = RawResults::new();
        raw.stock.add(2, 3, SizeClass::NON_WOODY, &masses(1.0, 2.0));
        raw.co2.push(Co2Row {
            sample: 2,
            timestep: 3,
            co2: 0.5,
        });

        assert_eq!(
            raw.stock.to_array(),
            array![[2.0, 3.0, 3.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0]]
        );
        assert_eq!(raw.co2.to_array(), array![[2.0, 3.0, 0.5]]);
        assert_eq!(raw.observations(OutputChannel::Co2), vec![(3, 0.5)]);
        assert_eq!(
            raw.observations(OutputChannel::Stock(StockColumn::Humus)),
            vec![(3, 2.0)]
        );
    }

    #[test]
    fn channels() {
        let channels = OutputChannel::all();
        assert_eq!(channels.len(), 15);
        assert_eq!(channels[0].to_string(), "stock total om");
        assert_eq!(channels[14], OutputChannel::Co2);
    }
}
