//! Calibrated kernel parameters.
//!
//! Parameter sets come from a table of pre-calibrated rows.
//! Row 0 is the maximum-likelihood estimate, the remaining rows are draws
//! from the posterior of the calibration.
//!
//! Two file layouts are read:
//! * text: whitespace separated values, one row per line, `#` starts a comment
//! * binary: consecutive rows of little-endian 32-bit floats without a header

use crate::errors::{YassoError, YassoResult};
use crate::FloatValue;
use log::debug;
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use std::fs;
use std::path::Path;

/// Width of the parameter table of the standard kernel
pub const DEFAULT_PARAMETER_COLUMNS: usize = 44;

/// One row of the parameter table, in the order the kernel expects
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters(Vec<FloatValue>);

impl ModelParameters {
    pub fn new(values: Vec<FloatValue>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[FloatValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ArrayView1<'_, FloatValue>> for ModelParameters {
    fn from(value: ArrayView1<'_, FloatValue>) -> Self {
        Self(value.to_vec())
    }
}

/// Table of calibrated parameter rows
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    values: Array2<FloatValue>,
}

impl ParameterTable {
    /// Create a table from in-memory values.
    ///
    /// # Errors
    ///
    /// The table must contain at least one row and one column.
    pub fn from_array(values: Array2<FloatValue>) -> YassoResult<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(YassoError::data_format(
                "parameter table",
                "the table contains no parameters",
            ));
        }
        Ok(Self { values })
    }

    /// Read a parameter file with rows of `columns` values.
    ///
    /// The layout is detected from the contents: files that decode as text made of
    /// numbers are read as text, anything else as packed little-endian `f32` rows.
    ///
    /// # Errors
    ///
    /// [`YassoError::DataFormat`] when a row does not have `columns` values,
    /// the binary length is not a whole number of rows, or the table is empty.
    pub fn load(path: impl AsRef<Path>, columns: usize) -> YassoResult<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let bytes = fs::read(path)?;

        let table = match std::str::from_utf8(&bytes) {
            Ok(text) if looks_numeric(text) => Self::parse_text(text, columns, &origin)?,
            _ => Self::parse_binary(&bytes, columns, &origin)?,
        };
        debug!(
            "Loaded {} parameter rows of {} columns from {}",
            table.n_rows(),
            table.n_columns(),
            origin
        );
        Ok(table)
    }

    /// Parse the text layout
    pub fn parse_text(text: &str, columns: usize, origin: &str) -> YassoResult<Self> {
        let mut values = Vec::new();
        let mut n_rows = 0;

        for (line_number, line) in text.lines().enumerate() {
            let row = parse_numeric_line(line).map_err(|token| {
                YassoError::data_format(
                    origin,
                    format!("line {}: '{}' is not a number", line_number + 1, token),
                )
            })?;
            if row.is_empty() {
                continue;
            }
            if row.len() != columns {
                return Err(YassoError::data_format(
                    origin,
                    format!(
                        "line {}: expected {} parameters, got {}",
                        line_number + 1,
                        columns,
                        row.len()
                    ),
                ));
            }
            values.extend(row);
            n_rows += 1;
        }

        Self::from_rows(values, n_rows, columns, origin)
    }

    /// Parse the binary layout
    pub fn parse_binary(bytes: &[u8], columns: usize, origin: &str) -> YassoResult<Self> {
        let row_bytes = columns * std::mem::size_of::<f32>();
        if row_bytes == 0 || bytes.len() % row_bytes != 0 {
            return Err(YassoError::data_format(
                origin,
                format!(
                    "{} bytes is not a whole number of rows of {} 32-bit values",
                    bytes.len(),
                    columns
                ),
            ));
        }

        let values: Vec<FloatValue> = bytes
            .chunks_exact(4)
            .map(|chunk| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                f32::from_le_bytes(raw) as FloatValue
            })
            .collect();

        Self::from_rows(values, bytes.len() / row_bytes, columns, origin)
    }

    fn from_rows(
        values: Vec<FloatValue>,
        n_rows: usize,
        columns: usize,
        origin: &str,
    ) -> YassoResult<Self> {
        if n_rows == 0 {
            return Err(YassoError::data_format(origin, "no parameter rows found"));
        }
        let values = Array2::from_shape_vec((n_rows, columns), values)
            .map_err(|e| YassoError::data_format(origin, e.to_string()))?;
        Ok(Self { values })
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    /// Row `index` of the table, if it exists
    pub fn row(&self, index: usize) -> Option<ModelParameters> {
        (index < self.n_rows()).then(|| self.values.row(index).into())
    }

    /// The maximum-likelihood parameter set (row 0)
    pub fn maximum_likelihood(&self) -> ModelParameters {
        self.values.row(0).into()
    }

    /// Select a parameter set.
    ///
    /// Returns row 0 when `use_maximum_likelihood` is set, otherwise a row drawn
    /// uniformly from the whole table. Row 0 can therefore also be drawn.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        use_maximum_likelihood: bool,
        rng: &mut R,
    ) -> ModelParameters {
        if use_maximum_likelihood {
            self.maximum_likelihood()
        } else {
            let index = rng.gen_range(0..self.n_rows());
            self.values.row(index).into()
        }
    }
}

/// Values of a whitespace separated line, ignoring anything after `#`.
///
/// Returns the offending token if a value is not a number.
pub(crate) fn parse_numeric_line(line: &str) -> Result<Vec<FloatValue>, String> {
    let content = line.split('#').next().unwrap_or_default();
    content
        .split_whitespace()
        .map(|token| token.parse::<FloatValue>().map_err(|_| token.to_string()))
        .collect()
}

fn looks_numeric(text: &str) -> bool {
    text.lines().all(|line| parse_numeric_line(line).is_ok())
        && text.lines().any(|line| {
            parse_numeric_line(line)
                .map(|row| !row.is_empty())
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_text_table() {
        let table = ParameterTable::parse_text(
            "# maximum likelihood\n1.0 2.0 3.0\n\n4.0 5.0 6.0 # draw\n",
            3,
            "test",
        )
        .unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_columns(), 3);
        assert_eq!(table.maximum_likelihood().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(table.row(1).unwrap().as_slice(), &[4.0, 5.0, 6.0]);
        assert!(table.row(2).is_none());
    }

    #[test]
    fn text_width_mismatch() {
        let err = ParameterTable::parse_text("1.0 2.0 3.0\n4.0 5.0\n", 3, "test").unwrap_err();
        match err {
            YassoError::DataFormat { origin, message } => {
                assert_eq!(origin, "test");
                assert!(message.contains("line 2"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn empty_table() {
        let err = ParameterTable::parse_text("# nothing here\n", 3, "test").unwrap_err();
        assert!(matches!(err, YassoError::DataFormat { .. }));
    }

    #[test]
    fn load_binary_file() {
        let mut file = NamedTempFile::new().unwrap();
        for value in [0.5f32, 1.5, 2.5, 3.5, 4.5, 5.5] {
            file.write_all(&value.to_le_bytes()).unwrap();
        }

        let table = ParameterTable::load(file.path(), 2).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.row(2).unwrap().as_slice(), &[4.5, 5.5]);

        // 6 values cannot be split into rows of 4
        let err = ParameterTable::load(file.path(), 4).unwrap_err();
        assert!(matches!(err, YassoError::DataFormat { .. }));
    }

    #[test]
    fn load_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.1 0.2").unwrap();
        writeln!(file, "0.3 0.4").unwrap();

        let table = ParameterTable::load(file.path(), 2).unwrap();
        assert_eq!(table.values(), &array![[0.1, 0.2], [0.3, 0.4]]);
    }

    #[test]
    fn sample_rows() {
        let table = ParameterTable::from_array(array![[0.0], [1.0], [2.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..10 {
            assert_eq!(table.sample(true, &mut rng).as_slice(), &[0.0]);
        }

        let mut seen = [false; 3];
        for _ in 0..200 {
            let row = table.sample(false, &mut rng).as_slice()[0] as usize;
            seen[row] = true;
        }
        // Random draws cover the whole table, including the maximum-likelihood row
        assert_eq!(seen, [true, true, true]);
    }
}
