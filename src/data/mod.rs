//! `DataFrame` module for named column containers.
//!
//! Provides a minimal `DataFrame` for the pipeline's tabular flow plus CSV
//! read/write against the storage facade's "flat file of rows" contract.
//! Every transform in this crate takes a frame and returns a new one; there
//! is no in-place mutation shared between callers.

use crate::error::{FraguarError, Result};
use crate::primitives::{Matrix, Vector};
use std::fs;
use std::path::Path;

/// A minimal `DataFrame` with named `f32` columns.
///
/// # Examples
///
/// ```
/// use fraguar::data::DataFrame;
/// use fraguar::primitives::Vector;
///
/// let columns = vec![
///     ("cement".to_string(), Vector::from_slice(&[540.0, 332.5])),
///     ("water".to_string(), Vector::from_slice(&[162.0, 228.0])),
/// ];
/// let df = DataFrame::new(columns).expect("columns share a length");
/// assert_eq!(df.shape(), (2, 2));
/// ```
#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: Vec<(String, Vector<f32>)>,
    n_rows: usize,
}

impl DataFrame {
    /// Creates a new `DataFrame` from named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if columns have different lengths, names are empty
    /// or duplicated, or no columns are given.
    pub fn new(columns: Vec<(String, Vector<f32>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err("DataFrame must have at least one column".into());
        }

        let n_rows = columns[0].1.len();

        for (name, col) in &columns {
            if col.len() != n_rows {
                return Err("All columns must have the same length".into());
            }
            if name.is_empty() {
                return Err("Column names cannot be empty".into());
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        for i in 1..names.len() {
            if names[i] == names[i - 1] {
                return Err("Duplicate column names not allowed".into());
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns true if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Returns a reference to a column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<&Vector<f32>> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| FraguarError::Other(format!("Column not found: {name}")))
    }

    /// Selects multiple columns by name, returning a new `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if any column doesn't exist.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        if names.is_empty() {
            return Err("Must select at least one column".into());
        }

        let mut selected = Vec::with_capacity(names.len());

        for &name in names {
            let col = self.column(name)?;
            selected.push((name.to_string(), col.clone()));
        }

        Self::new(selected)
    }

    /// Returns a new `DataFrame` holding the rows at `indices`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any index is out of bounds.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(FraguarError::Other(format!(
                "row index {bad} out of bounds (n_rows={})",
                self.n_rows
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.take(indices)))
            .collect();

        Self::new(columns)
    }

    /// Converts the `DataFrame` to a Matrix (rows × columns).
    #[must_use]
    pub fn to_matrix(&self) -> Matrix<f32> {
        let mut data = Vec::with_capacity(self.n_rows * self.columns.len());

        for row_idx in 0..self.n_rows {
            for (_, col) in &self.columns {
                data.push(col[row_idx]);
            }
        }

        Matrix::from_vec(self.n_rows, self.columns.len(), data)
            .expect("Internal error: data size mismatch")
    }

    /// Returns an iterator over columns as (name, vector) pairs.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Vector<f32>)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Adds a new column to the `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if column length doesn't match or name already exists.
    pub fn add_column(&mut self, name: String, data: Vector<f32>) -> Result<()> {
        if data.len() != self.n_rows {
            return Err("Column length must match existing rows".into());
        }

        if self.columns.iter().any(|(n, _)| n == &name) {
            return Err("Column name already exists".into());
        }

        if name.is_empty() {
            return Err("Column name cannot be empty".into());
        }

        self.columns.push((name, data));
        Ok(())
    }

    /// Drops a column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column doesn't exist or is the last column.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        if self.columns.len() == 1 {
            return Err("Cannot drop the last column".into());
        }

        let idx = self
            .columns
            .iter()
            .position(|(n, _)| n == name)
            .ok_or("Column not found")?;

        self.columns.remove(idx);
        Ok(())
    }

    /// Reads a numeric CSV file into a `DataFrame`.
    ///
    /// The first line is the header. Empty cells and `?` markers parse to
    /// NaN so the imputer can find them later.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, a row whose field count differs from
    /// the header, or an unparseable numeric cell.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut lines = content.lines();

        let header = lines
            .next()
            .ok_or_else(|| FraguarError::SchemaViolation {
                message: "CSV file is empty".to_string(),
            })?;
        let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
        let n_cols = names.len();

        let mut columns: Vec<Vec<f32>> = vec![Vec::new(); n_cols];

        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != n_cols {
                return Err(FraguarError::SchemaViolation {
                    message: format!(
                        "row {} has {} fields, expected {}",
                        line_no + 2,
                        fields.len(),
                        n_cols
                    ),
                });
            }
            for (j, field) in fields.iter().enumerate() {
                let trimmed = field.trim();
                let value = if trimmed.is_empty() || trimmed == "?" {
                    f32::NAN
                } else {
                    trimmed.parse::<f32>().map_err(|_| {
                        FraguarError::SchemaViolation {
                            message: format!(
                                "row {} column '{}': cannot parse '{trimmed}' as a number",
                                line_no + 2,
                                names[j]
                            ),
                        }
                    })?
                };
                columns[j].push(value);
            }
        }

        let columns = names
            .into_iter()
            .zip(columns)
            .map(|(name, data)| (name, Vector::from_vec(data)))
            .collect();

        Self::new(columns)
    }

    /// Writes the `DataFrame` to a CSV file, overwriting any existing file.
    ///
    /// NaN values are written as empty cells, mirroring `read_csv`.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = String::new();
        out.push_str(&self.column_names().join(","));
        out.push('\n');

        for row_idx in 0..self.n_rows {
            let fields: Vec<String> = self
                .columns
                .iter()
                .map(|(_, col)| {
                    let v = col[row_idx];
                    if v.is_nan() {
                        String::new()
                    } else {
                        format!("{v}")
                    }
                })
                .collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            ("a".to_string(), Vector::from_slice(&[1.0, 2.0, 3.0])),
            ("b".to_string(), Vector::from_slice(&[4.0, 5.0, 6.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_and_shape() {
        let df = sample_frame();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = DataFrame::new(vec![
            ("a".to_string(), Vector::from_slice(&[1.0])),
            ("b".to_string(), Vector::from_slice(&[1.0, 2.0])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = DataFrame::new(vec![
            ("a".to_string(), Vector::from_slice(&[1.0])),
            ("a".to_string(), Vector::from_slice(&[2.0])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_column_lookup() {
        let df = sample_frame();
        assert_eq!(df.column("b").unwrap().as_slice(), &[4.0, 5.0, 6.0]);
        assert!(df.column("missing").is_err());
        assert!(df.has_column("a"));
        assert!(!df.has_column("c"));
    }

    #[test]
    fn test_select() {
        let df = sample_frame();
        let sub = df.select(&["b"]).unwrap();
        assert_eq!(sub.shape(), (3, 1));
        assert_eq!(sub.column_names(), vec!["b"]);
    }

    #[test]
    fn test_take_preserves_order() {
        let df = sample_frame();
        let sub = df.take(&[2, 0]).unwrap();
        assert_eq!(sub.column("a").unwrap().as_slice(), &[3.0, 1.0]);
    }

    #[test]
    fn test_take_out_of_bounds() {
        let df = sample_frame();
        assert!(df.take(&[5]).is_err());
    }

    #[test]
    fn test_to_matrix_row_major() {
        let df = sample_frame();
        let m = df.to_matrix();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.row(0).as_slice(), &[1.0, 4.0]);
    }

    #[test]
    fn test_add_drop_column() {
        let mut df = sample_frame();
        df.add_column("c".to_string(), Vector::from_slice(&[7.0, 8.0, 9.0]))
            .unwrap();
        assert_eq!(df.n_cols(), 3);
        df.drop_column("a").unwrap();
        assert_eq!(df.column_names(), vec!["b", "c"]);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.csv");

        let df = sample_frame();
        df.write_csv(&path).unwrap();

        let loaded = DataFrame::read_csv(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.column("a").unwrap().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_csv_missing_cells_become_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaps.csv");
        fs::write(&path, "x,y\n1.0,\n?,4.0\n").unwrap();

        let df = DataFrame::read_csv(&path).unwrap();
        assert!(df.column("y").unwrap()[0].is_nan());
        assert!(df.column("x").unwrap()[1].is_nan());
        assert_eq!(df.column("y").unwrap()[1], 4.0);
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "x,y\n1.0,2.0,3.0\n").unwrap();

        assert!(matches!(
            DataFrame::read_csv(&path),
            Err(FraguarError::SchemaViolation { .. })
        ));
    }
}
