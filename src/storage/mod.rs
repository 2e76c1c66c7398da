//! Durable row storage.
//!
//! A flat-file stand-in for the relational store: one CSV file per table
//! under a root directory. Good raw batches are appended row by row, and
//! training/prediction runs consume a chunked export of the whole table.

use crate::error::{FraguarError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed table store with create / bulk-insert / export operations.
///
/// # Examples
///
/// ```no_run
/// use fraguar::storage::TableStore;
///
/// let store = TableStore::new("store").unwrap();
/// store.create_table("good_raw_data", &["cement".into(), "strength".into()]).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Opens (or creates) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.csv"))
    }

    /// Creates (or recreates) a table with the given column names. Any
    /// previous contents are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the column list is empty or on I/O failure.
    pub fn create_table(&self, name: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(FraguarError::empty_input("table columns"));
        }
        let header = columns.join(",");
        fs::write(self.table_path(name), format!("{header}\n"))?;
        Ok(())
    }

    /// Appends the rows of every CSV file in `dir` to the table, skipping
    /// each file's header line. Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist, a file's header does
    /// not match the table's, or on I/O failure.
    pub fn bulk_insert_dir<P: AsRef<Path>>(&self, name: &str, dir: P) -> Result<usize> {
        let table_path = self.table_path(name);
        let mut table = fs::read_to_string(&table_path).map_err(|_| {
            FraguarError::Other(format!("table '{name}' does not exist; create it first"))
        })?;
        let table_header = table.lines().next().unwrap_or_default().to_string();

        let mut files: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        files.sort();

        let mut inserted = 0usize;
        for file in files {
            let content = fs::read_to_string(&file)?;
            let mut lines = content.lines();
            let header = lines.next().unwrap_or_default();
            if header != table_header {
                return Err(FraguarError::SchemaViolation {
                    message: format!(
                        "file {} header does not match table '{name}'",
                        file.display()
                    ),
                });
            }
            for line in lines {
                if line.trim().is_empty() {
                    continue;
                }
                table.push_str(line);
                table.push('\n');
                inserted += 1;
            }
        }

        fs::write(&table_path, table)?;
        Ok(inserted)
    }

    /// Exports the table to `destination` in chunks of `chunk_size` rows.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist, `chunk_size` is zero,
    /// or on I/O failure.
    pub fn export_to_csv<P: AsRef<Path>>(
        &self,
        name: &str,
        destination: P,
        chunk_size: usize,
    ) -> Result<usize> {
        if chunk_size == 0 {
            return Err(FraguarError::InvalidHyperparameter {
                param: "chunk_size".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        let content = fs::read_to_string(self.table_path(name)).map_err(|_| {
            FraguarError::Other(format!("table '{name}' does not exist; create it first"))
        })?;
        let mut lines = content.lines();
        let header = lines.next().unwrap_or_default();
        let rows: Vec<&str> = lines.filter(|l| !l.trim().is_empty()).collect();

        if let Some(parent) = destination.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = String::with_capacity(content.len());
        out.push_str(header);
        out.push('\n');
        for chunk in rows.chunks(chunk_size) {
            for row in chunk {
                out.push_str(row);
                out.push('\n');
            }
        }
        fs::write(destination.as_ref(), out)?;

        Ok(rows.len())
    }
}
