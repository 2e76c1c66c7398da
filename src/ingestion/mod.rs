//! Raw batch-file validation.
//!
//! Incoming measurement batches arrive as timestamped CSV files. Before any
//! row reaches the pipeline, each file is classified against a persisted
//! schema descriptor: filename pattern, column count, column names, and a
//! no-fully-empty-column rule. Passing files are copied to the good
//! directory, the rest to the bad directory; bad files can then be swept to
//! an archive.

use crate::data::DataFrame;
use crate::error::{FraguarError, Result};
use crate::logging::FileLogger;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One column in the declared schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name as it appears in the CSV header.
    pub name: String,
    /// Declared type (informational; every pipeline column is numeric).
    pub dtype: String,
}

/// Persisted schema descriptor consumed by the file classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSchema {
    /// Fixed filename prefix before the date/time stamps.
    pub filename_prefix: String,
    /// Digit count of the date stamp in valid filenames.
    pub date_stamp_length: usize,
    /// Digit count of the time stamp in valid filenames.
    pub time_stamp_length: usize,
    /// Expected number of columns.
    pub n_columns: usize,
    /// Expected columns, in order.
    pub columns: Vec<ColumnSpec>,
}

impl IngestionSchema {
    /// Loads a schema descriptor from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or deserialization failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&json).map_err(Into::into)
    }

    /// Writes the schema descriptor as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or serialization failure.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Expected column names, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Compiled filename pattern: `<prefix>_<date>_<time>.csv` with the
    /// declared stamp lengths.
    fn filename_regex(&self) -> Result<Regex> {
        let pattern = format!(
            r"^{}_\d{{{}}}_\d{{{}}}\.csv$",
            regex::escape(&self.filename_prefix),
            self.date_stamp_length,
            self.time_stamp_length
        );
        Regex::new(&pattern)
            .map_err(|e| FraguarError::Other(format!("invalid filename pattern: {e}")))
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// Files that passed every check, now in the good directory.
    pub good: Vec<PathBuf>,
    /// Files that failed a check, now in the bad directory.
    pub bad: Vec<PathBuf>,
}

/// Classifies raw batch files into good/bad directories against a schema.
#[derive(Debug)]
pub struct RawDataValidator {
    schema: IngestionSchema,
    good_dir: PathBuf,
    bad_dir: PathBuf,
    archive_dir: PathBuf,
    logger: FileLogger,
}

impl RawDataValidator {
    /// Creates a validator whose good/bad/archive directories live under
    /// `validated_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new<P: AsRef<Path>>(
        schema: IngestionSchema,
        validated_root: P,
        logger: FileLogger,
    ) -> Result<Self> {
        let root = validated_root.as_ref();
        let validator = Self {
            schema,
            good_dir: root.join("good_raw"),
            bad_dir: root.join("bad_raw"),
            archive_dir: root.join("archive"),
            logger,
        };
        fs::create_dir_all(&validator.good_dir)?;
        fs::create_dir_all(&validator.bad_dir)?;
        fs::create_dir_all(&validator.archive_dir)?;
        Ok(validator)
    }

    /// Returns the good directory.
    #[must_use]
    pub fn good_dir(&self) -> &Path {
        &self.good_dir
    }

    /// Returns the bad directory.
    #[must_use]
    pub fn bad_dir(&self) -> &Path {
        &self.bad_dir
    }

    /// Classifies every `.csv` file in `source`, copying each into the good
    /// or bad directory. Both directories are reset first, so the report
    /// reflects exactly this pass.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure; a file failing validation is not an
    /// error, it lands in the bad directory.
    pub fn validate_directory<P: AsRef<Path>>(&self, source: P) -> Result<IngestionReport> {
        self.reset_dir(&self.good_dir)?;
        self.reset_dir(&self.bad_dir)?;

        let pattern = self.schema.filename_regex()?;
        let mut entries: Vec<PathBuf> = fs::read_dir(source.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        entries.sort();

        let mut report = IngestionReport {
            good: Vec::new(),
            bad: Vec::new(),
        };

        for path in entries {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            let verdict = self.check_file(&path, &file_name, &pattern);
            match verdict {
                Ok(()) => {
                    let dest = self.good_dir.join(&file_name);
                    fs::copy(&path, &dest)?;
                    self.logger
                        .log("ingestion", &format!("{file_name}: accepted"));
                    report.good.push(dest);
                }
                Err(reason) => {
                    let dest = self.bad_dir.join(&file_name);
                    fs::copy(&path, &dest)?;
                    self.logger
                        .log("ingestion", &format!("{file_name}: rejected ({reason})"));
                    report.bad.push(dest);
                }
            }
        }

        Ok(report)
    }

    /// Runs every per-file check, returning the first failure reason.
    fn check_file(
        &self,
        path: &Path,
        file_name: &str,
        pattern: &Regex,
    ) -> std::result::Result<(), String> {
        if !pattern.is_match(file_name) {
            return Err("filename does not match schema pattern".to_string());
        }

        let df = DataFrame::read_csv(path).map_err(|e| e.to_string())?;

        if df.n_cols() != self.schema.n_columns {
            return Err(format!(
                "expected {} columns, found {}",
                self.schema.n_columns,
                df.n_cols()
            ));
        }

        let expected = self.schema.column_names();
        let actual = df.column_names();
        if expected != actual {
            return Err(format!(
                "column names do not match schema (expected {expected:?}, found {actual:?})"
            ));
        }

        for (name, col) in df.iter_columns() {
            if col.as_slice().iter().all(|v| v.is_nan()) {
                return Err(format!("column '{name}' has no values"));
            }
        }

        Ok(())
    }

    /// Moves every file in the bad directory to the archive.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn move_bad_to_archive(&self) -> Result<()> {
        if !self.bad_dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.bad_dir)? {
            let path = entry?.path();
            if path.is_file() {
                let file_name = path.file_name().map(PathBuf::from).unwrap_or_default();
                fs::rename(&path, self.archive_dir.join(file_name))?;
            }
        }
        self.logger.log("ingestion", "moved bad files to archive");
        Ok(())
    }

    /// Removes the good and bad directories after their contents have been
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn clean(&self) -> Result<()> {
        for dir in [&self.good_dir, &self.bad_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
        }
        Ok(())
    }

    fn reset_dir(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_schema() -> IngestionSchema {
        IngestionSchema {
            filename_prefix: "cement_strength".to_string(),
            date_stamp_length: 8,
            time_stamp_length: 6,
            n_columns: 2,
            columns: vec![
                ColumnSpec {
                    name: "cement".to_string(),
                    dtype: "float".to_string(),
                },
                ColumnSpec {
                    name: "strength".to_string(),
                    dtype: "float".to_string(),
                },
            ],
        }
    }

    fn setup(dir: &Path) -> RawDataValidator {
        let logger = FileLogger::create(dir.join("ingestion.log")).unwrap();
        RawDataValidator::new(test_schema(), dir.join("validated"), logger).unwrap()
    }

    #[test]
    fn test_schema_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let schema = test_schema();
        schema.save(&path).unwrap();
        let loaded = IngestionSchema::load(&path).unwrap();
        assert_eq!(loaded, schema);
    }

    #[test]
    fn test_valid_file_goes_to_good() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("cement_strength_08012020_120021.csv"),
            "cement,strength\n540.0,79.99\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert_eq!(report.good.len(), 1);
        assert!(report.bad.is_empty());
        assert!(report.good[0].exists());
    }

    #[test]
    fn test_bad_filename_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        // Date stamp too short.
        fs::write(
            source.join("cement_strength_0801_120021.csv"),
            "cement,strength\n540.0,79.99\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert!(report.good.is_empty());
        assert_eq!(report.bad.len(), 1);
    }

    #[test]
    fn test_wrong_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("cement_strength_08012020_120021.csv"),
            "cement,wrong_name\n540.0,79.99\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert_eq!(report.bad.len(), 1);
    }

    #[test]
    fn test_fully_empty_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("cement_strength_08012020_120021.csv"),
            "cement,strength\n540.0,\n332.5,\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert_eq!(report.bad.len(), 1);
    }

    #[test]
    fn test_partial_nulls_still_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("cement_strength_08012020_120021.csv"),
            "cement,strength\n540.0,\n332.5,45.0\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert_eq!(report.good.len(), 1);
    }

    #[test]
    fn test_move_bad_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("not_matching.csv"),
            "cement,strength\n540.0,79.99\n",
        )
        .unwrap();

        let validator = setup(dir.path());
        let report = validator.validate_directory(&source).unwrap();
        assert_eq!(report.bad.len(), 1);

        validator.move_bad_to_archive().unwrap();
        assert!(!report.bad[0].exists());
        let archived: Vec<_> = fs::read_dir(dir.path().join("validated/archive"))
            .unwrap()
            .collect();
        assert_eq!(archived.len(), 1);
    }

    #[test]
    fn test_clean_removes_working_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir_all(&source).unwrap();

        let validator = setup(dir.path());
        validator.validate_directory(&source).unwrap();
        validator.clean().unwrap();
        assert!(!validator.good_dir().exists());
        assert!(!validator.bad_dir().exists());
    }
}
