//! Batch intake: validation, insertion, and export.
//!
//! Runs before either core pipeline touches row data. Raw batch files are
//! classified against the schema, good rows are bulk-inserted into the
//! table store, bad files are archived, and the whole table is exported as
//! the single flat CSV the training/prediction pipelines consume.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingestion::{IngestionSchema, RawDataValidator};
use crate::logging::FileLogger;
use crate::storage::TableStore;
use std::path::{Path, PathBuf};

/// Summary of one intake run.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    /// Files accepted into the good set.
    pub good_files: usize,
    /// Files rejected and archived.
    pub bad_files: usize,
    /// Rows inserted into the store.
    pub rows_inserted: usize,
    /// Rows written to the exported table.
    pub rows_exported: usize,
    /// Where the exported table landed.
    pub export_path: PathBuf,
}

/// Validates raw batches and refreshes the exported tables.
#[derive(Debug, Clone)]
pub struct IntakePipeline {
    config: PipelineConfig,
}

impl IntakePipeline {
    /// Creates an intake pipeline for `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs intake for the training batches.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; rejected files are not failures.
    pub fn run_training(&self) -> Result<IntakeReport> {
        self.run(
            &self.config.training_schema_path,
            &self.config.raw_training_dir,
            "good_raw_data",
            &self.config.training_data_path,
        )
    }

    /// Runs intake for the prediction batches.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; rejected files are not failures.
    pub fn run_prediction(&self) -> Result<IntakeReport> {
        self.run(
            &self.config.prediction_schema_path,
            &self.config.raw_prediction_dir,
            "prediction_raw_data",
            &self.config.prediction_data_path,
        )
    }

    fn run(
        &self,
        schema_path: &Path,
        source_dir: &Path,
        table_name: &str,
        export_path: &Path,
    ) -> Result<IntakeReport> {
        let logger = FileLogger::create(&self.config.ingestion_log_path)?;
        logger.log("intake", &format!("Started intake from {}", source_dir.display()));

        let schema = IngestionSchema::load(schema_path)?;
        let columns: Vec<String> = schema
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let validator =
            RawDataValidator::new(schema, &self.config.validated_root, logger.clone())?;
        let report = validator.validate_directory(source_dir)?;
        logger.log(
            "intake",
            &format!(
                "Classified {} good and {} bad file(s)",
                report.good.len(),
                report.bad.len()
            ),
        );

        let store = TableStore::new(&self.config.store_root)?;
        store.create_table(table_name, &columns)?;
        let rows_inserted = store.bulk_insert_dir(table_name, validator.good_dir())?;
        logger.log("intake", &format!("Inserted {rows_inserted} row(s)"));

        validator.move_bad_to_archive()?;
        validator.clean()?;

        let rows_exported = store.export_to_csv(table_name, export_path, self.config.chunk_size)?;
        logger.log(
            "intake",
            &format!("Exported {rows_exported} row(s) to {}", export_path.display()),
        );

        Ok(IntakeReport {
            good_files: report.good.len(),
            bad_files: report.bad.len(),
            rows_inserted,
            rows_exported,
            export_path: export_path.to_path_buf(),
        })
    }
}
