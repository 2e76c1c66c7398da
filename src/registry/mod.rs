//! Run tracking and model registry.
//!
//! A file-backed stand-in for an experiment-tracking service: JSON-lines run
//! records per experiment (hyperparameters, metrics, tags) and serialized
//! model artifacts keyed by name. Artifacts overwrite by key — the last
//! training run wins, there is no versioning.

use crate::error::{FraguarError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Tag key that marks a run's persisted model for later lookup.
pub const MODEL_NAME_TAG: &str = "model_name";

/// One tracked run: hyperparameters, scores, and lookup tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Identifier unique within the experiment.
    pub run_id: String,
    /// Experiment this run belongs to.
    pub experiment: String,
    /// Logged hyperparameters.
    pub params: BTreeMap<String, String>,
    /// Logged scores.
    pub metrics: BTreeMap<String, f32>,
    /// Lookup tags (e.g. the production-model marker).
    pub tags: BTreeMap<String, String>,
}

impl RunRecord {
    /// Records hyperparameters on the run.
    pub fn log_params<I>(&mut self, params: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.params.extend(params);
    }

    /// Records metrics on the run.
    pub fn log_metrics<I>(&mut self, metrics: I)
    where
        I: IntoIterator<Item = (String, f32)>,
    {
        self.metrics.extend(metrics);
    }

    /// Sets a lookup tag on the run.
    pub fn set_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }
}

/// File-backed run tracker and artifact store.
///
/// # Examples
///
/// ```no_run
/// use fraguar::registry::RunTracker;
///
/// let tracker = RunTracker::new("registry", "cement-strength").unwrap();
/// let mut run = tracker.start_run().unwrap();
/// run.log_metrics([("r2_score".to_string(), 0.97)]);
/// tracker.log_run(&run).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RunTracker {
    root: PathBuf,
    experiment: String,
}

impl RunTracker {
    /// Opens (or creates) a tracker rooted at `root` for `experiment`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing directories cannot be created.
    pub fn new<P: AsRef<Path>>(root: P, experiment: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(experiment))?;
        fs::create_dir_all(root.join("artifacts"))?;
        Ok(Self {
            root,
            experiment: experiment.to_string(),
        })
    }

    /// Returns the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    fn runs_path(&self) -> PathBuf {
        self.root.join(&self.experiment).join("runs.jsonl")
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(format!("{name}.json"))
    }

    /// Begins a new run record. The record is not persisted until
    /// [`log_run`](Self::log_run) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if existing runs cannot be read.
    pub fn start_run(&self) -> Result<RunRecord> {
        let next = self.search_runs()?.len() + 1;
        Ok(RunRecord {
            run_id: format!("run-{next:04}"),
            experiment: self.experiment.clone(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
        })
    }

    /// Appends a completed run record to the experiment's run log.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or I/O failure.
    pub fn log_run(&self, run: &RunRecord) -> Result<()> {
        let line = serde_json::to_string(run)?;
        let mut content = match fs::read_to_string(self.runs_path()) {
            Ok(existing) => existing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        content.push_str(&line);
        content.push('\n');
        fs::write(self.runs_path(), content)?;
        Ok(())
    }

    /// Returns every recorded run for this experiment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a corrupt record.
    pub fn search_runs(&self) -> Result<Vec<RunRecord>> {
        let content = match fs::read_to_string(self.runs_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }

    /// Serializes a model under `name`, overwriting any previous artifact
    /// with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or I/O failure.
    pub fn save_artifact<M: Serialize>(&self, model: &M, name: &str) -> Result<()> {
        let json = serde_json::to_string(model)?;
        fs::write(self.artifact_path(name), json)?;
        Ok(())
    }

    /// Loads the artifact stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FraguarError::ModelNotFound`] if no such artifact exists.
    pub fn load_artifact<M: DeserializeOwned>(&self, name: &str) -> Result<M> {
        let path = self.artifact_path(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FraguarError::ModelNotFound {
                    tag: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json).map_err(Into::into)
    }

    /// Finds the most recent run whose tag `key` equals `value` exactly and
    /// loads the artifact named by that tag value.
    ///
    /// # Errors
    ///
    /// Returns [`FraguarError::ModelNotFound`] if no run carries the tag.
    pub fn load_artifact_by_tag<M: DeserializeOwned>(&self, key: &str, value: &str) -> Result<M> {
        let runs = self.search_runs()?;
        let tagged = runs
            .iter()
            .rev()
            .find(|run| run.tags.get(key).map(String::as_str) == Some(value));

        match tagged {
            Some(_) => self.load_artifact(value),
            None => Err(FraguarError::ModelNotFound {
                tag: value.to_string(),
            }),
        }
    }
}
