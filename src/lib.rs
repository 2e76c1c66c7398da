//! Fraguar: cluster-conditioned regression pipeline for concrete
//! compressive strength prediction.
//!
//! A batch pipeline that validates and stores raw concrete-mix
//! measurements, segments the training population with K-Means (cluster
//! count picked by elbow search), and runs a competitive model search per
//! cluster — a cheap comparison pass over the candidate algorithms followed
//! by grid-search refinement of the winner. Prediction routes every new
//! record through the persisted cluster model to the regressor that was fit
//! on its segment.
//!
//! # Quick Start
//!
//! ```
//! use fraguar::prelude::*;
//!
//! // Training data (y = 2*x + 1)
//! let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0]);
//!
//! let mut model = LinearRegression::new();
//! model.fit(&x, &y).unwrap();
//! assert!(model.score(&x, &y) > 0.99);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`data`]: DataFrame with named columns and CSV I/O
//! - [`preprocessing`]: Imputation, log transform, per-call standardization
//! - [`cluster`]: K-Means, elbow search, and cluster routing
//! - [`linear_model`]: OLS regression
//! - [`tree`]: Decision tree, random forest, and gradient boosting regressors
//! - [`svm`]: Linear support vector regression
//! - [`metrics`]: Evaluation metrics
//! - [`model_selection`]: Cross-validation and train/test splitting
//! - [`selection`]: Per-cluster two-phase model search
//! - [`registry`]: Run tracking and model artifacts
//! - [`ingestion`]: Raw batch-file validation against a schema
//! - [`storage`]: Flat-file table store
//! - [`pipeline`]: Training and prediction orchestrators
//! - [`logging`]: Structured JSON-lines file logging
//! - [`config`]: Explicit pipeline configuration

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod ingestion;
pub mod linear_model;
pub mod logging;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod registry;
pub mod selection;
pub mod storage;
pub mod svm;
pub mod traits;
pub mod tree;

pub use error::{FraguarError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer, UnsupervisedEstimator};
