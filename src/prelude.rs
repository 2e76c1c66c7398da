//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use fraguar::prelude::*;
//! ```

pub use crate::cluster::KMeans;
pub use crate::config::PipelineConfig;
pub use crate::data::DataFrame;
pub use crate::linear_model::LinearRegression;
pub use crate::metrics::{inertia, mae, mse, r_squared, rmse};
pub use crate::pipeline::{PredictionPipeline, TrainingPipeline};
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{Estimator, Transformer, UnsupervisedEstimator};
