//! Training and prediction orchestrators.

mod intake;
mod predict;
mod train;

pub use intake::{IntakePipeline, IntakeReport};
pub use predict::{PredictionPipeline, PredictionReport};
pub use train::{ClusterOutcome, TrainingPipeline, TrainingReport};
