//! Match outcome prediction and statistic simulation from fitted models.

pub mod api;
pub mod artifact;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod logging;
pub mod predictor;
pub mod regressors;
pub mod resolver;
pub mod simulation;

pub use error::{ErrorCategory, PredictError, PredictResult};
pub use predictor::{MatchRequest, Prediction, Predictor};
