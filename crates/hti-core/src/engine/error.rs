use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::stage::StageKind;
use crate::core::quadrature::QuadratureError;
use crate::core::stats::StatsError;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid input to {context}: {message}")]
    InvalidInput {
        context: &'static str,
        message: String,
    },

    #[error("Statistical reduction failed for task {index} of stage '{kind}': {source}")]
    Stats {
        kind: StageKind,
        index: usize,
        source: StatsError,
    },

    #[error("Simulation output not available for task {index} (lambda = {lambda}) of stage '{kind}'")]
    NotReady {
        kind: StageKind,
        index: usize,
        lambda: f64,
    },

    #[error("Quadrature failed for stage '{kind}': {source}")]
    Quadrature {
        kind: StageKind,
        source: QuadratureError,
    },

    #[error(
        "Cumulative integral for stage '{kind}' ends at lambda = {found} but the schedule ends at {expected}"
    )]
    Integration {
        kind: StageKind,
        expected: f64,
        found: f64,
    },

    #[error("Stage '{kind}' has no integration result to refine against")]
    MissingPriorResult { kind: StageKind },

    #[error("Reweighting solver failed to converge after {iterations} iterations")]
    Convergence { iterations: usize },
}
