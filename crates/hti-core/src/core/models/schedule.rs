use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("A lambda schedule requires at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("Lambda schedule is not strictly increasing at index {index}: {prev} >= {next}")]
    NotIncreasing { index: usize, prev: f64, next: f64 },
    #[error("Lambda value {0} lies outside the open interval (0, 1)")]
    OutOfRange(f64),
    #[error("Sequence step must be positive, got {0}")]
    NonPositiveStep(f64),
}

/// Specification of a lambda sequence: either an explicit list of values or an
/// endpoint-inclusive arithmetic generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeqSpec {
    Explicit(Vec<f64>),
    Arange { start: f64, stop: f64, step: f64 },
}

impl SeqSpec {
    fn generate(&self) -> Result<Vec<f64>, ScheduleError> {
        match self {
            SeqSpec::Explicit(values) => Ok(values.clone()),
            SeqSpec::Arange { start, stop, step } => {
                if *step <= 0.0 {
                    return Err(ScheduleError::NonPositiveStep(*step));
                }
                let mut values = Vec::new();
                let mut i = 0usize;
                loop {
                    let value = start + i as f64 * step;
                    // Endpoint-inclusive within half a step, so that grids whose
                    // last point lands on `stop` up to rounding still contain it.
                    if value >= stop + 0.5 * step {
                        break;
                    }
                    values.push(value);
                    i += 1;
                }
                Ok(values)
            }
        }
    }
}

/// An ordered, strictly increasing sequence of coupling parameters in (0, 1).
///
/// Exact endpoint values 0 and 1 are nudged inward by `protect_eps` at
/// construction: several stage integrands carry a 1/lambda or 1/(1-lambda)
/// factor that is singular there.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaSchedule {
    values: Vec<f64>,
}

impl LambdaSchedule {
    pub fn from_spec(spec: &SeqSpec, protect_eps: f64) -> Result<Self, ScheduleError> {
        let mut values = spec.generate()?;
        if let Some(first) = values.first_mut() {
            if *first == 0.0 {
                *first += protect_eps;
            }
        }
        if let Some(last) = values.last_mut() {
            if *last == 1.0 {
                *last -= protect_eps;
            }
        }
        Self::from_values(values)
    }

    /// Validates an already-protected sequence (no endpoint nudging).
    pub fn from_values(values: Vec<f64>) -> Result<Self, ScheduleError> {
        if values.len() < 2 {
            return Err(ScheduleError::TooFewPoints(values.len()));
        }
        for &value in &values {
            if value <= 0.0 || value >= 1.0 {
                return Err(ScheduleError::OutOfRange(value));
            }
        }
        for (index, pair) in values.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(ScheduleError::NotIncreasing {
                    index,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }
}
