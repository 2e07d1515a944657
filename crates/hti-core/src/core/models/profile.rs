use serde::{Deserialize, Serialize};

/// One row of a stage's per-lambda integrand table.
///
/// `deep_term` and `restraint_term` are the lambda-scaled contributions
/// Ed/lambda and Es/(1-lambda), reported for every stage kind as diagnostics
/// regardless of which of them enter that kind's integrand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub lambda: f64,
    pub integrand: f64,
    pub integrand_err: f64,
    pub deep_term: f64,
    pub restraint_term: f64,
    pub deep_err: f64,
    pub restraint_err: f64,
}

/// The full per-lambda coupling-work integrand table of one completed stage,
/// used both for integration diagnostics and as the input to adaptive
/// schedule refinement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegrandProfile {
    rows: Vec<ProfileRow>,
}

impl IntegrandProfile {
    pub fn new(rows: Vec<ProfileRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lambdas(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.lambda).collect()
    }

    pub fn integrands(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.integrand).collect()
    }

    pub fn integrand_errs(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.integrand_err).collect()
    }
}
