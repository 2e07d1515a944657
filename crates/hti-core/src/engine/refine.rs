use super::config::ConfigError;
use super::error::EstimationError;
use crate::core::models::profile::IntegrandProfile;
use crate::core::models::schedule::LambdaSchedule;
use crate::core::models::stage::{Provenance, Stage};

/// Where a refined schedule point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackMapEntry {
    /// The point existed in the source schedule at this index; its simulation
    /// output can be reused.
    Original(usize),
    /// Newly inserted point; a simulation must be run for it.
    Inserted,
}

/// A refined lambda schedule paired with the back-map into its source
/// schedule. Consumed once to instantiate the refined stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementMap {
    entries: Vec<(f64, BackMapEntry)>,
    error_budget: f64,
}

impl RefinementMap {
    pub fn entries(&self) -> &[(f64, BackMapEntry)] {
        &self.entries
    }

    pub fn error_budget(&self) -> f64 {
        self.error_budget
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lambdas(&self) -> Vec<f64> {
        self.entries.iter().map(|(lambda, _)| *lambda).collect()
    }

    /// Number of points that must actually be resimulated.
    pub fn inserted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, entry)| *entry == BackMapEntry::Inserted)
            .count()
    }
}

/// Densifies a completed stage's schedule so that each interval's estimated
/// discretization error falls under the budget.
///
/// The per-interval subdivision count is delegated to `intervals_needed`,
/// an opaque numeric collaborator mapping an interval's endpoints and
/// integrand values to a positive subdivision count
/// (see [`crate::core::quadrature::trapezoid_intervals_needed`] for the
/// default). Every original point keeps its own index in the back-map; the
/// `n - 1` evenly spaced points inserted per interval are marked for
/// resimulation.
pub fn plan_refinement<F>(
    profile: &IntegrandProfile,
    error_budget: f64,
    intervals_needed: F,
) -> RefinementMap
where
    F: Fn(f64, f64, f64, f64, f64) -> usize,
{
    let lambdas = profile.lambdas();
    let integrands = profile.integrands();
    let npoints = lambdas.len();

    let mut entries = Vec::new();
    for i in 0..npoints.saturating_sub(1) {
        entries.push((lambdas[i], BackMapEntry::Original(i)));
        let pieces = intervals_needed(
            lambdas[i],
            lambdas[i + 1],
            integrands[i],
            integrands[i + 1],
            error_budget,
        )
        .max(1);
        let h = (lambdas[i + 1] - lambdas[i]) / pieces as f64;
        for j in 1..pieces {
            entries.push((lambdas[i] + j as f64 * h, BackMapEntry::Inserted));
        }
    }
    if npoints > 0 {
        entries.push((lambdas[npoints - 1], BackMapEntry::Original(npoints - 1)));
    }
    RefinementMap {
        entries,
        error_budget,
    }
}

/// Instantiates the refined stage described by a refinement map.
///
/// Back-mapped tasks receive a copy of the source task's raw simulation
/// output, so only inserted points need new simulations. The source stage is
/// read-only throughout. The refined stage carries a provenance record naming
/// its source.
pub fn instantiate(map: &RefinementMap, source: &Stage) -> Result<Stage, EstimationError> {
    let schedule = LambdaSchedule::from_values(map.lambdas()).map_err(ConfigError::from)?;
    let mut refined = Stage::new(source.protocol(), source.kind(), schedule)
        .map_err(ConfigError::from)?;

    for (index, &(_, entry)) in map.entries().iter().enumerate() {
        if let BackMapEntry::Original(source_index) = entry {
            let source_task = &source.tasks()[source_index];
            let output = source_task.output().ok_or(EstimationError::NotReady {
                kind: source.kind(),
                index: source_index,
                lambda: source_task.lambda(),
            })?;
            refined.tasks_mut()[index].attach_output(output.clone());
        }
    }

    refined.set_provenance(Provenance {
        source: source.kind(),
        error_budget: map.error_budget(),
    });
    Ok(refined)
}
