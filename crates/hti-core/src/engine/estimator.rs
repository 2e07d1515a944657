use super::config::RunConfig;
use super::error::EstimationError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::profile::{IntegrandProfile, ProfileRow};
use crate::core::models::stage::{Stage, StageKind};
use crate::core::quadrature::{Scheme, integrate_range};
use crate::core::stats::block_average;
use tracing::{debug, instrument};

/// Free-energy difference of one stage, with the integrand table that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationResult {
    pub kind: StageKind,
    /// Free-energy difference in eV per atom.
    pub free_energy: f64,
    /// Sampling-noise uncertainty, eV per atom.
    pub stat_err: f64,
    /// Discretization-bias bound, eV per atom. Zero for the reweighting
    /// estimator, which carries no quadrature step.
    pub sys_err: f64,
    pub profile: IntegrandProfile,
}

/// Reduces every task of a stage into the per-lambda integrand table.
///
/// Each task's restraint and deep energy columns are block-averaged,
/// atom-normalized, and mapped through the stage's coupling formula. The
/// lambda-scaled raw terms are kept alongside the integrand as diagnostics.
pub fn integrand_profile(
    stage: &Stage,
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<IntegrandProfile, EstimationError> {
    let kind = stage.kind();
    reporter.report(Progress::StageStart {
        kind,
        tasks: stage.tasks().len(),
    });

    let mut rows = Vec::with_capacity(stage.tasks().len());
    for task in stage.tasks() {
        let output = task.output().ok_or(EstimationError::NotReady {
            kind,
            index: task.index(),
            lambda: task.lambda(),
        })?;

        let stats = config.stats;
        let es = block_average(&output.restraint, stats.skip, stats.block_size)
            .map_err(|source| EstimationError::Stats {
                kind,
                index: task.index(),
                source,
            })?
            .per_atom(config.natoms);
        let ed = block_average(&output.deep, stats.skip, stats.block_size)
            .map_err(|source| EstimationError::Stats {
                kind,
                index: task.index(),
                source,
            })?
            .per_atom(config.natoms);

        let lambda = task.lambda();
        let integrand = stage.formula().integrand(lambda, ed, es);
        rows.push(ProfileRow {
            lambda,
            integrand: integrand.mean,
            integrand_err: integrand.std_err,
            deep_term: ed.mean / lambda,
            restraint_term: es.mean / (1.0 - lambda),
            deep_err: ed.std_err / lambda,
            restraint_err: es.std_err / (1.0 - lambda),
        });
        reporter.report(Progress::TaskReduced {
            index: task.index(),
        });
    }
    Ok(IntegrandProfile::new(rows))
}

/// Integrates a stage's coupling-work integrand over its lambda schedule.
#[instrument(skip_all, name = "quadrature_estimate", fields(stage = %stage.kind()))]
pub fn quadrature_estimate(
    stage: &Stage,
    config: &RunConfig,
    scheme: Scheme,
    reporter: &ProgressReporter,
) -> Result<IntegrationResult, EstimationError> {
    let kind = stage.kind();
    let profile = integrand_profile(stage, config, reporter)?;
    let lambdas = profile.lambdas();
    let integrands = profile.integrands();
    let errs = profile.integrand_errs();

    let cumulative = integrate_range(&lambdas, &integrands, &errs, scheme)
        .map_err(|source| EstimationError::Quadrature { kind, source })?;

    let n = lambdas.len();
    let schedule_end = lambdas[n - 1];
    // Cumulative abscissas are copies of schedule values; exact comparison intended.
    let (free_energy, stat_err, sys_err) = if cumulative.last_x() == schedule_end {
        (
            cumulative.last_value(),
            cumulative.last_stat_err(),
            cumulative.last_sys_err(),
        )
    } else if cumulative.last_x() == lambdas[n - 2] {
        // A pair-consuming rule on an even-length schedule leaves exactly one
        // interval uncovered. The tail is closed with a two-point trapezoid,
        // a different rule than the body, so the discretization-error estimate
        // can be biased at this edge. Statistical errors of the two pieces are
        // independent and combine as an L2 norm; systematic bounds add.
        let tail = integrate_range(
            &lambdas[n - 2..],
            &integrands[n - 2..],
            &errs[n - 2..],
            Scheme::Trapezoidal,
        )
        .map_err(|source| EstimationError::Quadrature { kind, source })?;
        (
            cumulative.last_value() + tail.last_value(),
            cumulative.last_stat_err().hypot(tail.last_stat_err()),
            cumulative.last_sys_err() + tail.last_sys_err(),
        )
    } else {
        return Err(EstimationError::Integration {
            kind,
            expected: schedule_end,
            found: cumulative.last_x(),
        });
    };

    reporter.report(Progress::StageFinish { kind });
    debug!(free_energy, stat_err, sys_err, "Stage integrated.");
    Ok(IntegrationResult {
        kind,
        free_energy,
        stat_err,
        sys_err,
        profile,
    })
}
