use crate::core::models::stage::SwitchRun;
use crate::core::models::task::TaskOutput;
use crate::core::quadrature::Scheme;
use crate::engine::compose::{FreeEnergyKind, FreeEnergyReport, compose, finalize};
use crate::engine::config::RunConfig;
use crate::engine::error::EstimationError;
use crate::engine::estimator::{IntegrationResult, quadrature_estimate};
use crate::engine::mbar::mbar_estimate;
use crate::engine::progress::ProgressReporter;
use crate::engine::thermo::thermo_report;
use tracing::{info, instrument};

/// Free-energy estimator applied to every stage of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMethod {
    /// Numerical quadrature of dU/dLambda over the stage schedule.
    Quadrature(Scheme),
    /// Multistate reweighting between the first and last lambda states.
    Reweighting,
}

/// Post-processes a completed switching run into its absolute free energy.
///
/// Every task of every stage must carry its simulation output. The analytic
/// free energy of the reference system (Einstein crystal/molecule or ideal
/// gas) is computed by an external collaborator and passed in.
#[instrument(skip_all, name = "estimate_workflow", fields(protocol = %run.protocol()))]
pub fn run(
    run: &SwitchRun,
    config: &RunConfig,
    method: EstimatorMethod,
    kind: FreeEnergyKind,
    reference_free_energy: f64,
    reporter: &ProgressReporter,
) -> Result<FreeEnergyReport, EstimationError> {
    // === Phase 1: estimate each stage ===
    let mut results: Vec<IntegrationResult> = Vec::with_capacity(run.stages().len());
    for stage in run.stages() {
        let result = match method {
            EstimatorMethod::Quadrature(scheme) => {
                quadrature_estimate(stage, config, scheme, reporter)?
            }
            EstimatorMethod::Reweighting => mbar_estimate(stage, config, reporter)?,
        };
        info!(
            "fe of {}: {:.12} eV/atom (stat {:.3e}, sys {:.3e})",
            result.kind, result.free_energy, result.stat_err, result.sys_err
        );
        results.push(result);
    }

    // === Phase 2: compose the stages ===
    let composed = compose(&results)?;

    // === Phase 3: thermodynamic read-out ===
    let thermo_output = endpoint_output(run)?;
    let thermo = thermo_report(thermo_output, config.natoms, config.stats).map_err(
        |source| {
            let stage = &run.stages()[run.stages().len() - 1];
            EstimationError::Stats {
                kind: stage.kind(),
                index: stage.tasks().len() - 1,
                source,
            }
        },
    )?;

    // === Phase 4: final report ===
    let (free_energy, stat_err, sys_err) =
        finalize(&composed, reference_free_energy, &thermo, kind);
    info!(
        "{} free energy per atom: {:.12} eV (stat {:.3e}, sys {:.3e}).",
        kind, free_energy, stat_err, sys_err
    );
    Ok(FreeEnergyReport {
        kind,
        free_energy,
        stat_err,
        sys_err,
        reference_free_energy,
        stages: results,
        thermo,
    })
}

/// The output used for the equilibrium thermodynamic summary: the dedicated
/// end-point task when present, else the last task of the last stage.
fn endpoint_output(run: &SwitchRun) -> Result<&TaskOutput, EstimationError> {
    if let Some(task) = run.endpoint() {
        info!("Found end-point task, computing thermo info from it.");
        let stage = &run.stages()[run.stages().len() - 1];
        return task.output().ok_or(EstimationError::NotReady {
            kind: stage.kind(),
            index: task.index(),
            lambda: task.lambda(),
        });
    }
    info!("No end-point task, computing thermo info from the last lambda.");
    let stage = &run.stages()[run.stages().len() - 1];
    let task = &stage.tasks()[stage.tasks().len() - 1];
    task.output().ok_or(EstimationError::NotReady {
        kind: stage.kind(),
        index: task.index(),
        lambda: task.lambda(),
    })
}
