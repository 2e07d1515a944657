use crate::core::models::stage::Stage;
use crate::core::quadrature::trapezoid_intervals_needed;
use crate::engine::error::EstimationError;
use crate::engine::estimator::IntegrationResult;
use crate::engine::refine::{instantiate, plan_refinement};
use tracing::{info, instrument};

/// Densifies a completed stage's lambda schedule against an error budget.
///
/// The integrand profile of the stage's integration result drives the
/// per-interval subdivision; already-simulated points carry their output into
/// the refined stage, so only the inserted points need new simulations. The
/// source stage is left untouched. Fails if the stage has not been integrated
/// yet, since there is no profile to refine against.
#[instrument(skip_all, name = "refine_workflow", fields(stage = %stage.kind()))]
pub fn run(
    stage: &Stage,
    prior: Option<&IntegrationResult>,
    error_budget: f64,
) -> Result<Stage, EstimationError> {
    let prior = prior.ok_or(EstimationError::MissingPriorResult {
        kind: stage.kind(),
    })?;

    let map = plan_refinement(&prior.profile, error_budget, trapezoid_intervals_needed);
    info!(
        "Refined schedule has {} points, {} of them new.",
        map.len(),
        map.inserted_count()
    );
    instantiate(&map, stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::schedule::{LambdaSchedule, SeqSpec};
    use crate::core::models::stage::{StageKind, SwitchProtocol};
    use crate::core::models::task::TaskOutput;
    use crate::core::quadrature::Scheme;
    use crate::engine::config::{RunConfig, RunConfigBuilder, StatConfig};
    use crate::engine::estimator::quadrature_estimate;
    use crate::engine::progress::ProgressReporter;

    fn test_config() -> RunConfig {
        RunConfigBuilder::new()
            .protocol(SwitchProtocol::ThreeStep)
            .temperature(300.0)
            .natoms(1)
            .stats(StatConfig {
                skip: 0,
                block_size: 5,
            })
            .build()
            .unwrap()
    }

    /// lj_on stage whose integrand ramps steeply, so refinement must insert
    /// points.
    fn ramped_stage() -> Stage {
        let schedule =
            LambdaSchedule::from_spec(&SeqSpec::Explicit(vec![0.1, 0.5, 0.9]), 1e-6)
                .unwrap();
        let mut stage = Stage::new(
            SwitchProtocol::ThreeStep,
            StageKind::LjOn,
            schedule,
        )
        .unwrap();
        for task in stage.tasks_mut() {
            let lambda = task.lambda();
            task.attach_output(TaskOutput {
                lambda,
                deep: vec![10.0 * lambda; 20],
                restraint: vec![0.0; 20],
                ..Default::default()
            });
        }
        stage
    }

    #[test]
    fn refinement_without_prior_result_is_rejected() {
        let stage = ramped_stage();
        let result = run(&stage, None, 1e-3);
        assert!(matches!(
            result,
            Err(EstimationError::MissingPriorResult {
                kind: StageKind::LjOn
            })
        ));
    }

    #[test]
    fn refined_stage_reuses_outputs_and_marks_new_points() {
        let stage = ramped_stage();
        let config = test_config();
        let prior = quadrature_estimate(
            &stage,
            &config,
            Scheme::Trapezoidal,
            &ProgressReporter::new(),
        )
        .unwrap();

        let refined = run(&stage, Some(&prior), 1e-3).unwrap();
        assert!(refined.schedule().len() > stage.schedule().len());

        let mut reused = 0;
        let mut pending = 0;
        for task in refined.tasks() {
            if task.output().is_some() {
                reused += 1;
            } else {
                pending += 1;
            }
        }
        assert_eq!(reused, stage.schedule().len());
        assert!(pending > 0);
        assert_eq!(
            refined.provenance().map(|p| p.source),
            Some(StageKind::LjOn)
        );
        // Original points keep their lambda values in the refined schedule.
        for original in stage.schedule().values() {
            assert!(refined.schedule().values().contains(original));
        }
    }

    #[test]
    fn generous_budget_changes_nothing_but_still_reuses_outputs() {
        let stage = ramped_stage();
        let config = test_config();
        let prior = quadrature_estimate(
            &stage,
            &config,
            Scheme::Trapezoidal,
            &ProgressReporter::new(),
        )
        .unwrap();

        let refined = run(&stage, Some(&prior), 1e6).unwrap();
        assert_eq!(refined.schedule().values(), stage.schedule().values());
        assert!(refined.tasks().iter().all(|t| t.output().is_some()));
    }
}
