use crate::core::models::schedule::LambdaSchedule;
use crate::core::models::stage::{Stage, SwitchRun};
use crate::engine::config::{ConfigError, RunConfig};
use crate::engine::error::EstimationError;
use tracing::{info, instrument};

/// Builds the stages of a switching run from its configuration.
///
/// The protocol fixes the stage kinds and their physical order; each stage
/// draws its lambda schedule from the matching configuration slot, with exact
/// 0/1 endpoints nudged inward by the protect epsilon. Tasks are created
/// empty; running the simulations and attaching their output is the
/// responsibility of the external task-orchestration layer.
#[instrument(skip_all, name = "plan_workflow")]
pub fn run(config: &RunConfig) -> Result<SwitchRun, EstimationError> {
    let mut stages = Vec::new();
    for &kind in config.protocol.stage_kinds() {
        let spec = config.schedule_spec(kind)?;
        let schedule = LambdaSchedule::from_spec(spec, config.protect_eps)
            .map_err(ConfigError::from)?;
        let stage =
            Stage::new(config.protocol, kind, schedule).map_err(ConfigError::from)?;
        info!(
            "Planned stage '{}' with {} lambda points.",
            kind,
            stage.schedule().len()
        );
        stages.push(stage);
    }
    Ok(SwitchRun::new(config.protocol, stages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::schedule::SeqSpec;
    use crate::core::models::stage::{StageKind, SwitchProtocol};
    use crate::engine::config::{RunConfigBuilder, StatConfig};

    fn stats() -> StatConfig {
        StatConfig {
            skip: 0,
            block_size: 5,
        }
    }

    #[test]
    fn one_step_run_has_a_single_both_stage() {
        let config = RunConfigBuilder::new()
            .protocol(SwitchProtocol::OneStep)
            .temperature(300.0)
            .natoms(8)
            .stats(stats())
            .lambda(SeqSpec::Explicit(vec![0.0, 0.5, 1.0]))
            .build()
            .unwrap();
        let run = run(&config).unwrap();
        assert_eq!(run.stages().len(), 1);
        assert_eq!(run.stages()[0].kind(), StageKind::Both);
        assert!(run.stages()[0].schedule().first() > 0.0);
        assert!(run.stages()[0].schedule().last() < 1.0);
    }

    #[test]
    fn three_step_run_builds_stages_in_switching_order() {
        let config = RunConfigBuilder::new()
            .protocol(SwitchProtocol::ThreeStep)
            .temperature(300.0)
            .natoms(8)
            .stats(stats())
            .lambda_lj_on(SeqSpec::Explicit(vec![0.1, 0.9]))
            .lambda_deep_on(SeqSpec::Explicit(vec![0.2, 0.8]))
            .lambda_spring_off(SeqSpec::Explicit(vec![0.3, 0.7]))
            .build()
            .unwrap();
        let run = run(&config).unwrap();
        let kinds: Vec<StageKind> = run.stages().iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![StageKind::LjOn, StageKind::DeepOn, StageKind::SpringOff]
        );
        assert_eq!(run.stages()[1].schedule().values(), &[0.2, 0.8]);
    }

    #[test]
    fn missing_stage_schedule_fails_with_config_error() {
        let config = RunConfigBuilder::new()
            .protocol(SwitchProtocol::TwoStep)
            .temperature(300.0)
            .natoms(8)
            .stats(stats())
            .lambda_deep_on(SeqSpec::Explicit(vec![0.2, 0.8]))
            .build()
            .unwrap();
        let result = run(&config);
        assert!(matches!(
            result,
            Err(EstimationError::Config {
                source: ConfigError::MissingSchedule(StageKind::SpringOff)
            })
        ));
    }
}
