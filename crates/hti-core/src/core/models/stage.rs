use super::schedule::LambdaSchedule;
use super::task::Task;
use crate::core::coupling::{CouplingFormula, UnsupportedStageError};
use serde::Deserialize;
use std::fmt;

/// One physically distinct leg of the alchemical switching protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Both,
    DeepOn,
    SpringOff,
    LjOn,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Both => "both",
            StageKind::DeepOn => "deep_on",
            StageKind::SpringOff => "spring_off",
            StageKind::LjOn => "lj_on",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the coupling between the reference system and the target model is
/// decomposed into stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchProtocol {
    OneStep,
    TwoStep,
    ThreeStep,
}

impl SwitchProtocol {
    /// The stage kinds of this protocol, in physical switching order.
    pub fn stage_kinds(&self) -> &'static [StageKind] {
        match self {
            SwitchProtocol::OneStep => &[StageKind::Both],
            SwitchProtocol::TwoStep => &[StageKind::DeepOn, StageKind::SpringOff],
            SwitchProtocol::ThreeStep => {
                &[StageKind::LjOn, StageKind::DeepOn, StageKind::SpringOff]
            }
        }
    }
}

impl fmt::Display for SwitchProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SwitchProtocol::OneStep => "one-step",
            SwitchProtocol::TwoStep => "two-step",
            SwitchProtocol::ThreeStep => "three-step",
        };
        f.write_str(label)
    }
}

/// Record of where a refined stage's schedule came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Provenance {
    pub source: StageKind,
    pub error_budget: f64,
}

/// One leg of a switching run: its schedule, its tasks (one per lambda point),
/// and the coupling formula fixed by (protocol, kind).
#[derive(Debug, Clone)]
pub struct Stage {
    protocol: SwitchProtocol,
    kind: StageKind,
    formula: CouplingFormula,
    schedule: LambdaSchedule,
    tasks: Vec<Task>,
    provenance: Option<Provenance>,
}

impl Stage {
    pub fn new(
        protocol: SwitchProtocol,
        kind: StageKind,
        schedule: LambdaSchedule,
    ) -> Result<Self, UnsupportedStageError> {
        let formula = CouplingFormula::resolve(protocol, kind)?;
        let tasks = schedule
            .values()
            .iter()
            .enumerate()
            .map(|(index, &lambda)| Task::new(index, lambda))
            .collect();
        Ok(Self {
            protocol,
            kind,
            formula,
            schedule,
            tasks,
            provenance: None,
        })
    }

    pub fn protocol(&self) -> SwitchProtocol {
        self.protocol
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn formula(&self) -> CouplingFormula {
        self.formula
    }

    pub fn schedule(&self) -> &LambdaSchedule {
        &self.schedule
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub fn set_provenance(&mut self, provenance: Provenance) {
        self.provenance = Some(provenance);
    }
}

/// A complete switching run: the protocol's stages in physical order, plus an
/// optional dedicated end-point task used for the thermodynamic read-out.
#[derive(Debug, Clone)]
pub struct SwitchRun {
    protocol: SwitchProtocol,
    stages: Vec<Stage>,
    endpoint: Option<Task>,
}

impl SwitchRun {
    pub fn new(protocol: SwitchProtocol, stages: Vec<Stage>) -> Self {
        Self {
            protocol,
            stages,
            endpoint: None,
        }
    }

    pub fn protocol(&self) -> SwitchProtocol {
        self.protocol
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    pub fn endpoint(&self) -> Option<&Task> {
        self.endpoint.as_ref()
    }

    pub fn set_endpoint(&mut self, task: Task) {
        self.endpoint = Some(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::schedule::SeqSpec;

    fn schedule(values: &[f64]) -> LambdaSchedule {
        LambdaSchedule::from_spec(&SeqSpec::Explicit(values.to_vec()), 1e-6).unwrap()
    }

    #[test]
    fn stage_creates_one_task_per_lambda_point() {
        let stage = Stage::new(
            SwitchProtocol::OneStep,
            StageKind::Both,
            schedule(&[0.2, 0.4, 0.6, 0.8]),
        )
        .unwrap();
        assert_eq!(stage.tasks().len(), 4);
        assert_eq!(stage.tasks()[2].index(), 2);
        assert_eq!(stage.tasks()[2].lambda(), 0.6);
    }

    #[test]
    fn stage_rejects_kind_outside_protocol() {
        let result = Stage::new(
            SwitchProtocol::TwoStep,
            StageKind::LjOn,
            schedule(&[0.2, 0.8]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn protocols_enumerate_stage_kinds_in_switching_order() {
        assert_eq!(SwitchProtocol::OneStep.stage_kinds(), &[StageKind::Both]);
        assert_eq!(
            SwitchProtocol::TwoStep.stage_kinds(),
            &[StageKind::DeepOn, StageKind::SpringOff]
        );
        assert_eq!(
            SwitchProtocol::ThreeStep.stage_kinds(),
            &[StageKind::LjOn, StageKind::DeepOn, StageKind::SpringOff]
        );
    }

    #[test]
    fn stage_kind_labels_match_directory_names() {
        assert_eq!(StageKind::DeepOn.to_string(), "deep_on");
        assert_eq!(SwitchProtocol::ThreeStep.to_string(), "three-step");
    }
}
