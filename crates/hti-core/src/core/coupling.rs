use super::models::stage::{StageKind, SwitchProtocol};
use super::stats::ReducedObservable;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Stage '{kind}' is not part of the '{protocol}' switching protocol")]
pub struct UnsupportedStageError {
    pub protocol: SwitchProtocol,
    pub kind: StageKind,
}

/// The coupling-work formula of one switching stage.
///
/// Each variant fixes how the two raw per-task energy terms (the deep
/// interaction term `Ed` and the harmonic restraint term `Es`) map to the
/// stage's dU/dLambda integrand, how their sampling errors propagate, and what
/// reduced potential a sample would have under another lambda state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouplingFormula {
    /// Deep potential switching on and restraint switching off simultaneously.
    Linear,
    /// Deep potential scaled by lambda; restraint held fixed.
    DeepScaled,
    /// Restraint scaled by (1 - lambda); deep potential held fixed.
    SpringScaled,
    /// The energy term is the derivative itself (soft-core perturbation output).
    DeepRaw,
    /// Restraint scaled by (1 - lambda) on top of a raw derivative term.
    SpringPlusDeep,
}

impl CouplingFormula {
    pub fn resolve(
        protocol: SwitchProtocol,
        kind: StageKind,
    ) -> Result<Self, UnsupportedStageError> {
        match (protocol, kind) {
            (SwitchProtocol::OneStep, StageKind::Both) => Ok(Self::Linear),
            (SwitchProtocol::TwoStep, StageKind::DeepOn) => Ok(Self::DeepScaled),
            (SwitchProtocol::TwoStep, StageKind::SpringOff) => Ok(Self::SpringScaled),
            (SwitchProtocol::ThreeStep, StageKind::LjOn) => Ok(Self::DeepRaw),
            (SwitchProtocol::ThreeStep, StageKind::DeepOn) => Ok(Self::DeepRaw),
            (SwitchProtocol::ThreeStep, StageKind::SpringOff) => Ok(Self::SpringPlusDeep),
            (protocol, kind) => Err(UnsupportedStageError { protocol, kind }),
        }
    }

    /// The per-task integrand dU/dLambda with its propagated sampling error.
    ///
    /// `ed` and `es` must already be atom-normalized. Independent error sources
    /// combine as an L2 sum; single-source formulas scale the error directly.
    pub fn integrand(
        &self,
        lambda: f64,
        ed: ReducedObservable,
        es: ReducedObservable,
    ) -> ReducedObservable {
        match self {
            Self::Linear => ReducedObservable::new(
                ed.mean / lambda - es.mean / (1.0 - lambda),
                (ed.std_err / lambda).hypot(es.std_err / (1.0 - lambda)),
            ),
            Self::DeepScaled => {
                ReducedObservable::new(ed.mean / lambda, ed.std_err / lambda)
            }
            Self::SpringScaled => ReducedObservable::new(
                -es.mean / (1.0 - lambda),
                es.std_err / (1.0 - lambda),
            ),
            Self::DeepRaw => ed,
            Self::SpringPlusDeep => ReducedObservable::new(
                -es.mean / (1.0 - lambda) + ed.mean,
                (es.std_err / (1.0 - lambda)).hypot(ed.std_err),
            ),
        }
    }

    /// The reduced potential a single sample drawn at `sampled` would have
    /// under the coupling of `target`.
    ///
    /// `ed` and `es` are raw per-sample energies already expressed in kT.
    pub fn reduced_potential(&self, sampled: f64, target: f64, ed: f64, es: f64) -> f64 {
        match self {
            Self::Linear => {
                (ed / sampled) * target + (es / (1.0 - sampled)) * (1.0 - target)
            }
            Self::DeepScaled => (ed / sampled) * target,
            Self::SpringScaled => (es / (1.0 - sampled)) * (1.0 - target),
            Self::DeepRaw => ed * target,
            Self::SpringPlusDeep => {
                (es / (1.0 - sampled)) * (1.0 - target) + ed * target
            }
        }
    }
}
