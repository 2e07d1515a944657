use super::error::EstimationError;
use super::estimator::IntegrationResult;
use super::thermo::ThermoReport;
use crate::core::models::stage::StageKind;
use std::fmt;

/// Free-energy difference accumulated over all stages of a switching run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedResult {
    pub free_energy: f64,
    pub stat_err: f64,
    pub sys_err: f64,
}

/// Combines the per-stage results, in physical stage order.
///
/// Statistical errors are independent across stages and combine in
/// quadrature; discretization biases are not, and add linearly.
pub fn compose(results: &[IntegrationResult]) -> Result<ComposedResult, EstimationError> {
    if results.is_empty() {
        return Err(EstimationError::InvalidInput {
            context: "stage composition",
            message: "no stage results to combine".to_string(),
        });
    }
    let free_energy = results.iter().map(|r| r.free_energy).sum();
    let stat_err = results
        .iter()
        .map(|r| r.stat_err * r.stat_err)
        .sum::<f64>()
        .sqrt();
    let sys_err = results.iter().map(|r| r.sys_err).sum();
    Ok(ComposedResult {
        free_energy,
        stat_err,
        sys_err,
    })
}

/// Which thermodynamic potential the final report expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeEnergyKind {
    Helmholtz,
    Gibbs,
}

impl fmt::Display for FreeEnergyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FreeEnergyKind::Helmholtz => "Helmholtz",
            FreeEnergyKind::Gibbs => "Gibbs",
        };
        f.write_str(label)
    }
}

/// Final report of a switching run: the absolute free energy per atom, its
/// errors, the per-stage results it was composed from, and the equilibrium
/// thermodynamic summary.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeEnergyReport {
    pub kind: FreeEnergyKind,
    /// Absolute free energy in eV per atom.
    pub free_energy: f64,
    pub stat_err: f64,
    pub sys_err: f64,
    /// Analytic free energy of the reference system, supplied externally.
    pub reference_free_energy: f64,
    pub stages: Vec<IntegrationResult>,
    pub thermo: ThermoReport,
}

impl FreeEnergyReport {
    pub fn stage(&self, kind: StageKind) -> Option<&IntegrationResult> {
        self.stages.iter().find(|r| r.kind == kind)
    }
}

impl fmt::Display for FreeEnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.thermo)?;
        writeln!(
            f,
            "reference free energy [eV]: {:20.8}",
            self.reference_free_energy
        )?;
        for stage in &self.stages {
            writeln!(
                f,
                "fe of {}: {:20.12}  {:10.3e} {:10.3e}",
                stage.kind, stage.free_energy, stage.stat_err, stage.sys_err
            )?;
        }
        write!(
            f,
            "{} free energy per atom (stat_err sys_err) [eV]: {:20.12}  {:10.3e}  {:10.3e}",
            self.kind, self.free_energy, self.stat_err, self.sys_err
        )
    }
}

/// Adds the analytically known reference free energy to the composed
/// switching contribution; for a Gibbs-type result the PV term converts the
/// Helmholtz value, with its error folded into the statistical error in
/// quadrature.
pub fn finalize(
    composed: &ComposedResult,
    reference_free_energy: f64,
    thermo: &ThermoReport,
    kind: FreeEnergyKind,
) -> (f64, f64, f64) {
    match kind {
        FreeEnergyKind::Helmholtz => (
            reference_free_energy + composed.free_energy,
            composed.stat_err,
            composed.sys_err,
        ),
        FreeEnergyKind::Gibbs => (
            reference_free_energy + composed.free_energy + thermo.pv,
            composed.stat_err.hypot(thermo.pv_err),
            composed.sys_err,
        ),
    }
}
