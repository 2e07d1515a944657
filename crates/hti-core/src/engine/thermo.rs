use super::config::StatConfig;
use crate::core::models::task::TaskOutput;
use crate::core::stats::{StatsError, block_average};
use crate::core::units::BAR_A3_TO_EV;
use std::fmt;

/// Equilibrium thermodynamic summary of one task, normalized per atom where
/// the quantity is intensive (E, H, V and the PV term; T and P are reported
/// as-is).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoReport {
    pub energy: f64,
    pub energy_err: f64,
    pub enthalpy: f64,
    pub enthalpy_err: f64,
    pub temperature: f64,
    pub temperature_err: f64,
    pub pressure: f64,
    pub pressure_err: f64,
    pub volume: f64,
    pub volume_err: f64,
    pub pv: f64,
    pub pv_err: f64,
}

/// Block-averages the thermo columns of a completed task.
pub fn thermo_report(
    output: &TaskOutput,
    natoms: usize,
    stats: StatConfig,
) -> Result<ThermoReport, StatsError> {
    let energy = block_average(&output.total, stats.skip, stats.block_size)?;
    let enthalpy = block_average(&output.enthalpy, stats.skip, stats.block_size)?;
    let temperature = block_average(&output.temperature, stats.skip, stats.block_size)?;
    let pressure = block_average(&output.pressure, stats.skip, stats.block_size)?;
    let volume = block_average(&output.volume, stats.skip, stats.block_size)?;

    let n = natoms as f64;
    let energy_n = energy.per_atom(natoms);
    let enthalpy_n = enthalpy.per_atom(natoms);
    let volume_n = volume.per_atom(natoms);

    Ok(ThermoReport {
        energy: energy_n.mean,
        energy_err: energy_n.std_err,
        enthalpy: enthalpy_n.mean,
        enthalpy_err: enthalpy_n.std_err,
        temperature: temperature.mean,
        temperature_err: temperature.std_err,
        pressure: pressure.mean,
        pressure_err: pressure.std_err,
        volume: volume_n.mean,
        volume_err: volume_n.std_err,
        pv: pressure.mean * volume.mean * BAR_A3_TO_EV / n,
        pv_err: pressure.std_err * volume.mean * BAR_A3_TO_EV / n.sqrt(),
    })
}

impl fmt::Display for ThermoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "thermodynamics (normalized by natoms)")?;
        writeln!(
            f,
            "E (err)  [eV]:  {:20.8} {:20.8}",
            self.energy, self.energy_err
        )?;
        writeln!(
            f,
            "H (err)  [eV]:  {:20.8} {:20.8}",
            self.enthalpy, self.enthalpy_err
        )?;
        writeln!(
            f,
            "T (err)   [K]:  {:20.8} {:20.8}",
            self.temperature, self.temperature_err
        )?;
        writeln!(
            f,
            "P (err) [bar]:  {:20.8} {:20.8}",
            self.pressure, self.pressure_err
        )?;
        writeln!(
            f,
            "V (err) [A^3]:  {:20.8} {:20.8}",
            self.volume, self.volume_err
        )?;
        write!(f, "PV(err)  [eV]:  {:20.8} {:20.8}", self.pv, self.pv_err)
    }
}
