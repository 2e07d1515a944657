use crate::core::models::profile::{IntegrandProfile, ProfileRow};
use crate::core::models::task::TaskOutput;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

/// One per-timestep row of a persisted simulation output table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThermoRecord {
    pub step: u64,
    pub kinetic: f64,
    pub potential: f64,
    pub total: f64,
    pub enthalpy: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub volume: f64,
    pub restraint: f64,
    pub deep: f64,
}

impl TaskOutput {
    /// Reads a task's persisted thermo table. The lambda value is stored in a
    /// separate artifact by the task orchestration layer and is supplied here.
    pub fn load(path: &Path, lambda: f64) -> Result<Self, TableError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| TableError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut output = TaskOutput {
            lambda,
            ..Default::default()
        };
        for result in reader.deserialize::<ThermoRecord>() {
            let record = result.map_err(|e| TableError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            output.push(&record);
        }
        Ok(output)
    }

    pub fn push(&mut self, record: &ThermoRecord) {
        self.kinetic.push(record.kinetic);
        self.potential.push(record.potential);
        self.total.push(record.total);
        self.enthalpy.push(record.enthalpy);
        self.temperature.push(record.temperature);
        self.pressure.push(record.pressure);
        self.volume.push(record.volume);
        self.restraint.push(record.restraint);
        self.deep.push(record.deep);
    }
}

/// Persists a stage's per-lambda integrand table.
pub fn write_profile(path: &Path, profile: &IntegrandProfile) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| TableError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    for row in profile.rows() {
        writer.serialize(row).map_err(|e| TableError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Reads a previously persisted integrand table, e.g. to refine a stage whose
/// run finished in an earlier session.
pub fn read_profile(path: &Path) -> Result<IntegrandProfile, TableError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| TableError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<ProfileRow>() {
        rows.push(result.map_err(|e| TableError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?);
    }
    Ok(IntegrandProfile::new(rows))
}
