use crate::core::coupling::UnsupportedStageError;
use crate::core::models::schedule::{ScheduleError, SeqSpec};
use crate::core::models::stage::{StageKind, SwitchProtocol};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_PROTECT_EPS: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("No lambda schedule configured for stage '{0}'")]
    MissingSchedule(StageKind),

    #[error("Invalid lambda schedule: {source}")]
    Schedule {
        #[from]
        source: ScheduleError,
    },

    #[error("Invalid stage selection: {source}")]
    Stage {
        #[from]
        source: UnsupportedStageError,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Statistical-reduction parameters shared by every observable of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatConfig {
    /// Leading equilibration samples discarded from every time series.
    pub skip: usize,
    /// Block size for the decorrelating block average.
    pub block_size: usize,
}

/// Immutable description of one switching run. Built once, passed by reference
/// through the whole pipeline; schedule endpoint protection produces new
/// values instead of mutating this.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    pub protocol: SwitchProtocol,
    /// Simulation temperature in K.
    pub temperature: f64,
    /// Atom count used to normalize intensive observables.
    pub natoms: usize,
    #[serde(default = "default_protect_eps")]
    pub protect_eps: f64,
    pub stats: StatConfig,
    /// Schedule of the single `both` stage (one-step protocol).
    #[serde(default)]
    pub lambda: Option<SeqSpec>,
    #[serde(default)]
    pub lambda_lj_on: Option<SeqSpec>,
    #[serde(default)]
    pub lambda_deep_on: Option<SeqSpec>,
    #[serde(default)]
    pub lambda_spring_off: Option<SeqSpec>,
}

fn default_protect_eps() -> f64 {
    DEFAULT_PROTECT_EPS
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// The configured lambda sequence for one of this run's stages.
    pub fn schedule_spec(&self, kind: StageKind) -> Result<&SeqSpec, ConfigError> {
        let slot = match kind {
            StageKind::Both => &self.lambda,
            StageKind::LjOn => &self.lambda_lj_on,
            StageKind::DeepOn => &self.lambda_deep_on,
            StageKind::SpringOff => &self.lambda_spring_off,
        };
        slot.as_ref().ok_or(ConfigError::MissingSchedule(kind))
    }
}

#[derive(Default)]
pub struct RunConfigBuilder {
    protocol: Option<SwitchProtocol>,
    temperature: Option<f64>,
    natoms: Option<usize>,
    protect_eps: Option<f64>,
    stats: Option<StatConfig>,
    lambda: Option<SeqSpec>,
    lambda_lj_on: Option<SeqSpec>,
    lambda_deep_on: Option<SeqSpec>,
    lambda_spring_off: Option<SeqSpec>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: SwitchProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn natoms(mut self, natoms: usize) -> Self {
        self.natoms = Some(natoms);
        self
    }
    pub fn protect_eps(mut self, protect_eps: f64) -> Self {
        self.protect_eps = Some(protect_eps);
        self
    }
    pub fn stats(mut self, stats: StatConfig) -> Self {
        self.stats = Some(stats);
        self
    }
    pub fn lambda(mut self, spec: SeqSpec) -> Self {
        self.lambda = Some(spec);
        self
    }
    pub fn lambda_lj_on(mut self, spec: SeqSpec) -> Self {
        self.lambda_lj_on = Some(spec);
        self
    }
    pub fn lambda_deep_on(mut self, spec: SeqSpec) -> Self {
        self.lambda_deep_on = Some(spec);
        self
    }
    pub fn lambda_spring_off(mut self, spec: SeqSpec) -> Self {
        self.lambda_spring_off = Some(spec);
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        Ok(RunConfig {
            protocol: self
                .protocol
                .ok_or(ConfigError::MissingParameter("protocol"))?,
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
            natoms: self.natoms.ok_or(ConfigError::MissingParameter("natoms"))?,
            protect_eps: self.protect_eps.unwrap_or(DEFAULT_PROTECT_EPS),
            stats: self.stats.ok_or(ConfigError::MissingParameter("stats"))?,
            lambda: self.lambda,
            lambda_lj_on: self.lambda_lj_on,
            lambda_deep_on: self.lambda_deep_on,
            lambda_spring_off: self.lambda_spring_off,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn minimal_builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
            .protocol(SwitchProtocol::OneStep)
            .temperature(300.0)
            .natoms(64)
            .stats(StatConfig {
                skip: 10,
                block_size: 5,
            })
    }

    #[test]
    fn builder_fills_default_protect_eps() {
        let config = minimal_builder()
            .lambda(SeqSpec::Explicit(vec![0.2, 0.8]))
            .build()
            .unwrap();
        assert_eq!(config.protect_eps, DEFAULT_PROTECT_EPS);
    }

    #[test]
    fn builder_rejects_missing_temperature() {
        let result = RunConfigBuilder::new()
            .protocol(SwitchProtocol::OneStep)
            .natoms(64)
            .stats(StatConfig {
                skip: 0,
                block_size: 1,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingParameter("temperature"))
        ));
    }

    #[test]
    fn schedule_spec_resolves_the_stage_slot() {
        let config = minimal_builder()
            .lambda(SeqSpec::Explicit(vec![0.2, 0.8]))
            .build()
            .unwrap();
        assert!(config.schedule_spec(StageKind::Both).is_ok());
    }

    #[test]
    fn missing_schedule_slot_is_a_config_error() {
        let config = minimal_builder().build().unwrap();
        assert!(matches!(
            config.schedule_spec(StageKind::Both),
            Err(ConfigError::MissingSchedule(StageKind::Both))
        ));
    }

    #[test]
    fn load_parses_a_full_toml_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("run.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            r#"
protocol = "three-step"
temperature = 300.0
natoms = 144
lambda_lj_on = {{ start = 0.0, stop = 1.0, step = 0.25 }}
lambda_deep_on = [0.0, 0.5, 1.0]
lambda_spring_off = [0.0, 0.25, 0.5, 0.75, 1.0]

[stats]
skip = 20
block_size = 10
"#
        )
        .unwrap();

        let config = RunConfig::load(&file_path).unwrap();
        assert_eq!(config.protocol, SwitchProtocol::ThreeStep);
        assert_eq!(config.natoms, 144);
        assert_eq!(config.protect_eps, DEFAULT_PROTECT_EPS);
        assert_eq!(config.stats.block_size, 10);
        assert!(matches!(
            config.schedule_spec(StageKind::LjOn),
            Ok(SeqSpec::Arange { .. })
        ));
        assert!(matches!(
            config.schedule_spec(StageKind::Both),
            Err(ConfigError::MissingSchedule(StageKind::Both))
        ));
    }

    #[test]
    fn load_fails_for_unparseable_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("run.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "protocol = ").unwrap();
        assert!(matches!(
            RunConfig::load(&file_path),
            Err(ConfigError::Toml { .. })
        ));
    }
}
