//! Runtime settings.
//!
//! Defaults are overridden by an optional JSON file, then by environment
//! variables; command-line flags are applied last by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anomaly::AnomalyDetector;
use crate::error::{EngineError, EngineResult};
use crate::finance::Scenario;
use crate::schema::DatasetKind;
use crate::scoring::WeightVector;

pub const CONFIG_ENV: &str = "DASHBOARD_CONFIG";
pub const DATA_DIR_ENV: &str = "DASHBOARD_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the four dataset files.
    pub data_dir: PathBuf,
    pub ad_weights: WeightVector,
    pub anomaly: AnomalyDetector,
    pub scenario: Scenario,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ad_weights: WeightVector::ad_defaults(),
            anomaly: AnomalyDetector::default(),
            scenario: Scenario::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| EngineError::DataUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|err| EngineError::InvalidParameter {
            name: "config".to_string(),
            reason: format!("{}: {err}", path.display()),
        })
    }

    /// Resolve settings from an explicit file, `DASHBOARD_CONFIG`, and
    /// `DASHBOARD_DATA_DIR`.
    pub fn load(explicit: Option<&Path>) -> EngineResult<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                debug!(path = %path.display(), "reading settings file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            settings.data_dir = PathBuf::from(dir);
        }
        settings.anomaly.validate()?;
        Ok(settings)
    }

    pub fn dataset_path(&self, kind: DatasetKind) -> PathBuf {
        self.data_dir.join(kind.default_file_name())
    }
}
