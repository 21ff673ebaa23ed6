pub mod context;
pub mod runner;
pub mod scenario_model;

use std::path::Path;

use thiserror::Error;

use crate::error::DriverError;
use crate::scenario::scenario_model::Scenario;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Login requested but no credentials are configured (set MO_ADMIN_EMAIL and MO_ADMIN_PASSWORD)")]
    MissingCredentials,

    #[error("Run cancelled")]
    Cancelled,
}

/// Load scenarios from a single YAML file or a directory of YAML files.
///
/// Directory entries are sorted by file name so `tc_001_*` runs before `tc_002_*`.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, ScenarioError> {
    let read_err = |p: &Path, e: std::io::Error| ScenarioError::Read {
        path: p.display().to_string(),
        source: e,
    };

    let metadata = std::fs::metadata(path).map_err(|e| read_err(path, e))?;
    if !metadata.is_dir() {
        return Ok(vec![load_scenario_file(path)?]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| read_err(path, e))? {
        let p = entry.map_err(|e| read_err(path, e))?.path();
        if p.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            files.push(p);
        }
    }
    files.sort();

    files.iter().map(|p| load_scenario_file(p)).collect()
}

pub fn load_scenario_file(path: &Path) -> Result<Scenario, ScenarioError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScenarioError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&content).map_err(|e| ScenarioError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}
