//! Configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use farebridge_types::models::OrchestratorConfig;
use farebridge_types::ConfigError;

const DATA_DIR: &str = "farebridge";
const CONFIG_FILE: &str = "config.json";

/// Directory holding the config file, created on first use.
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or_else(|| ConfigError::NoDataDir {
        message: "platform data directory is unknown".to_string(),
    })?;
    let dir = base.join(DATA_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| ConfigError::from_io_error(&dir, &e))?;
    }
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load and validate the orchestrator configuration.
///
/// A missing file yields the defaults with no providers.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(OrchestratorConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::from_io_error(path, &e))?;
    let config: OrchestratorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.validate()?;

    tracing::info!(
        "Loaded config from {} ({} providers)",
        path.display(),
        config.providers.len()
    );
    Ok(config)
}
