/// `load_config` module: reads the settings document into a [`BackupConfig`].
///
/// This is the only place where the untrusted settings document is parsed.
///
/// # Responsibilities
/// - Read the document from the given path (default `config.json`)
/// - Parse it as JSON, or as YAML when it is not JSON-shaped
/// - Reject missing keys and empty required values
///
/// # Errors
/// Every failure is a [`BackupError::Configuration`] that names the path or key.
use content_backup_core::config::BackupConfig;
use content_backup_core::BackupError;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BackupConfig, BackupError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(BackupError::Configuration(format!(
                "failed to read config file {path_ref:?}: {e}"
            )));
        }
    };

    let config = match parse_document(path_ref, &config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config document successfully");
            conf
        }
        Err(e) => {
            error!(error = %e, config_path = ?path_ref, "Failed to parse config document");
            return Err(BackupError::Configuration(format!(
                "failed to parse config file {path_ref:?}: {e}"
            )));
        }
    };

    config.validate()?;
    config.trace_loaded();
    Ok(config)
}

fn parse_document(path: &Path, content: &str) -> Result<BackupConfig, String> {
    let is_json = path.extension().is_some_and(|ext| ext == "json")
        || content.trim_start().starts_with('{');
    if is_json {
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))
    } else {
        serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))
    }
}
