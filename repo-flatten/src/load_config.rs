/// `load_config` module: Loads a static YAML config and layers environment overrides on top,
/// producing the [`FlattenConfig`] every command runs with.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into typed settings; missing sections and keys take defaults
/// - Inject secrets from the environment rather than the file: `GITHUB_TOKEN`, and `GITHUB_API_URL` for GitHub Enterprise
/// - Surface clear diagnostics; any failure reading or parsing the file stops the CLI
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use repo_flatten_core::config::FlattenConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";

/// Loads a YAML config file (no secrets) and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FlattenConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: FlattenConfig = if config_content.trim().is_empty() {
        FlattenConfig::default()
    } else {
        serde_yaml::from_str(&config_content)
            .map_err(|e| {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                e
            })
            .context("Failed to parse config YAML")?
    };

    Ok(apply_env_overrides(config))
}

/// Defaults plus environment overrides, used when no config file is given.
pub fn default_config() -> FlattenConfig {
    apply_env_overrides(FlattenConfig::default())
}

/// Resolves the optional `--config` flag into the effective configuration.
pub fn resolve_config(path: Option<&Path>) -> Result<FlattenConfig> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    config.trace_loaded();
    Ok(config)
}

fn apply_env_overrides(mut config: FlattenConfig) -> FlattenConfig {
    if let Some(token) = non_empty_env(GITHUB_TOKEN_ENV) {
        info!("GITHUB_TOKEN found in env");
        config.github.token = Some(token);
    }
    if let Some(url) = non_empty_env(GITHUB_API_URL_ENV) {
        info!(api = %url, "GITHUB_API_URL found in env");
        config.github.api_base_url = url;
    }
    config
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
