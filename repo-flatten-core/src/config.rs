use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "repo-flatten";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_OUTPUT_FILE: &str = "gpt-context.txt";

/// Settings for every flatten operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    pub github: GitHubConfig,
    pub archive: ArchiveConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base_url: String,
    pub user_agent: String,
    /// Used when a request carries no token of its own.
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub max_upload_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl FlattenConfig {
    pub fn trace_loaded(&self) {
        info!(
            github_api = %self.github.api_base_url,
            github_token_set = self.github.token.is_some(),
            max_upload_bytes = self.archive.max_upload_bytes,
            default_output = %self.output.default_file,
            "Loaded FlattenConfig"
        );
    }
}
