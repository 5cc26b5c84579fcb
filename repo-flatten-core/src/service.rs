//! Request handling for the flatten service.
//!
//! A request is either a GitHub repository (URL plus optional token) or an
//! uploaded zip archive. The response carries an HTTP status and a JSON body,
//! `{"result": "<document>"}` on success or `{"error": "<message>"}` otherwise.
//! Binding this to a socket is left to the caller.

use crate::archive::{flatten_archive, validate_upload};
use crate::config::FlattenConfig;
use crate::contract::FlattenError;
use crate::flatten::flatten_source;
use crate::github::{parse_repo_url, GitHubSource};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{error, info, warn};

/// JSON body of a repository request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepoRequest {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Branch, tag or commit; the default branch when absent.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ServiceRequest {
    Repo(RepoRequest),
    Upload { filename: String, content: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    Result(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ServiceResponse {
    pub fn ok(document: String) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Result(document),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Error(message.into()),
        }
    }

    /// Maps input errors to 400 and everything else to 500.
    pub fn from_error(e: &FlattenError) -> Self {
        let status = if e.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::error(status, e.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|e| {
            format!("{{\"error\":\"failed to serialise response: {e}\"}}")
        })
    }
}

/// Runs one request to completion and builds its response.
pub async fn handle_request(config: &FlattenConfig, request: ServiceRequest) -> ServiceResponse {
    let result = match request {
        ServiceRequest::Upload { filename, content } => {
            info!(filename = %filename, size = content.len(), "Handling archive upload");
            process_upload(config, &filename, &content).await
        }
        ServiceRequest::Repo(repo) => {
            info!(repo_url = ?repo.repo_url, token_set = repo.token.is_some(), "Handling repository request");
            process_repo(config, &repo).await
        }
    };

    match result {
        Ok(document) => {
            info!(bytes = document.len(), "Request completed");
            ServiceResponse::ok(document)
        }
        Err(e) => {
            if e.is_input_error() {
                warn!(error = %e, "Rejected request");
            } else {
                error!(error = %e, "Request failed");
            }
            ServiceResponse::from_error(&e)
        }
    }
}

async fn process_upload(
    config: &FlattenConfig,
    filename: &str,
    content: &[u8],
) -> Result<String, FlattenError> {
    validate_upload(filename, content.len() as u64, config.archive.max_upload_bytes)?;

    // Removed when `upload` drops, whether or not flattening succeeds.
    let mut upload = tempfile::Builder::new()
        .prefix("repo-flatten-upload-")
        .suffix(".zip")
        .tempfile()?;
    upload.write_all(content)?;
    upload.flush()?;

    flatten_archive(upload.path()).await
}

async fn process_repo(config: &FlattenConfig, request: &RepoRequest) -> Result<String, FlattenError> {
    let repo_url = request
        .repo_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| FlattenError::InvalidInput("No repo URL provided".into()))?;
    let repository = parse_repo_url(repo_url)?;

    let token = request
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(config.github.token.as_deref());
    let source = GitHubSource::new(&repository, &config.github, token)?
        .with_reference(request.reference.clone());

    flatten_source(&source).await
}
