//! [`TreeSource`] over a GitHub repository, read through the REST contents API.
//!
//! Directory listings come from `GET /repos/{owner}/{repo}/contents/{path}` and
//! keep the order the API returns. File content is fetched per file from the
//! same endpoint and base64-decoded; files the API will not inline (over 1 MB)
//! are fetched from their raw download URL instead.

use crate::config::GitHubConfig;
use crate::contract::{decode_utf8, FlattenError, SourceError, TreeEntry, TreeSource};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

const GITHUB_HOST_MARKERS: [&str; 2] = ["github.com/", "github.com:"];

/// Extracts `owner/repo` from a GitHub repository URL.
///
/// Accepts anything containing `github.com/` (or the SSH form `github.com:`),
/// e.g. `https://github.com/owner/repo`, `github.com/owner/repo.git` or
/// `https://github.com/owner/repo/tree/main`.
pub fn parse_repo_url(repo_url: &str) -> Result<String, FlattenError> {
    let rest = GITHUB_HOST_MARKERS
        .iter()
        .find_map(|marker| repo_url.split_once(marker).map(|(_, rest)| rest))
        .ok_or_else(|| {
            FlattenError::InvalidInput(format!("Not a GitHub repository URL: {repo_url}"))
        })?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    let owner = segments.next();
    let repo = segments
        .next()
        .map(|r| r.strip_suffix(".git").unwrap_or(r));

    match (owner, repo) {
        (Some(owner), Some(repo)) if !repo.is_empty() => Ok(format!("{owner}/{repo}")),
        _ => Err(FlattenError::InvalidInput(format!(
            "Repository URL must name an owner and a repository: {repo_url}"
        ))),
    }
}

/// One item of a directory listing.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
}

/// A single file as returned by the contents endpoint.
#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct GitHubSource {
    client: Client,
    api_base_url: String,
    owner: String,
    repo: String,
    reference: Option<String>,
}

impl GitHubSource {
    /// Builds a source for `owner/repo`. `token` authenticates every request
    /// when present (private repositories, higher rate limits).
    pub fn new(
        repository: &str,
        config: &GitHubConfig,
        token: Option<&str>,
    ) -> Result<Self, FlattenError> {
        let (owner, repo) = repository.split_once('/').ok_or_else(|| {
            FlattenError::InvalidInput(format!("Expected owner/repo, got: {repository}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                FlattenError::InvalidInput("Access token contains invalid characters".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            FlattenError::InvalidInput(format!("Invalid user agent: {}", config.user_agent))
        })?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build GitHub HTTP client");
                FlattenError::Listing(Box::new(e))
            })?;

        info!(
            owner = owner,
            repo = repo,
            api = %config.api_base_url,
            authenticated = token.is_some_and(|t| !t.is_empty()),
            "Initialized GitHub source"
        );
        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: None,
        })
    }

    /// Reads from a branch, tag or commit instead of the default branch.
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference.filter(|r| !r.is_empty());
        self
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn contents_url(&self, path: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.api_base_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| format!("GitHub API URL cannot be a base: {}", self.api_base_url))?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        if let Some(reference) = &self.reference {
            url.query_pairs_mut().append_pair("ref", reference);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, SourceError> {
        debug!(url = %url, "GitHub request");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        error!(status = %status, url = %url, message = %message, "GitHub API returned error");
        Err(format!("GitHub API error {status} for {}: {message}", url.path()).into())
    }
}

#[async_trait::async_trait]
impl TreeSource for GitHubSource {
    async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError> {
        let url = self.contents_url(path)?;
        let listing: Vec<ContentEntry> = self.get(url).await?.json().await?;
        let entries: Vec<TreeEntry> = listing
            .into_iter()
            .filter_map(|item| match item.kind.as_str() {
                "dir" => Some(TreeEntry::dir(item.path, item.name)),
                "file" => Some(TreeEntry::file(item.path, item.name)),
                other => {
                    debug!(path = %item.path, kind = other, "Skipping non-file entry");
                    None
                }
            })
            .collect();
        debug!(path = path, count = entries.len(), "Listed GitHub directory");
        Ok(entries)
    }

    async fn read_text(&self, entry: &TreeEntry) -> Result<String, SourceError> {
        let url = self.contents_url(&entry.path)?;
        let file: FileContent = self.get(url).await?.json().await?;
        let bytes = match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => {
                let compact: String = content.split_whitespace().collect();
                STANDARD.decode(compact)?
            }
            _ => match file.download_url {
                Some(raw) => self.get(Url::parse(&raw)?).await?.bytes().await?.to_vec(),
                None => {
                    return Err(format!("No content available for {}", entry.path).into());
                }
            },
        };
        decode_utf8(bytes)
    }
}
