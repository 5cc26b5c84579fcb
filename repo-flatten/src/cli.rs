///
/// This module implements the CLI interface for repo-flatten: command parsing,
/// argument validation and the async entry point used by `main` and by tests.
///
/// All flattening logic lives in the [`repo-flatten-core`] crate; this module only
/// maps commands onto it and reports results.
///
/// ## Commands
/// - `archive`: flatten a local zip archive into a text file.
/// - `github`: flatten a GitHub repository to a file or stdout.
/// - `request`: run one request through the service handler and print its JSON response.
///
/// [`repo-flatten-core`]: ../../repo-flatten-core/
use crate::load_config::resolve_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_flatten_core::archive::{find_default_archive, flatten_archive_to_file};
use repo_flatten_core::config::FlattenConfig;
use repo_flatten_core::flatten::flatten_source;
use repo_flatten_core::github::{parse_repo_url, GitHubSource};
use repo_flatten_core::service::{handle_request, RepoRequest, ServiceRequest};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// CLI for repo-flatten: concatenate a codebase into one annotated text document.
#[derive(Parser)]
#[clap(
    name = "repo-flatten",
    version,
    about = "Concatenate a GitHub repository or zip archive into a single annotated text document"
)]
pub struct Cli {
    /// Path to a YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flatten a zip archive into a text file
    Archive {
        /// Zip archive to read; defaults to the first .zip in the current directory
        path: Option<PathBuf>,
        /// Output file; defaults to the configured output file (gpt-context.txt)
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Flatten a GitHub repository through the contents API
    Github {
        /// Repository URL, e.g. https://github.com/owner/repo
        repo_url: String,
        /// Access token for private repositories (falls back to GITHUB_TOKEN)
        #[clap(long)]
        token: Option<String>,
        /// Branch, tag or commit to read
        #[clap(long = "ref")]
        reference: Option<String>,
        /// Output file; the document is printed to stdout when omitted
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Handle one service request and print the JSON response
    Request {
        /// Zip archive to submit as an upload
        #[clap(long, conflicts_with = "body")]
        upload: Option<PathBuf>,
        /// JSON request body ({"repo_url": ..., "token": ...}); read from stdin when omitted
        #[clap(long)]
        body: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Archive { path, output } => {
            tracing::info!(command = "archive", "Starting archive flatten");
            run_archive(&config, path, output).await
        }
        Commands::Github {
            repo_url,
            token,
            reference,
            output,
        } => {
            tracing::info!(command = "github", repo_url = %repo_url, "Starting repository flatten");
            run_github(&config, &repo_url, token, reference, output.as_deref()).await
        }
        Commands::Request { upload, body } => {
            tracing::info!(command = "request", "Handling service request");
            run_request(&config, upload, body).await
        }
    }
}

async fn run_archive(
    config: &FlattenConfig,
    path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let zip_path = match path {
        Some(path) => path,
        None => {
            let found = find_default_archive(Path::new("."))
                .context("Failed to scan current directory for zip files")?;
            let Some(found) = found else {
                anyhow::bail!("No zip files found in current directory");
            };
            println!("Using {} as the input file", found.display());
            found
        }
    };
    let output = output.unwrap_or_else(|| PathBuf::from(&config.output.default_file));

    flatten_archive_to_file(&zip_path, &output)
        .await
        .with_context(|| format!("Failed to flatten {}", zip_path.display()))?;

    println!("Processing complete. Output written to {}", output.display());
    Ok(())
}

async fn run_github(
    config: &FlattenConfig,
    repo_url: &str,
    token: Option<String>,
    reference: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let repository = parse_repo_url(repo_url)?;
    let token = token.or_else(|| config.github.token.clone());
    let source =
        GitHubSource::new(&repository, &config.github, token.as_deref())?.with_reference(reference);

    let document = flatten_source(&source)
        .await
        .with_context(|| format!("Failed to flatten {repository}"))?;

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Processing complete. Output written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn run_request(
    config: &FlattenConfig,
    upload: Option<PathBuf>,
    body: Option<PathBuf>,
) -> Result<()> {
    let request = match (upload, body) {
        (Some(path), _) => {
            let content = std::fs::read(&path)
                .with_context(|| format!("Failed to read upload {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ServiceRequest::Upload { filename, content }
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read request body {}", path.display()))?;
            ServiceRequest::Repo(parse_body(&text)?)
        }
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read request body from stdin")?;
            ServiceRequest::Repo(parse_body(&text)?)
        }
    };

    let response = handle_request(config, request).await;
    println!("{}", response.to_json());

    if response.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Request failed with status {}", response.status)
    }
}

fn parse_body(text: &str) -> Result<RepoRequest> {
    if text.trim().is_empty() {
        return Ok(RepoRequest::default());
    }
    serde_json::from_str(text).context("Request body is not valid JSON")
}
