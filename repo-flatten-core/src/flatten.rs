//! The Tree Flattener: walk a [`TreeSource`] depth-first and concatenate every
//! non-ignored file into one annotated text document.
//!
//! Output format, per entry in source order:
//! - directory: `\n#DIRECTORY: <relative-path>\n\n`, then its children
//! - file: `\n\n+++++ #FILE: <name>\n\n<content>\n\n`
//! - unreadable file: `\n\n+++++ #FILE: <name>\n\nError reading file: <message>\n\n`
//!
//! The tree root never gets a directory marker. Directories are not pruned when
//! every file inside them is ignored.

use crate::contract::{EntryKind, FlattenError, TreeEntry, TreeSource};
use crate::ignore::{IgnorePatterns, IGNORE_FILE_NAME};
use tracing::{debug, info, warn};

pub const DIRECTORY_MARKER: &str = "#DIRECTORY: ";
pub const FILE_MARKER: &str = "+++++ #FILE: ";
pub const READ_ERROR_PREFIX: &str = "Error reading file: ";

/// Counters gathered during one walk, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenStats {
    pub directories: usize,
    pub files: usize,
    pub ignored: usize,
    pub unreadable: usize,
}

fn push_directory(output: &mut String, path: &str) {
    output.push('\n');
    output.push_str(DIRECTORY_MARKER);
    output.push_str(path);
    output.push_str("\n\n");
}

fn push_file_header(output: &mut String, name: &str) {
    output.push_str("\n\n");
    output.push_str(FILE_MARKER);
    output.push_str(name);
    output.push_str("\n\n");
}

/// Reads the ignore file at the root of `source`. Any failure means no patterns.
pub async fn load_ignore_patterns<S>(source: &S) -> IgnorePatterns
where
    S: TreeSource + ?Sized,
{
    match source.read_text(&TreeEntry::root_file(IGNORE_FILE_NAME)).await {
        Ok(text) => {
            let patterns = IgnorePatterns::parse(&text);
            info!(count = patterns.patterns().len(), "Loaded ignore patterns");
            patterns
        }
        Err(e) => {
            debug!(error = %e, "No ignore file at tree root, ignoring nothing");
            IgnorePatterns::empty()
        }
    }
}

/// Flattens the whole tree of `source`, filtering files with `patterns`.
pub async fn flatten_tree<S>(source: &S, patterns: &IgnorePatterns) -> Result<String, FlattenError>
where
    S: TreeSource + ?Sized,
{
    let (output, stats) = flatten_tree_with_stats(source, patterns).await?;
    info!(
        directories = stats.directories,
        files = stats.files,
        ignored = stats.ignored,
        unreadable = stats.unreadable,
        bytes = output.len(),
        "Flattened tree"
    );
    Ok(output)
}

/// As [`flatten_tree`], also returning the walk counters.
pub async fn flatten_tree_with_stats<S>(
    source: &S,
    patterns: &IgnorePatterns,
) -> Result<(String, FlattenStats), FlattenError>
where
    S: TreeSource + ?Sized,
{
    let mut output = String::new();
    let mut stats = FlattenStats::default();

    // Pending entries, top of the stack is the next one in source order.
    let mut pending: Vec<TreeEntry> = list(source, "").await?;
    pending.reverse();

    while let Some(entry) = pending.pop() {
        match entry.kind {
            EntryKind::Dir => {
                debug!(path = %entry.path, "Entering directory");
                push_directory(&mut output, &entry.path);
                stats.directories += 1;
                let children = list(source, &entry.path).await?;
                pending.extend(children.into_iter().rev());
            }
            EntryKind::File => {
                if patterns.matches(&entry.path) {
                    debug!(path = %entry.path, "Ignoring file");
                    stats.ignored += 1;
                    continue;
                }
                push_file_header(&mut output, &entry.name);
                stats.files += 1;
                match source.read_text(&entry).await {
                    Ok(text) => {
                        debug!(path = %entry.path, size = text.len(), "Appended file");
                        output.push_str(&text);
                        output.push_str("\n\n");
                    }
                    Err(e) => {
                        warn!(path = %entry.path, error = %e, "Failed to read file, recording error inline");
                        stats.unreadable += 1;
                        output.push_str(READ_ERROR_PREFIX);
                        output.push_str(&e.to_string());
                        output.push_str("\n\n");
                    }
                }
            }
        }
    }

    Ok((output, stats))
}

/// Loads the root ignore file once, then flattens the tree.
pub async fn flatten_source<S>(source: &S) -> Result<String, FlattenError>
where
    S: TreeSource + ?Sized,
{
    let patterns = load_ignore_patterns(source).await;
    flatten_tree(source, &patterns).await
}

async fn list<S>(source: &S, path: &str) -> Result<Vec<TreeEntry>, FlattenError>
where
    S: TreeSource + ?Sized,
{
    source.list_dir(path).await.map_err(|e| {
        tracing::error!(path = %path, error = %e, "Failed to list directory");
        FlattenError::Listing(e)
    })
}
