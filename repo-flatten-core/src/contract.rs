//! # contract: the interface between the flattener and the trees it walks
//!
//! This module defines a single trait ([`TreeSource`]) and the supporting plain
//! data types shared by every source of files: a directory on disk (an extracted
//! archive) or a remote repository listed through the GitHub contents API.
//!
//! ## Interface & Extensibility
//! - Implement [`TreeSource`] to plug a new kind of tree into the flattener.
//! - Listing is per directory, identified by its path relative to the tree root
//!   (the root itself is the empty string). Paths always use `/`.
//! - Entries are returned in the order the underlying source enumerates them.
//!   The flattener never sorts, so this order is the output order.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; enable the `test-export-mocks`
//!   feature (on by default) to use `MockTreeSource` from integration tests.
//!
//! ## Errors
//! - Source methods return the boxed [`SourceError`]. A failed listing aborts the
//!   whole operation; a failed read only affects that one file.
//! - Operations built on top of sources return [`FlattenError`].

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type for tree sources (simple boxed error, as with other trait seams).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Whether an entry is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

/// A node of a tree as reported by a [`TreeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub kind: EntryKind,
    /// Path relative to the tree root, `/`-separated.
    pub path: String,
    /// Base name of the entry.
    pub name: String,
}

impl TreeEntry {
    pub fn dir(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Dir,
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn file(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            name: name.into(),
        }
    }

    /// A file entry sitting directly under the tree root.
    pub fn root_file(name: &str) -> Self {
        Self::file(name, name)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Joins a parent relative path and a child name with `/`.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Decodes raw file bytes as UTF-8 text.
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String, SourceError> {
    String::from_utf8(bytes).map_err(|e| -> SourceError { Box::new(e.utf8_error()) })
}

/// Trait for anything the flattener can walk.
/// Implemented by the local filesystem source, the GitHub source and by mocks in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// List the entries of the directory at `path` (empty string for the root).
    async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError>;

    /// Fetch a file's content decoded as text.
    async fn read_text(&self, entry: &TreeEntry) -> Result<String, SourceError>;
}

/// Errors for whole flatten operations.
#[derive(Debug)]
pub enum FlattenError {
    /// The request was rejected before any work started.
    InvalidInput(String),
    /// A directory could not be listed.
    Listing(SourceError),
    /// The zip archive could not be opened or extracted.
    Archive(String),
    Io(std::io::Error),
}

impl FlattenError {
    /// True for errors caused by the caller's input rather than by the source.
    pub fn is_input_error(&self) -> bool {
        matches!(self, FlattenError::InvalidInput(_))
    }
}

impl std::fmt::Display for FlattenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlattenError::InvalidInput(msg) => write!(f, "{msg}"),
            FlattenError::Listing(e) => write!(f, "{e}"),
            FlattenError::Archive(msg) => write!(f, "Failed to extract archive: {msg}"),
            FlattenError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FlattenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlattenError::Listing(e) => Some(e.as_ref()),
            FlattenError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FlattenError {
    fn from(e: std::io::Error) -> Self {
        FlattenError::Io(e)
    }
}

impl From<zip::result::ZipError> for FlattenError {
    fn from(e: zip::result::ZipError) -> Self {
        FlattenError::Archive(e.to_string())
    }
}
