//! [`TreeSource`] over a directory on the local filesystem.

use crate::contract::{decode_utf8, join_relative, SourceError, TreeEntry, TreeSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks a directory tree rooted at `root`.
///
/// Each listing returns the directory's files first and its subdirectories
/// second, both in the order the filesystem enumerates them, so a directory's
/// own files come out before anything nested below it. Symlinks to directories
/// are not followed.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

/// Converts `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_newlines(text: String) -> String {
    if !text.contains('\r') {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[async_trait::async_trait]
impl TreeSource for LocalSource {
    async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError> {
        let dir = self.resolve(path);
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        for entry_res in fs::read_dir(&dir)? {
            let entry = entry_res?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(dir = %dir.display(), name = ?raw, "Skipping entry with a non UTF-8 name");
                    continue;
                }
            };
            let relative = join_relative(path, &name);
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                dirs.push(TreeEntry::dir(relative, name));
            } else if file_type.is_symlink() {
                // Linked directories are never descended into; anything else
                // (including a dangling link) is treated as a file.
                let target_is_dir = fs::metadata(entry.path())
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if target_is_dir {
                    debug!(path = %relative, "Not following directory symlink");
                } else {
                    files.push(TreeEntry::file(relative, name));
                }
            } else {
                files.push(TreeEntry::file(relative, name));
            }
        }

        debug!(
            path = %dir.display(),
            files = files.len(),
            dirs = dirs.len(),
            "Listed local directory"
        );
        files.extend(dirs);
        Ok(files)
    }

    async fn read_text(&self, entry: &TreeEntry) -> Result<String, SourceError> {
        let bytes = fs::read(self.resolve(&entry.path))?;
        Ok(normalize_newlines(decode_utf8(bytes)?))
    }
}
