//! Zip archive input: validation, scoped extraction and flattening.

use crate::contract::FlattenError;
use crate::flatten::flatten_source;
use crate::local::LocalSource;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, info, warn};

/// Rejects uploads that are not a named `.zip` within `limit` bytes.
pub fn validate_upload(filename: &str, size: u64, limit: u64) -> Result<(), FlattenError> {
    if filename.is_empty() {
        return Err(FlattenError::InvalidInput("No file selected".into()));
    }
    if !filename.ends_with(".zip") {
        return Err(FlattenError::InvalidInput("Only zip files are allowed".into()));
    }
    if size > limit {
        return Err(FlattenError::InvalidInput(format!(
            "File size exceeds the limit of {} MB",
            format_float(limit as f64 / 1024.0 / 1024.0)
        )));
    }
    Ok(())
}

/// Shortest round-trip form of `value`, always with a fraction or an
/// exponent: `50.0`, `1.25`, `3.814697265625e-06`.
fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => formatted,
        };
    }
    let formatted = value.to_string();
    if formatted.contains('.') {
        formatted
    } else {
        format!("{formatted}.0")
    }
}

/// Extracts `zip_path` into a fresh temporary directory.
///
/// The directory and everything in it is deleted when the returned guard is dropped.
pub fn extract_archive(zip_path: &Path) -> Result<TempDir, FlattenError> {
    let file = File::open(zip_path).map_err(|e| {
        error!(path = %zip_path.display(), error = ?e, "Failed to open archive");
        FlattenError::Io(e)
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    let dir = tempfile::Builder::new().prefix("repo-flatten-").tempdir()?;
    let written = extract_entries(&mut archive, dir.path()).map_err(|e| {
        error!(path = %zip_path.display(), error = %e, "Failed to extract archive");
        e
    })?;
    info!(
        archive = %zip_path.display(),
        entries = archive.len(),
        files = written,
        dir = %dir.path().display(),
        "Extracted archive"
    );
    Ok(dir)
}

/// Writes every entry below `dest` as a plain file or directory.
///
/// Entries whose names would escape `dest` are skipped. Symlink entries are
/// written as regular files holding the link target, so nothing outside the
/// archive is ever reachable from the extracted tree.
fn extract_entries(
    archive: &mut zip::ZipArchive<File>,
    dest: &Path,
) -> Result<usize, FlattenError> {
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                warn!(name = entry.name(), "Skipping archive entry outside the extraction root");
                continue;
            }
        };
        let output_path = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Flattens the contents of a zip archive, honouring its root `.gitignore`.
pub async fn flatten_archive(zip_path: &Path) -> Result<String, FlattenError> {
    let extracted = extract_archive(zip_path)?;
    let source = LocalSource::new(extracted.path());
    flatten_source(&source).await
}

/// Flattens a zip archive and writes the document to `output_path`.
/// Returns the number of bytes written.
pub async fn flatten_archive_to_file(
    zip_path: &Path,
    output_path: &Path,
) -> Result<usize, FlattenError> {
    let output = flatten_archive(zip_path).await?;
    fs::write(output_path, &output).map_err(|e| {
        error!(path = %output_path.display(), error = ?e, "Failed to write output file");
        FlattenError::Io(e)
    })?;
    info!(
        output = %output_path.display(),
        bytes = output.len(),
        "Wrote flattened archive"
    );
    Ok(output.len())
}

/// The first `*.zip` file in `dir`, in directory enumeration order.
pub fn find_default_archive(dir: &Path) -> Result<Option<PathBuf>, FlattenError> {
    for entry_res in fs::read_dir(dir)? {
        let entry = entry_res?;
        if entry.file_name().to_string_lossy().ends_with(".zip") && entry.file_type()?.is_file()
        {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
