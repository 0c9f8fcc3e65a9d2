//! Locale resolution, source discovery and per-locale scaffolding

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::errors::{Result, SyncError};
use crate::core::models::LocaleCode;
use crate::core::plan::distinct_targets;

/// Extensions picked up when scanning content directories
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "mdx"];

/// Configured locales minus the default one, first occurrence wins
pub fn resolve_target_locales(
    locales: &[LocaleCode],
    default_locale: &LocaleCode,
) -> Vec<LocaleCode> {
    distinct_targets(default_locale, locales)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|wanted| ext == *wanted)
        })
        .unwrap_or(false)
}

/// Log and drop entries the walk could not read
fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
            warn!("Skipping unreadable entry {}: {}", path, e);
            None
        }
    }
}

/// Find documentation files recursively under each content directory
pub fn discover_source_files(
    content_dirs: &[PathBuf],
    extensions: &[&str],
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for dir in content_dirs {
        if !dir.is_dir() {
            return Err(SyncError::File {
                path: dir.display().to_string(),
                message: "Not a directory".to_string(),
            });
        }

        for entry in WalkDir::new(dir).into_iter().filter_map(readable) {
            let path = entry.path();
            if path.is_file() && has_extension(path, extensions) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!("Discovered {} source files", files.len());
    Ok(files)
}

/// Explicit files first, then discovered ones not already listed
pub fn collect_source_files(
    explicit: &[PathBuf],
    content_dirs: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in explicit
        .iter()
        .cloned()
        .chain(discover_source_files(content_dirs, DEFAULT_EXTENSIONS)?)
    {
        if !files.contains(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Counts from a scaffolding run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub copied: usize,
    pub skipped: usize,
    /// Entries the walk could not read; each one is logged
    pub unreadable: usize,
}

/// Copy each content directory into `<i18n_dir>/<locale>/<dir name>/`.
///
/// Files that already exist at the destination are left untouched.
pub fn scaffold_locales(
    content_dirs: &[PathBuf],
    i18n_dir: &Path,
    targets: &[LocaleCode],
) -> Result<ScaffoldReport> {
    let mut report = ScaffoldReport::default();

    for dir in content_dirs {
        let section = dir.file_name().ok_or_else(|| SyncError::File {
            path: dir.display().to_string(),
            message: "Content directory has no name".to_string(),
        })?;

        for entry in WalkDir::new(dir) {
            let Some(entry) = readable(entry) else {
                report.unreadable += 1;
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| SyncError::file(entry.path(), e))?;

            for locale in targets {
                let dest = i18n_dir.join(locale.as_str()).join(section).join(relative);
                if dest.exists() {
                    report.skipped += 1;
                    continue;
                }

                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| SyncError::file(parent, e))?;
                }
                std::fs::copy(entry.path(), &dest).map_err(|e| SyncError::file(&dest, e))?;
                report.copied += 1;
            }
        }
    }

    info!(
        "Scaffolded {} locales: {} copied, {} skipped",
        targets.len(),
        report.copied,
        report.skipped
    );
    Ok(report)
}
