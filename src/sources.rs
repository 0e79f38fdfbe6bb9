//! Resolve ingest arguments into the list of documents to read.
//!
//! Files are taken as given. Directories are walked recursively and filtered
//! by the include globs; VCS and build directories are always skipped.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Documents picked up when a directory is passed to `ingest`.
pub const DEFAULT_INCLUDE_GLOBS: &[&str] = &["**/*.pdf", "**/*.txt", "**/*.md"];

const DEFAULT_EXCLUDE_GLOBS: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Expand `paths` into a deduplicated, sorted list of document files.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(DEFAULT_INCLUDE_GLOBS)?;
    let exclude_set = build_globset(DEFAULT_EXCLUDE_GLOBS)?;

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(walk_dir(path, &include_set, &exclude_set)?);
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_dir(root: &Path, include_set: &GlobSet, exclude_set: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_lowercase();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Source identifier for a document: its base filename.
pub fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
