use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use spacexp_common::config::IndexConfig;

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
        // For patterns like **/node_modules/**, also add **/node_modules so that
        // the directory entry itself is excluded and walkdir won't descend into it.
        if let Some(dir_pat) = pat.strip_suffix("/**") {
            builder.add(Glob::new(dir_pat)?);
        }
    }
    Ok(builder.build()?)
}

/// Regular files under `root`, in file-name order within each directory.
///
/// Exclusion globs match paths relative to `root`.  Unreadable entries are
/// logged and skipped.
pub fn walk(root: &Path, cfg: &IndexConfig) -> Result<Vec<PathBuf>> {
    let excludes = build_globset(&cfg.exclude)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(cfg.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if !cfg.include_hidden && e.depth() > 0 {
                if let Some(name) = e.file_name().to_str() {
                    if name.starts_with('.') {
                        return false;
                    }
                }
            }
            match e.path().strip_prefix(root) {
                Ok(rel) => !excludes.is_match(rel),
                Err(_) => true,
            }
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walk error: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
