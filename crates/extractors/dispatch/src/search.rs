use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, warn};

use spacexp_common::config::IndexConfig;

use crate::handlers::DOCX_MIME;
use crate::process::guess_mime;
use crate::walk::walk;

/// Files under `root` whose text contains `needle`, ignoring case.
///
/// Plain-text files, DOCX paragraphs and PDF text are searched; everything
/// else is skipped.  Files that cannot be read are logged and skipped.
pub fn search_content(root: &Path, needle: &str, cfg: &IndexConfig) -> Result<Vec<PathBuf>> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        bail!("nothing to search for");
    }
    if !root.is_dir() {
        bail!("not a directory: {}", root.display());
    }
    let max_size = cfg.extractor().max_size_bytes;

    let mut hits = Vec::new();
    for path in walk(root, cfg)? {
        let too_big = std::fs::metadata(&path).map(|m| m.len() > max_size).unwrap_or(false);
        if too_big {
            debug!("skipping {} (over the extraction limit)", path.display());
            continue;
        }
        match searchable_text(&path) {
            Ok(Some(text)) => {
                if text.to_lowercase().contains(&needle) {
                    hits.push(path);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("cannot search {}: {e:#}", path.display()),
        }
    }
    Ok(hits)
}

/// `Ok(None)` for formats that carry no searchable text.
fn searchable_text(path: &Path) -> Result<Option<String>> {
    let mime = guess_mime(path);
    match mime.as_deref() {
        Some("application/pdf") => spacexp_extract_pdf::extract_text(path).map(Some),
        Some(DOCX_MIME) => Ok(Some(spacexp_extract_office::docx_paragraphs(path)?.join("\n"))),
        Some(m) if m.starts_with("text/") => read_lossy(path).map(Some),
        None if sniff_is_text(path) => read_lossy(path).map(Some),
        _ => Ok(None),
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Sniff the first 8 KB of a file with no recognised type.
fn sniff_is_text(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut buf = Vec::with_capacity(8192);
    if file.take(8192).read_to_end(&mut buf).is_err() || buf.is_empty() {
        return false;
    }
    content_inspector::inspect(&buf).is_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_text_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("notes.txt"), "Meeting with the Board on Friday").unwrap();
        std::fs::write(root.join("other.md"), "nothing here").unwrap();
        std::fs::write(root.join("README"), "board games").unwrap();
        std::fs::write(root.join("blob.bin"), b"board\0\0\xff").unwrap();

        let hits = search_content(root, "BOARD", &IndexConfig::default()).unwrap();
        let names: Vec<_> = hits.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["README", "notes.txt"]);
    }

    #[test]
    fn test_unreadable_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), b"board").unwrap();
        let hits = search_content(dir.path(), "board", &IndexConfig::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_needle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(search_content(dir.path(), "  ", &IndexConfig::default()).is_err());
    }
}
