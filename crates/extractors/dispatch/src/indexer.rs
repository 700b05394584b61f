use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::info;

use spacexp_common::api::{FileKind, FileRecord};
use spacexp_common::config::{ExtractorConfig, IndexConfig};

use crate::process::process_file;
use crate::walk::walk;

/// Outcome of one indexing run.
#[derive(Debug)]
pub struct IndexReport {
    /// One record per file that could be stat-ed, in walk order.
    pub records: Vec<FileRecord>,
    /// Files with no handler for their MIME type.
    pub unsupported: usize,
    /// Files whose handler returned an error.
    pub failed: usize,
    /// Files that vanished or could not be stat-ed during the run.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Walks a directory and extracts every file, one at a time.
pub struct Indexer {
    index: IndexConfig,
    extractor: ExtractorConfig,
}

impl Indexer {
    pub fn new(index: &IndexConfig) -> Self {
        Self { index: index.clone(), extractor: index.extractor() }
    }

    /// `on_progress(done, total)` is called after each file.
    pub fn run(&self, root: &Path, mut on_progress: impl FnMut(usize, usize)) -> Result<IndexReport> {
        if !root.exists() {
            bail!("directory does not exist: {}", root.display());
        }
        if !root.is_dir() {
            bail!("not a directory: {}", root.display());
        }

        let start = Instant::now();
        info!("walking {}...", root.display());
        let files = walk(root, &self.index)?;
        let total = files.len();
        info!("{total} files to process");

        let mut report = IndexReport {
            records: Vec::with_capacity(total),
            unsupported: 0,
            failed: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        };

        for (i, path) in files.iter().enumerate() {
            match process_file(path, &self.extractor) {
                Some(record) => {
                    if record.kind == FileKind::Unknown {
                        report.unsupported += 1;
                    }
                    if record.error.is_some() {
                        report.failed += 1;
                    }
                    report.records.push(record);
                }
                None => report.skipped += 1,
            }
            on_progress(i + 1, total);
        }

        report.elapsed = start.elapsed();
        info!(
            "total processing time: {:.2} seconds ({} files, {} unsupported, {} failed)",
            report.elapsed.as_secs_f64(),
            report.records.len(),
            report.unsupported,
            report.failed
        );
        Ok(report)
    }
}
