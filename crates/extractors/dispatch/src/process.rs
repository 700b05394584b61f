use std::fs::File;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::{Instant, SystemTime};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use spacexp_common::api::{FileKind, FileRecord};
use spacexp_common::catalog::extension_of;
use spacexp_common::config::ExtractorConfig;
use spacexp_common::lazy_header::ExtractScope;

use crate::handlers::handler_for;

/// Registered for `.ts`, which is far more often a TypeScript source.
const MPEG_TS_MIME: &str = "video/mp2t";
const TS_PACKET_LEN: usize = 188;

/// MIME type from the file name, falling back to a content sniff for files
/// with a missing or unknown extension.
pub fn guess_mime(path: &Path) -> Option<String> {
    if let Some(mime) = mime_guess::from_path(path).first_raw() {
        if mime != MPEG_TS_MIME || is_transport_stream(path) {
            return Some(mime.to_string());
        }
        debug!("{} is not an MPEG transport stream", path.display());
    }
    infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|t| t.mime_type().to_string())
}

/// Transport streams start every 188-byte packet with the sync byte 0x47.
fn is_transport_stream(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(TS_PACKET_LEN + 1);
    if file.take(TS_PACKET_LEN as u64 + 1).read_to_end(&mut head).is_err() {
        return false;
    }
    head.first() == Some(&0x47) && head.get(TS_PACKET_LEN).map_or(true, |&b| b == 0x47)
}

fn local_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Attributes every file has: path, name, size, times and extension.
pub fn generic_info(path: &Path) -> Result<FileRecord> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let modified = meta
        .modified()
        .with_context(|| format!("modification time of {}", path.display()))?;
    // Not every filesystem records a birth time.
    let created = meta.created().unwrap_or(modified);

    Ok(FileRecord {
        file_path: path.to_string_lossy().into_owned(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: meta.len(),
        creation_time: local_time(created),
        modification_time: local_time(modified),
        extension: extension_of(path),
        mime: None,
        kind: FileKind::Unknown,
        details: Default::default(),
        error: None,
        extract_ms: None,
    })
}

/// Build the record for one file.
///
/// Returns `None` only when the file cannot be stat-ed.  Handler failures
/// (errors and panics alike) are stored in `error`, keeping the generic
/// attributes.
pub fn process_file(path: &Path, cfg: &ExtractorConfig) -> Option<FileRecord> {
    let mut record = match generic_info(path) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to get info for file {}: {e:#}", path.display());
            return None;
        }
    };
    record.mime = guess_mime(path);

    let Some(handler) = record.mime.as_deref().and_then(handler_for) else {
        warn!("unsupported file type: {}", path.display());
        return Some(record);
    };
    record.kind = handler.kind;

    let Some(extract) = handler.extract else {
        return Some(record);
    };
    if record.file_size > cfg.max_size_bytes {
        warn!(
            "{} is {} bytes, over the extraction limit; keeping generic attributes only",
            path.display(),
            record.file_size
        );
        return Some(record);
    }

    let _scope = ExtractScope::enter(&record.file_path);
    let start = Instant::now();
    let result = match catch_unwind(AssertUnwindSafe(|| extract(path, cfg))) {
        Ok(r) => r,
        Err(_) => Err(anyhow!("{} handler panicked", handler.label)),
    };
    let elapsed = start.elapsed();
    record.extract_ms = Some(elapsed.as_millis() as u64);

    match result {
        Ok(details) => {
            record.details = details;
            info!(
                "{} processed: {} in {:.2} seconds",
                handler.label,
                path.display(),
                elapsed.as_secs_f64()
            );
        }
        Err(e) => {
            error!("error processing {} {}: {e:#}", handler.label, path.display());
            record.error = Some(format!("{e:#}"));
        }
    }
    Some(record)
}
