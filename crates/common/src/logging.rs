use std::path::Path;
use std::sync::OnceLock;

use tracing::{field::Visit, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;
use crate::lazy_header::FileHeaderLayer;

static IGNORE_PATTERNS: OnceLock<Vec<regex::Regex>> = OnceLock::new();

/// Install the global subscriber: stderr, plus the configured log file.
///
/// `default_directives` applies when `RUST_LOG` is unset.  Keep the returned
/// guard alive for the life of the process or buffered file output is lost.
pub fn init(log: &LogConfig, default_directives: &str) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &log.file {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LogIgnoreFilter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()))
        .with(FileHeaderLayer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LogIgnoreFilter),
        )
        .with(file_layer)
        .init();

    if let Err(e) = set_ignore_patterns(&log.ignore) {
        tracing::warn!("invalid log ignore pattern: {e}");
    }
    guard
}

fn split_log_path(path: &Path) -> (&Path, &std::ffi::OsStr) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(std::ffi::OsStr::new("spacexp.log"));
    (dir, name)
}

/// Compile and activate the log-ignore patterns.  The first call wins.
pub fn set_ignore_patterns(patterns: &[String]) -> Result<(), regex::Error> {
    let compiled = patterns
        .iter()
        .map(|p| regex::Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let _ = IGNORE_PATTERNS.set(compiled);
    Ok(())
}

fn is_ignored(candidate: &str) -> bool {
    IGNORE_PATTERNS
        .get()
        .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(candidate)))
}

// ── Per-layer filter ──────────────────────────────────────────────────────────

/// Drops events whose `"<target>: <message>"` matches an ignore pattern.
///
/// Parsing crates (lopdf, symphonia) are chatty about recoverable oddities in
/// real-world files; this lets users silence specific messages without
/// raising the level for the whole crate.
pub struct LogIgnoreFilter;

impl<S: Subscriber> tracing_subscriber::layer::Filter<S> for LogIgnoreFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, S>) -> bool {
        if IGNORE_PATTERNS.get().map_or(true, |p| p.is_empty()) {
            return true;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        // log-bridged events carry the real crate target in a field
        let target = visitor.log_target.as_deref().unwrap_or_else(|| event.metadata().target());
        !is_ignored(&format!("{target}: {}", visitor.message))
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    log_target: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "log.target" => self.log_target = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "log.target" => self.log_target = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("spacexp.log"));
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "spacexp.log");

        let (dir, name) = split_log_path(Path::new("/var/log/spacexp/run.log"));
        assert_eq!(dir, Path::new("/var/log/spacexp"));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn test_ignore_patterns() {
        assert!(set_ignore_patterns(&["(".to_string()]).is_err());
        set_ignore_patterns(&["^lopdf: unknown".to_string()]).unwrap();
        assert!(is_ignored("lopdf: unknown glyph"));
        assert!(!is_ignored("spacexp: unknown glyph"));
    }
}
