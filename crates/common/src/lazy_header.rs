//! Lazy "processing <path>" header for third-party warnings.
//!
//! Parsing crates such as `lopdf` or `symphonia` log warnings without saying
//! which file they were reading.  While an [`ExtractScope`] is alive on a
//! thread, the first WARN-or-above event from a foreign target is preceded by
//! a single `INFO processing <path>` line.  Our own crates already put the
//! path in their messages, so events whose target starts with `spacexp` are
//! left alone.

use std::cell::RefCell;

use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

struct Pending {
    path: String,
    emitted: bool,
}

thread_local! {
    static PENDING: RefCell<Option<Pending>> = const { RefCell::new(None) };
    // Set while we emit the header, so our own info! does not recurse.
    static IN_HEADER: RefCell<bool> = const { RefCell::new(false) };
}

/// Marks the current thread as extracting `path` until dropped.
pub struct ExtractScope {
    _private: (),
}

impl ExtractScope {
    pub fn enter(path: &str) -> Self {
        PENDING.with(|p| {
            *p.borrow_mut() = Some(Pending { path: path.to_owned(), emitted: false });
        });
        ExtractScope { _private: () }
    }
}

impl Drop for ExtractScope {
    fn drop(&mut self) {
        PENDING.with(|p| *p.borrow_mut() = None);
    }
}

pub struct FileHeaderLayer;

impl<S: Subscriber> Layer<S> for FileHeaderLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > tracing::Level::WARN {
            return;
        }
        if event.metadata().target().starts_with("spacexp") {
            return;
        }
        if IN_HEADER.with(|h| *h.borrow()) {
            return;
        }

        let path = PENDING.with(|p| {
            let mut pending = p.borrow_mut();
            match pending.as_mut() {
                Some(hdr) if !hdr.emitted => {
                    hdr.emitted = true;
                    Some(hdr.path.clone())
                }
                _ => None,
            }
        });

        if let Some(path) = path {
            IN_HEADER.with(|h| *h.borrow_mut() = true);
            tracing::info!(target: "spacexp::index", "processing {path}");
            IN_HEADER.with(|h| *h.borrow_mut() = false);
        }
    }
}
