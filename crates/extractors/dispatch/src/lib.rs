//! Classification and extraction for a directory tree.
//!
//! Each file's MIME type (from the extension, else sniffed from content)
//! selects a [`handlers::Handler`]; the handler's extractor fills in the
//! format-specific details.  Failures are recorded on the file's record and
//! never stop a run.

pub mod handlers;
pub mod indexer;
pub mod process;
pub mod search;
pub mod walk;

pub use handlers::{handler_for, Handler, HANDLERS};
pub use indexer::{IndexReport, Indexer};
pub use process::{generic_info, guess_mime, process_file};
pub use search::search_content;
pub use walk::walk;
