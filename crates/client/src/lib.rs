//! CSV catalogs and the pieces behind the `spacexp` command line.

pub mod catalog;
pub mod chart;
pub mod output;
pub mod source;

pub use catalog::read_csv;
pub use output::write_csv;
pub use source::CatalogSource;
