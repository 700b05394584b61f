pub mod api;
pub mod catalog;
pub mod config;
pub mod humanize;
pub mod lazy_header;
pub mod logging;
pub mod stats;
