//! Spreadsheet wrangling in two moves: stack a pile of CSV/Excel uploads
//! into one tagged workbook, or profile a single file's columns.
//!
//! `combine::combine_files` and `profile::profile_bytes` are the two entry
//! points; everything else supports them. Both recompute from their inputs
//! on every call and keep no state between calls.

pub mod combine;
pub mod export;
pub mod ingest;
pub mod profile;
pub mod table;
