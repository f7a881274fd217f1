//! Merge PGN game collections into one annotated move tree, or re-export
//! the well-formed games of a collection one by one.

pub mod chess;

pub use chess::{MergeError, RunConfig, RunMode, RunSummary, process_file};
