//! Input side of the pipeline: file discovery and per-file line streaming.
pub mod lines;
pub mod walker;

pub use lines::{enumerate_file, FileLines};
pub use walker::{enumerate_files, FileWalk, WalkOptions};
