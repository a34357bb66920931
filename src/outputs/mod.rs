//! Output generation for run artifacts.
//!
//! # Submodules
//!
//! - [`files`]: Run directory layout, collision-free writes, article and summary text files
//! - [`csv`]: Headline batch, curated selection, and social post CSV reports

pub mod csv;
pub mod files;
