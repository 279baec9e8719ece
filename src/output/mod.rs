//! Batch results
//!
//! Summarises finished jobs into a `BatchReport` for the caller to render.

pub mod report;

pub use report::{aggregate, BatchReport, JobReport};
