//! Report generation module.
//!
//! Two kinds of report leave the crate:
//! - [`ProfileReport`]: the data dictionary of one file, written as delimited
//!   text with the same writer as every relation, or as JSON
//! - [`RunReport`]: the [`PipelineResult`](crate::PipelineResult) of a join
//!   run, written as JSON (`--emit-report`)

mod generator;

pub use generator::{PROFILE_REPORT_COLUMNS, ProfileReport, ReportGenerator, RunReport};
