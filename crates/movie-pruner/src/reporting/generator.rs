use crate::config::LoadOptions;
use crate::error::{PrunerError, Result};
use crate::io::TableWriter;
use crate::relation::{Cell, Relation};
use crate::types::{ColumnProfile, DatasetProfile, NumericSummary, PipelineResult};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Columns of the data dictionary, in output order.
pub const PROFILE_REPORT_COLUMNS: [&str; 13] = [
    "Variable",
    "Unique Entries",
    "Total Entries",
    "Data Type",
    "Data Classification",
    "Number of Empty Values",
    "Range",
    "Median",
    "Mean",
    "Mode",
    "Min",
    "Max",
    "Outliers",
];

// ============================================================================
// Report Types
// ============================================================================

/// Data dictionary of one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub generated_at: String,
    pub input_file: String,
    pub profile: DatasetProfile,
}

impl ProfileReport {
    pub fn new(input_file: impl Into<String>, profile: DatasetProfile) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.into(),
            profile,
        }
    }

    /// Render as a relation with [`PROFILE_REPORT_COLUMNS`], one row per
    /// profiled column. Numeric-only fields are missing for other columns.
    pub fn to_relation(&self) -> Result<Relation> {
        let columns = PROFILE_REPORT_COLUMNS.iter().map(|c| c.to_string()).collect();
        Relation::from_rows(
            format!("{} dictionary", self.profile.table),
            columns,
            self.profile.column_profiles.iter().map(profile_row),
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a pipeline run plus where it came from, for `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub data_dir: String,
    pub result: PipelineResult,
}

impl RunReport {
    pub fn new(data_dir: &Path, result: PipelineResult) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            data_dir: data_dir.display().to_string(),
            result,
        }
    }
}

fn profile_row(profile: &ColumnProfile) -> Vec<Cell> {
    let mut row = vec![
        Cell::text(&profile.name),
        Cell::Integer(profile.unique_count as i64),
        Cell::Integer(profile.total_count as i64),
        Cell::text(profile.data_type.display_name()),
        Cell::text(profile.classification.to_string()),
        Cell::Integer(profile.missing_count as i64),
    ];
    match &profile.numeric {
        Some(stats) => row.extend(numeric_cells(stats)),
        None => row.extend(std::iter::repeat_n(Cell::Missing, 7)),
    }
    row
}

fn numeric_cells(stats: &NumericSummary) -> [Cell; 7] {
    let outliers: Vec<String> = stats.outliers.iter().map(|v| format_number(*v)).collect();
    [
        Cell::text(format!(
            "{} - {}",
            format_number(stats.min),
            format_number(stats.max)
        )),
        Cell::text(format_number(stats.median)),
        Cell::text(format_number(stats.mean)),
        Cell::text(format_number(stats.mode)),
        Cell::text(format_number(stats.min)),
        Cell::text(format_number(stats.max)),
        Cell::text(format!("{{{}}}", outliers.join(", "))),
    ]
}

/// Shortest decimal form: `2` rather than `2.0`, `21.6` as is.
pub(crate) fn format_number(value: f64) -> String {
    format!("{value}")
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes reports to disk.
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    writer: TableWriter,
}

impl ReportGenerator {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            writer: TableWriter::new(options),
        }
    }

    /// Write the data dictionary as delimited text.
    pub fn write_profile(&self, report: &ProfileReport, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.writer.write(&report.to_relation()?, path)?;
        info!("Data dictionary saved: {}", path.display());
        Ok(())
    }

    /// Write any report as pretty-printed JSON, creating parent directories.
    pub fn write_json<T: Serialize>(&self, report: &T, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PrunerError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| PrunerError::io(path, e))?;
        let mut sink = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut sink, report)?;
        sink.flush().map_err(|e| PrunerError::io(path, e))?;
        info!("Report saved: {}", path.display());
        Ok(())
    }
}
