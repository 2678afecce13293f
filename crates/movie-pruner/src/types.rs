use crate::config::Classification;
use crate::transform::KeyReport;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Profiling Types
// ============================================================================

/// Primitive type inferred for a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Every value is missing, so there is nothing to infer from.
    Empty,
}

impl ColumnType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Statistics of a numeric column, computed over its non-missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; the first one encountered wins ties.
    pub mode: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Distinct values further than the outlier threshold from the mean, in
    /// order of first appearance.
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Distinct non-missing values.
    pub unique_count: usize,
    /// Non-missing values.
    pub total_count: usize,
    pub missing_count: usize,
    pub data_type: ColumnType,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub table: String,
    pub shape: (usize, usize),
    /// One profile per column, in column order.
    pub column_profiles: Vec<ColumnProfile>,
}

// ============================================================================
// Pipeline Result Types
// ============================================================================

/// Outcome of a pipeline run, serializable for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PipelineSummary>,
}

impl PipelineResult {
    pub fn succeeded(output_path: Option<String>, summary: PipelineSummary) -> Self {
        Self {
            success: true,
            output_path,
            error: None,
            summary: Some(summary),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            error: Some(error.into()),
            summary: None,
        }
    }
}

/// What the pipeline did, stage by stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// RFC 3339 timestamp of completion.
    pub completed_at: String,
    /// Rows and columns of the combined relation.
    pub output_shape: (usize, usize),
    /// Row count the join self-check derived from per-key multiplicities.
    pub expected_rows: usize,
    /// Rows removed because their key was malformed.
    pub rows_dropped: usize,
    pub key_reports: Vec<KeyReport>,
    pub actions: Vec<PipelineAction>,
    pub warnings: Vec<String>,
}

impl PipelineSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: PipelineAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// One row-count-changing step, recorded as "from X to Y rows".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineAction {
    pub action_type: ActionType,
    /// Table the action applied to.
    pub target: String,
    pub description: String,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl PipelineAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
        rows_before: usize,
        rows_after: usize,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            rows_before,
            rows_after,
        }
    }
}

impl fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}): from {} to {} rows",
            self.action_type.display_name(),
            self.target,
            self.description,
            self.rows_before,
            self.rows_after
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Loaded,
    Exploded,
    Filtered,
    ColumnRenamed,
    RowsRemoved,
    Joined,
    DuplicatesRemoved,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Exploded => "Exploded",
            Self::Filtered => "Filtered",
            Self::ColumnRenamed => "Column Renamed",
            Self::RowsRemoved => "Rows Removed",
            Self::Joined => "Joined",
            Self::DuplicatesRemoved => "Duplicates Removed",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_names() {
        assert_eq!(ColumnType::Integer.to_string(), "integer");
        assert_eq!(ColumnType::Empty.to_string(), "empty");
        assert!(ColumnType::Real.is_numeric());
        assert!(!ColumnType::Text.is_numeric());
    }

    #[test]
    fn test_action_display() {
        let action = PipelineAction::new(
            ActionType::Filtered,
            "title.akas",
            "region in {US}",
            10,
            4,
        );
        assert_eq!(
            action.to_string(),
            "Filtered 'title.akas' (region in {US}): from 10 to 4 rows"
        );
    }

    #[test]
    fn test_failed_result_serialization() {
        let result = PipelineResult::failed("boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_profile_skips_absent_numeric_summary() {
        let profile = ColumnProfile {
            name: "primaryTitle".to_string(),
            unique_count: 2,
            total_count: 3,
            missing_count: 0,
            data_type: ColumnType::Text,
            classification: Classification::Nominal,
            numeric: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["data_type"], "text");
        assert_eq!(json["classification"], "nominal");
        assert!(json.get("numeric").is_none());
    }
}
