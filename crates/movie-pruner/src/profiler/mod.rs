//! Column profiling for data dictionaries.
//!
//! For every column the profiler reports:
//! - distinct, non-missing and missing counts
//! - the inferred primitive type
//! - the classification looked up in a [`ClassificationTable`]
//! - for numeric columns, range, central tendency and outliers

mod statistics;
mod type_inference;

pub use statistics::OUTLIER_Z_SCORE;

use crate::config::ClassificationTable;
use crate::error::Result;
use crate::relation::{Relation, row_key};
use crate::types::{ColumnProfile, DatasetProfile};
use std::collections::HashSet;
use tracing::{debug, info};

use statistics::{distinct_count, summarize};
use type_inference::{infer_column_type, numeric_values};

/// Profiles single columns against a classification table.
pub struct ColumnProfiler<'a> {
    classifications: &'a ClassificationTable,
}

impl<'a> ColumnProfiler<'a> {
    pub fn new(classifications: &'a ClassificationTable) -> Self {
        Self { classifications }
    }

    /// Profile one column of `relation`.
    ///
    /// Fails with [`crate::PrunerError::UnknownColumn`] when the table has no
    /// classification for the column, before any value is looked at.
    pub fn profile_column(&self, relation: &Relation, column: &str) -> Result<ColumnProfile> {
        let classification = self.classifications.classify(column)?;
        let cells: Vec<_> = relation.column(column)?.collect();

        let missing_count = cells.iter().filter(|c| c.is_missing()).count();
        let total_count = cells.len() - missing_count;
        let data_type = infer_column_type(cells.iter().copied());

        let (unique_count, numeric) = if data_type.is_numeric() {
            let values = numeric_values(cells.iter().copied());
            (distinct_count(&values), summarize(column, &values)?)
        } else {
            let distinct: HashSet<_> = cells
                .iter()
                .filter_map(|c| c.render())
                .collect();
            (distinct.len(), None)
        };

        debug!(
            "Profiled '{}': {} ({}), {} unique of {} values, {} missing",
            column, data_type, classification, unique_count, total_count, missing_count
        );

        Ok(ColumnProfile {
            name: column.to_string(),
            unique_count,
            total_count,
            missing_count,
            data_type,
            classification,
            numeric,
        })
    }
}

/// Profiles every column of a relation.
pub struct DatasetProfiler;

impl DatasetProfiler {
    /// One [`ColumnProfile`] per column, in column order.
    ///
    /// Every column is checked against the table first, so an unclassified
    /// column fails the run before any statistics are computed.
    pub fn profile(relation: &Relation, classifications: &ClassificationTable) -> Result<DatasetProfile> {
        for column in relation.columns() {
            classifications.classify(column)?;
        }

        let profiler = ColumnProfiler::new(classifications);
        let column_profiles = relation
            .columns()
            .iter()
            .map(|column| profiler.profile_column(relation, column))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Profiled {} columns of '{}' ({} rows)",
            column_profiles.len(),
            relation.name(),
            relation.height()
        );

        Ok(DatasetProfile {
            table: relation.name().to_string(),
            shape: relation.shape(),
            column_profiles,
        })
    }

    /// Number of rows that duplicate an earlier row.
    pub fn duplicate_rows(relation: &Relation) -> usize {
        let mut seen = HashSet::new();
        relation.rows().filter(|row| !seen.insert(row_key(row))).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Classification;
    use crate::relation::{Cell, column_names};
    use crate::types::ColumnType;
    use pretty_assertions::assert_eq;

    fn table() -> ClassificationTable {
        [
            ("votes", Classification::Scalar),
            ("title", Classification::Nominal),
            ("endYear", Classification::Scalar),
        ]
        .into_iter()
        .collect()
    }

    fn relation() -> Relation {
        let rows = [
            ("1", "Alpha", None::<&str>),
            ("2", "Beta", None),
            ("2", "Beta", None),
            ("3", "Gamma", None),
            ("100", "Alpha", None),
        ];
        Relation::from_rows(
            "sample",
            column_names(&["votes", "title", "endYear"]),
            rows.iter().map(|(v, t, e)| vec![Cell::text(v), Cell::text(t), Cell::from(*e)]),
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_column_profile() {
        let table = table();
        let profile = ColumnProfiler::new(&table)
            .profile_column(&relation(), "votes")
            .unwrap();
        assert_eq!(profile.unique_count, 4);
        assert_eq!(profile.total_count, 5);
        assert_eq!(profile.missing_count, 0);
        assert_eq!(profile.data_type, ColumnType::Integer);
        assert_eq!(profile.classification, Classification::Scalar);

        let numeric = profile.numeric.unwrap();
        assert!((numeric.mean - 21.6).abs() < 1e-9);
        assert_eq!(numeric.median, 2.0);
        assert_eq!(numeric.mode, 2.0);
        assert_eq!((numeric.min, numeric.max), (1.0, 100.0));
        // 3 sigma is about 117.6 here, so 100 is not flagged
        assert!(numeric.outliers.is_empty());
    }

    #[test]
    fn test_text_column_profile() {
        let table = table();
        let profile = ColumnProfiler::new(&table)
            .profile_column(&relation(), "title")
            .unwrap();
        assert_eq!(profile.unique_count, 3);
        assert_eq!(profile.data_type, ColumnType::Text);
        assert!(profile.numeric.is_none());
    }

    #[test]
    fn test_all_missing_column() {
        let table = table();
        let profile = ColumnProfiler::new(&table)
            .profile_column(&relation(), "endYear")
            .unwrap();
        assert_eq!(profile.data_type, ColumnType::Empty);
        assert_eq!(profile.unique_count, 0);
        assert_eq!(profile.total_count, 0);
        assert_eq!(profile.missing_count, 5);
        assert!(profile.numeric.is_none());
    }

    #[test]
    fn test_unknown_column_is_error() {
        let table: ClassificationTable = [("votes", Classification::Scalar)].into_iter().collect();
        let err = DatasetProfiler::profile(&relation(), &table).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_COLUMN");
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_dataset_profile_keeps_column_order() {
        let profile = DatasetProfiler::profile(&relation(), &table()).unwrap();
        let names: Vec<&str> = profile
            .column_profiles
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["votes", "title", "endYear"]);
        assert_eq!(profile.shape, (5, 3));
    }

    #[test]
    fn test_duplicate_rows() {
        assert_eq!(DatasetProfiler::duplicate_rows(&relation()), 1);
    }
}
