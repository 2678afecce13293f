//! Splitting multi-valued cells into one row per value.

use crate::error::{PrunerError, Result};
use crate::relation::{Cell, Relation};
use tracing::{debug, info};

/// Outcome of an explode, kept for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplodeStats {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Sum over input rows of `1 + delimiter occurrences`, missing counting 1.
    pub expected_rows: usize,
}

pub struct ColumnExploder;

impl ColumnExploder {
    /// Replace each row by one row per element of `column` split on `delimiter`.
    ///
    /// Other columns are copied unchanged, exploded rows stay contiguous and in
    /// split order. A missing cell yields a single row that keeps the missing
    /// marker, and an empty string yields a single empty element.
    ///
    /// The output row count is checked against the delimiter count of the
    /// input before returning.
    pub fn explode(relation: &Relation, column: &str, delimiter: char) -> Result<Relation> {
        Self::explode_with_stats(relation, column, delimiter).map(|(exploded, _)| exploded)
    }

    pub fn explode_with_stats(
        relation: &Relation,
        column: &str,
        delimiter: char,
    ) -> Result<(Relation, ExplodeStats)> {
        let target = relation.column_index(column)?;
        let expected_rows = Self::expected_rows(relation, column, delimiter)?;

        let mut exploded = Relation::new(relation.name(), relation.columns().to_vec())?;
        for row in relation.rows() {
            match row[target].render() {
                Some(value) if value.contains(delimiter) => {
                    for element in value.split(delimiter) {
                        let mut out = row.to_vec();
                        out[target] = Cell::text(element);
                        exploded.push_row(out)?;
                    }
                }
                _ => exploded.push_row(row.to_vec())?,
            }
        }

        let stats = ExplodeStats {
            rows_before: relation.height(),
            rows_after: exploded.height(),
            expected_rows,
        };
        if stats.rows_after != stats.expected_rows {
            return Err(PrunerError::Validation {
                stage: "Explode count check".to_string(),
                table: relation.name().to_string(),
                column: column.to_string(),
                malformed: stats.rows_after.abs_diff(stats.expected_rows),
                samples: Vec::new(),
            });
        }

        info!(
            "Exploded '{}' of '{}': from {} to {} rows",
            column,
            relation.name(),
            stats.rows_before,
            stats.rows_after
        );
        Ok((exploded, stats))
    }

    /// Rows an explode of `column` must produce: for every row,
    /// `1 + number of delimiters` in the cell, with a missing cell counting once.
    pub fn expected_rows(relation: &Relation, column: &str, delimiter: char) -> Result<usize> {
        let expected = relation
            .column(column)?
            .map(|cell| match cell {
                Cell::Missing => 1,
                other => 1 + other
                    .render()
                    .map_or(0, |text| text.matches(delimiter).count()),
            })
            .sum();
        debug!("Expected {} rows after exploding '{}'", expected, column);
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::column_names;
    use pretty_assertions::assert_eq;

    fn basics() -> Relation {
        Relation::from_rows(
            "title.basics",
            column_names(&["tconst", "titleType", "genres"]),
            vec![
                vec![
                    Cell::text("tt01"),
                    Cell::text("movie"),
                    Cell::text("Comedy,Drama,Romance"),
                ],
                vec![Cell::text("tt02"), Cell::text("short"), Cell::Missing],
                vec![Cell::text("tt03"), Cell::text("movie"), Cell::text("Horror")],
                vec![Cell::text("tt04"), Cell::text("movie"), Cell::text("")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_explode_rows_and_order() {
        let exploded = ColumnExploder::explode(&basics(), "genres", ',').unwrap();
        let genres: Vec<Cell> = exploded.column("genres").unwrap().cloned().collect();
        assert_eq!(
            genres,
            vec![
                Cell::text("Comedy"),
                Cell::text("Drama"),
                Cell::text("Romance"),
                Cell::Missing,
                Cell::text("Horror"),
                Cell::text(""),
            ]
        );
        let ids: Vec<Cell> = exploded.column("tconst").unwrap().cloned().collect();
        assert_eq!(&ids[..3], &[Cell::text("tt01"), Cell::text("tt01"), Cell::text("tt01")]);
        assert_eq!(exploded.columns(), basics().columns());
    }

    #[test]
    fn test_explode_count_matches_delimiters() {
        let (exploded, stats) =
            ColumnExploder::explode_with_stats(&basics(), "genres", ',').unwrap();
        assert_eq!(stats.rows_before, 4);
        assert_eq!(stats.expected_rows, 6);
        assert_eq!(stats.rows_after, exploded.height());
    }

    #[test]
    fn test_trailing_delimiter_yields_empty_element() {
        let relation = Relation::from_rows(
            "t",
            column_names(&["k", "v"]),
            vec![vec![Cell::text("a"), Cell::text("x,,y,")]],
        )
        .unwrap();
        let exploded = ColumnExploder::explode(&relation, "v", ',').unwrap();
        assert_eq!(exploded.height(), 4);
        assert_eq!(exploded.row(1)[1], Cell::text(""));
    }

    #[test]
    fn test_explode_twice_multiplies() {
        let names = Relation::from_rows(
            "name.basics",
            column_names(&["nconst", "primaryProfession", "knownForTitles"]),
            vec![vec![
                Cell::text("nm01"),
                Cell::text("actor,producer"),
                Cell::text("tt01,tt02,tt03"),
            ]],
        )
        .unwrap();
        let by_title = ColumnExploder::explode(&names, "knownForTitles", ',').unwrap();
        let by_both = ColumnExploder::explode(&by_title, "primaryProfession", ',').unwrap();
        assert_eq!(by_title.height(), 3);
        assert_eq!(by_both.height(), 6);
    }

    #[test]
    fn test_unknown_column() {
        let err = ColumnExploder::explode(&basics(), "nope", ',').unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_input_is_untouched() {
        let original = basics();
        let _ = ColumnExploder::explode(&original, "genres", ',').unwrap();
        assert_eq!(original, basics());
    }
}
