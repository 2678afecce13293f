//! In-memory relations.
//!
//! A [`Relation`] is an ordered list of uniquely named columns over an arena of
//! cells stored row-major: row `i` occupies `cells[i * width..(i + 1) * width]`.
//! Stages never mutate a relation they were handed; they read it and build a
//! new one, usually by selecting row indices out of the arena.

mod cell;

pub use cell::{Cell, CellKind};

use crate::error::{PrunerError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    name: String,
    columns: Vec<String>,
    cells: Vec<Cell>,
}

impl Relation {
    /// Create an empty relation with the given column names.
    ///
    /// Fails if there are no columns or a name is repeated.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(PrunerError::Internal(format!(
                "relation '{name}' must have at least one column"
            )));
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(PrunerError::DuplicateColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }
        Ok(Self {
            name,
            columns,
            cells: Vec::new(),
        })
    }

    /// Create a relation and fill it with `rows`.
    pub fn from_rows<I>(name: impl Into<String>, columns: Vec<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Cell>>,
    {
        let mut relation = Self::new(name, columns)?;
        for row in rows {
            relation.push_row(row)?;
        }
        Ok(relation)
    }

    /// Append a row while the relation is being built.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.width() {
            return Err(PrunerError::Internal(format!(
                "row with {} values pushed into '{}' which has {} columns",
                row.len(),
                self.name,
                self.width()
            )));
        }
        self.cells.extend(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same relation under a different table name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.cells.len() / self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Position of `column`, or [`PrunerError::ColumnNotFound`].
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PrunerError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        let width = self.width();
        &self.cells[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks_exact(self.width())
    }

    /// Iterate the values of one column in row order.
    pub fn column<'a>(
        &'a self,
        column: &str,
    ) -> Result<impl Iterator<Item = &'a Cell> + use<'a>> {
        let index = self.column_index(column)?;
        Ok(self.rows().map(move |row| &row[index]))
    }

    /// Rename a column, keeping its position.
    ///
    /// Renaming onto another existing column is rejected; renaming a column to
    /// its own name is a no-op.
    pub fn rename_column(mut self, from: &str, to: &str) -> Result<Self> {
        let index = self.column_index(from)?;
        if from != to && self.has_column(to) {
            return Err(PrunerError::DuplicateColumn {
                table: self.name,
                column: to.to_string(),
            });
        }
        self.columns[index] = to.to_string();
        Ok(self)
    }

    /// Build a new relation from the given row indices, in the given order.
    pub fn select_rows<I>(&self, indices: I) -> Relation
    where
        I: IntoIterator<Item = usize>,
    {
        let mut cells = Vec::new();
        for index in indices {
            cells.extend_from_slice(self.row(index));
        }
        Relation {
            name: self.name.clone(),
            columns: self.columns.clone(),
            cells,
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Relation {
        self.select_rows(0..n.min(self.height()))
    }

    /// Drop rows that repeat an earlier row exactly; first occurrences are kept
    /// in their original order.
    pub fn distinct(&self) -> Relation {
        let mut seen = HashSet::with_capacity(self.height());
        let keep: Vec<usize> = self
            .rows()
            .enumerate()
            .filter(|(_, row)| seen.insert(row_key(row)))
            .map(|(index, _)| index)
            .collect();
        self.select_rows(keep)
    }

    /// Count occurrences of each value of `column`, missing included.
    ///
    /// Sorted by descending count; equal counts keep first-seen order.
    pub fn value_counts(&self, column: &str) -> Result<Vec<(Cell, usize)>> {
        let mut positions: HashMap<Option<String>, usize> = HashMap::new();
        let mut counts: Vec<(Cell, usize)> = Vec::new();
        for cell in self.column(column)? {
            match positions.get(&cell.render()) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    positions.insert(cell.render(), counts.len());
                    counts.push((cell.clone(), 1));
                }
            }
        }
        // stable sort keeps first-seen order among ties
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts)
    }
}

/// Hashable identity of a row, missing distinct from every text value.
pub(crate) fn row_key(row: &[Cell]) -> Vec<Option<String>> {
    row.iter().map(Cell::render).collect()
}

/// Convenience for building column lists in tests and fixtures.
pub fn column_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Relation {
        Relation::from_rows(
            "ratings",
            column_names(&["tconst", "averageRating"]),
            vec![
                vec![Cell::text("tt01"), Cell::text("5.7")],
                vec![Cell::text("tt02"), Cell::Missing],
                vec![Cell::text("tt01"), Cell::text("5.7")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_rows() {
        let relation = sample();
        assert_eq!(relation.shape(), (3, 2));
        assert_eq!(relation.row(1), &[Cell::text("tt02"), Cell::Missing]);
        assert_eq!(relation.rows().count(), 3);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Relation::new("t", column_names(&["a", "a"]));
        assert!(matches!(result, Err(PrunerError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_push_row_width_checked() {
        let mut relation = Relation::new("t", column_names(&["a", "b"])).unwrap();
        assert!(relation.push_row(vec![Cell::text("x")]).is_err());
    }

    #[test]
    fn test_missing_column() {
        let err = sample().column_index("numVotes").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_rename_column() {
        let renamed = sample().rename_column("tconst", "titleId").unwrap();
        assert_eq!(renamed.columns(), &["titleId", "averageRating"]);
        assert!(sample().rename_column("tconst", "averageRating").is_err());
        assert!(sample().rename_column("tconst", "tconst").is_ok());
    }

    #[test]
    fn test_distinct_keeps_first() {
        let distinct = sample().distinct();
        assert_eq!(distinct.height(), 2);
        assert_eq!(distinct.row(0)[0], Cell::text("tt01"));
        assert_eq!(distinct.row(1)[0], Cell::text("tt02"));
    }

    #[test]
    fn test_value_counts_order() {
        let counts = sample().value_counts("averageRating").unwrap();
        assert_eq!(counts, vec![(Cell::text("5.7"), 2), (Cell::Missing, 1)]);
    }

    #[test]
    fn test_head() {
        assert_eq!(sample().head(2).height(), 2);
        assert_eq!(sample().head(10).height(), 3);
    }
}
