//! Column-level type inference.

use crate::relation::{Cell, CellKind};
use crate::types::ColumnType;

/// Fold the inferred kind of every cell into one column type.
///
/// Missing values are ignored; one text value makes the column text and one
/// real makes an integer column real. A column with nothing but missing
/// values is [`ColumnType::Empty`].
pub(crate) fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Cell>,
{
    let kind = cells
        .into_iter()
        .map(|cell| cell.infer().kind())
        .fold(CellKind::Missing, CellKind::merge);

    match kind {
        CellKind::Integer => ColumnType::Integer,
        CellKind::Real => ColumnType::Real,
        CellKind::Text => ColumnType::Text,
        CellKind::Missing => ColumnType::Empty,
    }
}

/// Non-missing values of a numeric column, in row order.
///
/// Only meaningful once [`infer_column_type`] reported a numeric type; any
/// value without a numeric reading is skipped.
pub(crate) fn numeric_values<'a, I>(cells: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Cell>,
{
    cells.into_iter().filter_map(Cell::as_f64).collect()
}
