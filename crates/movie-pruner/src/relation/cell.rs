//! Cell values and the type inference rules applied to them.
//!
//! Everything is loaded as [`Cell::Text`] (or [`Cell::Missing`]) so that type
//! decisions are deferred. When a consumer needs typed values it goes through
//! [`Cell::infer`] and [`CellKind::merge`]; no other module parses numbers
//! out of cell text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single value in a [`Relation`](super::Relation).
///
/// Text is reference counted: exploding and joining copy cells many times
/// over, and sharing the backing string keeps that cheap.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(Arc<str>),
    Integer(i64),
    Real(f64),
    Missing,
}

impl Cell {
    /// Build a text cell.
    pub fn text(value: impl AsRef<str>) -> Self {
        Cell::Text(Arc::from(value.as_ref()))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Render the value the way it is written to disk. Missing renders as `None`
    /// so the caller decides which sentinel to use.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.to_string()),
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Real(r) => Some(r.to_string()),
            Cell::Missing => None,
        }
    }

    /// Re-type a text cell according to the inference rules.
    ///
    /// Rules, in order:
    /// 1. surrounding whitespace is ignored for the numeric checks
    /// 2. a value that parses as `i64` is an [`Cell::Integer`]
    /// 3. a value that parses as a finite `f64` is a [`Cell::Real`]
    /// 4. anything else stays [`Cell::Text`]
    ///
    /// Already typed cells and [`Cell::Missing`] are returned unchanged.
    pub fn infer(&self) -> Cell {
        match self {
            Cell::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Cell::Integer(i)
                } else if let Some(r) = parse_finite(trimmed) {
                    Cell::Real(r)
                } else {
                    self.clone()
                }
            }
            other => other.clone(),
        }
    }

    /// Numeric view of the cell, if it has one after inference.
    pub fn as_f64(&self) -> Option<f64> {
        match self.infer() {
            Cell::Integer(i) => Some(i as f64),
            Cell::Real(r) => Some(r),
            _ => None,
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Text(_) => CellKind::Text,
            Cell::Integer(_) => CellKind::Integer,
            Cell::Real(_) => CellKind::Real,
            Cell::Missing => CellKind::Missing,
        }
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    // "inf" and "NaN" parse as f64 but are labels in the extracts, not numbers
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(r) => write!(f, "{r}"),
            Cell::Missing => f.write_str("<missing>"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Missing, Cell::text)
    }
}

/// The primitive type of a cell, and, folded over a column, of the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Integer,
    Real,
    Text,
    /// Only missing values were seen.
    Missing,
}

impl CellKind {
    /// Combine the kind seen so far with the kind of the next value.
    ///
    /// Missing is the identity, integers widen to reals, and any text makes
    /// the whole column text.
    pub fn merge(self, other: CellKind) -> CellKind {
        use CellKind::*;
        match (self, other) {
            (Missing, k) | (k, Missing) => k,
            (Text, _) | (_, Text) => Text,
            (Real, _) | (_, Real) => Real,
            (Integer, Integer) => Integer,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, CellKind::Integer | CellKind::Real)
    }
}
