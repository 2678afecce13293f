//! Inner equi-joins on a shared key column.
//!
//! Each join builds a hash index over the right relation's key and probes it
//! with the left relation's rows in order. Output rows therefore come out
//! ordered by left row, then by right row, which makes a chain of joins give
//! the same relation however it is parenthesized.

use crate::error::{PrunerError, Result};
use crate::relation::{Cell, Relation};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub struct RelationJoiner;

impl RelationJoiner {
    /// Inner join of `left` and `right` on `key`.
    ///
    /// The output has the key column first, then the other columns of `left`,
    /// then those of `right`. A key present `m` times on the left and `n` times
    /// on the right yields `m * n` rows. Missing keys never match.
    pub fn join(left: &Relation, right: &Relation, key: &str) -> Result<Relation> {
        Self::check_pair(left, right, key)?;
        let left_key = left.column_index(key)?;
        let right_key = right.column_index(key)?;

        let mut index: HashMap<Cow<'_, str>, Vec<usize>> = HashMap::new();
        for (row_id, row) in right.rows().enumerate() {
            if let Some(k) = key_text(&row[right_key]) {
                index.entry(k).or_default().push(row_id);
            }
        }
        debug!(
            "Built join index on '{}' of '{}': {} distinct keys",
            key,
            right.name(),
            index.len()
        );

        let mut columns = Vec::with_capacity(left.width() + right.width() - 1);
        columns.push(key.to_string());
        columns.extend(non_key(left, key).cloned());
        columns.extend(non_key(right, key).cloned());

        let mut joined = Relation::new(format!("{}+{}", left.name(), right.name()), columns)?;
        for left_row in left.rows() {
            let Some(k) = key_text(&left_row[left_key]) else {
                continue;
            };
            let Some(matches) = index.get(&*k) else {
                continue;
            };
            for &right_id in matches {
                let right_row = right.row(right_id);
                let mut out = Vec::with_capacity(joined.width());
                out.push(left_row[left_key].clone());
                out.extend(without(left_row, left_key).cloned());
                out.extend(without(right_row, right_key).cloned());
                joined.push_row(out)?;
            }
        }

        info!(
            "Joined '{}' ({} rows) with '{}' ({} rows) on {}: {} rows",
            left.name(),
            left.height(),
            right.name(),
            right.height(),
            key,
            joined.height()
        );
        Ok(joined)
    }

    /// Join all `relations` left to right on `key`.
    ///
    /// Every pair is collision-checked before the first join runs, so a
    /// conflict fails fast without partial work.
    pub fn join_all(relations: &[&Relation], key: &str) -> Result<Relation> {
        let (first, rest) = relations.split_first().ok_or_else(|| {
            PrunerError::Internal("join requires at least one relation".to_string())
        })?;
        Self::check_schemas(relations, key)?;

        let mut acc = (*first).clone();
        for relation in rest {
            acc = Self::join(&acc, relation, key)?;
        }
        Ok(acc)
    }

    /// Fail with [`PrunerError::SchemaConflict`] if any two relations share a
    /// non-key column, or [`PrunerError::ColumnNotFound`] if one lacks the key.
    pub fn check_schemas(relations: &[&Relation], key: &str) -> Result<()> {
        for relation in relations {
            relation.column_index(key)?;
        }
        for (i, left) in relations.iter().enumerate() {
            for right in &relations[i + 1..] {
                Self::check_pair(left, right, key)?;
            }
        }
        Ok(())
    }

    fn check_pair(left: &Relation, right: &Relation, key: &str) -> Result<()> {
        let left_columns: HashSet<&String> = non_key(left, key).collect();
        let shared: Vec<String> = non_key(right, key)
            .filter(|c| left_columns.contains(c))
            .cloned()
            .collect();
        if shared.is_empty() {
            Ok(())
        } else {
            Err(PrunerError::SchemaConflict {
                left: left.name().to_string(),
                right: right.name().to_string(),
                columns: shared,
            })
        }
    }

    /// Row count the inner join of `relations` must have: for every key present
    /// in all of them, the product of its per-relation multiplicities, summed.
    ///
    /// Independent of join order; the pipeline compares it with the actual
    /// output as a self-check.
    pub fn expected_row_count(relations: &[&Relation], key: &str) -> Result<usize> {
        let mut multiplicities = Vec::with_capacity(relations.len());
        for relation in relations {
            let mut counts: HashMap<Cow<'_, str>, usize> = HashMap::new();
            for cell in relation.column(key)? {
                if let Some(k) = key_text(cell) {
                    *counts.entry(k).or_default() += 1;
                }
            }
            multiplicities.push(counts);
        }

        let Some((first, rest)) = multiplicities.split_first() else {
            return Ok(0);
        };
        let total = first
            .iter()
            .map(|(k, &count)| {
                rest.iter().fold(count, |acc, other| {
                    acc.saturating_mul(other.get(&**k).copied().unwrap_or(0))
                })
            })
            .sum();
        Ok(total)
    }
}

fn key_text(cell: &Cell) -> Option<Cow<'_, str>> {
    match cell {
        Cell::Text(s) => Some(Cow::Borrowed(&**s)),
        Cell::Missing => None,
        other => other.render().map(Cow::Owned),
    }
}

fn non_key<'a>(relation: &'a Relation, key: &'a str) -> impl Iterator<Item = &'a String> {
    relation.columns().iter().filter(move |c| c.as_str() != key)
}

fn without(row: &[Cell], skip: usize) -> impl Iterator<Item = &Cell> {
    row.iter()
        .enumerate()
        .filter(move |(i, _)| *i != skip)
        .map(|(_, cell)| cell)
}
