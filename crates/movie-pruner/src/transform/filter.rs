//! Row filters based on set membership.

use crate::error::Result;
use crate::relation::{Cell, Relation};
use std::collections::{BTreeSet, HashSet};
use tracing::info;

/// Row predicate: the value of `column` is one of `allowed`.
///
/// Missing values never match, whatever the set holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberOf {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

impl MemberOf {
    pub fn new<I, S>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, cell: &Cell) -> bool {
        match cell {
            Cell::Missing => false,
            Cell::Text(s) => self.allowed.contains(&**s),
            other => other
                .render()
                .is_some_and(|text| self.allowed.contains(&text)),
        }
    }
}

pub struct RelationFilter;

impl RelationFilter {
    /// Keep the rows whose value in `predicate.column` is in the allowed set.
    /// Surviving rows keep their relative order.
    pub fn retain(relation: &Relation, predicate: &MemberOf) -> Result<Relation> {
        let index = relation.column_index(&predicate.column)?;
        let keep: Vec<usize> = relation
            .rows()
            .enumerate()
            .filter(|(_, row)| predicate.matches(&row[index]))
            .map(|(i, _)| i)
            .collect();

        let filtered = relation.select_rows(keep);
        info!(
            "Filtered '{}' on {} in {:?}: from {} to {} rows",
            relation.name(),
            predicate.column,
            predicate.allowed,
            relation.height(),
            filtered.height()
        );
        Ok(filtered)
    }

    /// Keep every row whose `key_column` value belongs to a key that matches
    /// `predicate` on at least one row.
    ///
    /// This keeps a person's full record (every profession row) once one of
    /// their rows qualifies.
    pub fn retain_by_key(
        relation: &Relation,
        key_column: &str,
        predicate: &MemberOf,
    ) -> Result<Relation> {
        let keys = Self::qualifying_keys(relation, key_column, predicate)?;
        let key_index = relation.column_index(key_column)?;
        let keep: Vec<usize> = relation
            .rows()
            .enumerate()
            .filter(|(_, row)| row[key_index].render().is_some_and(|k| keys.contains(&k)))
            .map(|(i, _)| i)
            .collect();

        let filtered = relation.select_rows(keep);
        info!(
            "Filtered '{}' to {} {} value(s) with {} in {:?}: from {} to {} rows",
            relation.name(),
            keys.len(),
            key_column,
            predicate.column,
            predicate.allowed,
            relation.height(),
            filtered.height()
        );
        Ok(filtered)
    }

    /// Distinct non-missing `key_column` values of the rows matching `predicate`.
    pub fn qualifying_keys(
        relation: &Relation,
        key_column: &str,
        predicate: &MemberOf,
    ) -> Result<HashSet<String>> {
        let key_index = relation.column_index(key_column)?;
        let index = relation.column_index(&predicate.column)?;
        Ok(relation
            .rows()
            .filter(|row| predicate.matches(&row[index]))
            .filter_map(|row| row[key_index].render())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::column_names;
    use pretty_assertions::assert_eq;

    fn names() -> Relation {
        let rows = [
            ("nm01", "actor"),
            ("nm01", "soundtrack"),
            ("nm02", "writer"),
            ("nm03", "actress"),
            ("nm03", "producer"),
            ("nm04", "\\N"),
            ("nm05", "miscellaneous"),
        ];
        Relation::from_rows(
            "name.basics",
            column_names(&["nconst", "primaryProfession"]),
            rows.iter().map(|(id, prof)| {
                let prof = if *prof == "\\N" {
                    Cell::Missing
                } else {
                    Cell::text(prof)
                };
                vec![Cell::text(id), prof]
            }),
        )
        .unwrap()
    }

    fn ids(relation: &Relation, column: &str) -> Vec<String> {
        relation
            .column(column)
            .unwrap()
            .map(|c| c.render().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_retain_direct() {
        let actors = MemberOf::new("primaryProfession", ["actor", "actress"]);
        let filtered = RelationFilter::retain(&names(), &actors).unwrap();
        assert_eq!(ids(&filtered, "nconst"), vec!["nm01", "nm03"]);
    }

    #[test]
    fn test_retain_by_key_keeps_full_record() {
        let actors = MemberOf::new("primaryProfession", ["actor", "actress"]);
        let filtered = RelationFilter::retain_by_key(&names(), "nconst", &actors).unwrap();
        assert_eq!(ids(&filtered, "nconst"), vec!["nm01", "nm01", "nm03", "nm03"]);
        assert_eq!(
            ids(&filtered, "primaryProfession"),
            vec!["actor", "soundtrack", "actress", "producer"]
        );
    }

    #[test]
    fn test_missing_never_matches() {
        let predicate = MemberOf::new("primaryProfession", ["\\N", ""]);
        let filtered = RelationFilter::retain(&names(), &predicate).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let predicate = MemberOf::new("primaryProfession", ["actor", "writer"]);
        let once = RelationFilter::retain(&names(), &predicate).unwrap();
        let twice = RelationFilter::retain(&once, &predicate).unwrap();
        assert_eq!(once, twice);

        let by_key_once = RelationFilter::retain_by_key(&names(), "nconst", &predicate).unwrap();
        let by_key_twice =
            RelationFilter::retain_by_key(&by_key_once, "nconst", &predicate).unwrap();
        assert_eq!(by_key_once, by_key_twice);
    }

    #[test]
    fn test_typed_cells_compare_rendered() {
        let relation = Relation::from_rows(
            "t",
            column_names(&["isAdult"]),
            vec![vec![Cell::Integer(0)], vec![Cell::Integer(1)]],
        )
        .unwrap();
        let filtered = RelationFilter::retain(&relation, &MemberOf::new("isAdult", ["0"])).unwrap();
        assert_eq!(filtered.height(), 1);
    }

    #[test]
    fn test_unknown_column() {
        let predicate = MemberOf::new("region", ["US"]);
        assert!(RelationFilter::retain(&names(), &predicate).is_err());
    }
}
