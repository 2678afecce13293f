//! Pre-join key checks.
//!
//! A key column is well formed when every value matches the identifier
//! pattern. A failed check is a decision point: the caller either removes the
//! offending rows with [`KeyValidator::retain_well_formed`] or turns the
//! report into an error with [`KeyReport::ensure_valid`].

use crate::config::MISSING_TOKEN;
use crate::error::{PrunerError, Result};
use crate::relation::{Cell, Relation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// IMDb title identifiers: `tt` followed by digits, nothing else.
pub static TITLE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tt[0-9]+$").expect("Invalid regex: title id"));

/// Result of checking one key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReport {
    pub table: String,
    pub column: String,
    pub total: usize,
    pub malformed: usize,
    /// How many of the malformed values are missing.
    pub missing: usize,
    /// Most frequent malformed values with their counts, most frequent first.
    /// Missing values are shown as the validator's missing token.
    pub top_offenders: Vec<(String, usize)>,
}

impl KeyReport {
    pub fn all_well_formed(&self) -> bool {
        self.malformed == 0
    }

    /// Whether the malformed keys are all the missing sentinel, the pattern of
    /// systematic missing data rather than corruption.
    pub fn only_missing(&self) -> bool {
        self.malformed > 0 && self.missing == self.malformed
    }

    /// Turn a failed check into a [`PrunerError::Validation`] naming the
    /// column, the count and the most frequent offenders.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.all_well_formed() {
            return Ok(());
        }
        Err(PrunerError::Validation {
            stage: "Key validation".to_string(),
            table: self.table.clone(),
            column: self.column.clone(),
            malformed: self.malformed,
            samples: self
                .top_offenders
                .iter()
                .map(|(value, count)| format!("{value} (x{count})"))
                .collect(),
        })
    }
}

/// Checks key columns against an identifier pattern.
#[derive(Debug, Clone)]
pub struct KeyValidator {
    pattern: Regex,
    top_n: usize,
    missing_token: String,
}

impl Default for KeyValidator {
    fn default() -> Self {
        Self::title_ids(5)
    }
}

impl KeyValidator {
    pub fn new(pattern: Regex, top_n: usize) -> Self {
        Self {
            pattern,
            top_n,
            missing_token: MISSING_TOKEN.to_string(),
        }
    }

    /// Spelling used for missing values in reports; normally the first
    /// missing token of the loader.
    pub fn with_missing_token(mut self, token: impl Into<String>) -> Self {
        self.missing_token = token.into();
        self
    }

    /// Validator for IMDb title identifiers keeping `top_n` offenders.
    pub fn title_ids(top_n: usize) -> Self {
        Self::new(TITLE_ID_PATTERN.clone(), top_n)
    }

    pub fn is_well_formed(&self, cell: &Cell) -> bool {
        cell.render().is_some_and(|value| self.pattern.is_match(&value))
    }

    /// Count malformed values of `column` and collect the most frequent ones.
    pub fn validate(&self, relation: &Relation, column: &str) -> Result<KeyReport> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut total = 0;
        let mut malformed = 0;
        let mut missing = 0;

        for cell in relation.column(column)? {
            total += 1;
            if self.is_well_formed(cell) {
                continue;
            }
            malformed += 1;
            let shown = match cell.render() {
                Some(value) => value,
                None => {
                    missing += 1;
                    self.missing_token.clone()
                }
            };
            let first_seen = counts.len();
            counts.entry(shown).or_insert((first_seen, 0)).1 += 1;
        }

        let mut offenders: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(value, (first_seen, count))| (value, count, first_seen))
            .collect();
        offenders.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let top_offenders = offenders
            .into_iter()
            .take(self.top_n)
            .map(|(value, count, _)| (value, count))
            .collect();

        let report = KeyReport {
            table: relation.name().to_string(),
            column: column.to_string(),
            total,
            malformed,
            missing,
            top_offenders,
        };
        if report.all_well_formed() {
            debug!("All {} keys of '{}' are well formed", total, report.table);
        } else {
            warn!(
                "{} of {} '{}' keys in '{}' are malformed; most frequent: {:?}",
                malformed, total, column, report.table, report.top_offenders
            );
        }
        Ok(report)
    }

    /// Keep only the rows whose `column` value is well formed.
    pub fn retain_well_formed(&self, relation: &Relation, column: &str) -> Result<Relation> {
        let index = relation.column_index(column)?;
        let keep: Vec<usize> = relation
            .rows()
            .enumerate()
            .filter(|(_, row)| self.is_well_formed(&row[index]))
            .map(|(i, _)| i)
            .collect();
        Ok(relation.select_rows(keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::column_names;
    use pretty_assertions::assert_eq;

    fn keyed(values: &[Option<&str>]) -> Relation {
        Relation::from_rows(
            "name.basics",
            column_names(&["tconst"]),
            values.iter().map(|v| vec![Cell::from(*v)]),
        )
        .unwrap()
    }

    #[test]
    fn test_all_well_formed() {
        let report = KeyValidator::default()
            .validate(&keyed(&[Some("tt0000001"), Some("tt42")]), "tconst")
            .unwrap();
        assert!(report.all_well_formed());
        assert_eq!(report.total, 2);
        assert!(report.top_offenders.is_empty());
        assert!(report.ensure_valid().is_ok());
    }

    #[test]
    fn test_missing_sentinel_dominates() {
        let relation = keyed(&[
            Some("tt01"),
            None,
            Some("nm01"),
            None,
            None,
            Some("tt"),
            Some("tt12x"),
        ]);
        let report = KeyValidator::default().validate(&relation, "tconst").unwrap();
        assert_eq!(report.malformed, 6);
        assert_eq!(report.top_offenders[0], ("\\N".to_string(), 3));
        assert_eq!(report.top_offenders[1], ("nm01".to_string(), 1));
        assert!(!report.only_missing());
    }

    #[test]
    fn test_only_missing() {
        let report = KeyValidator::default()
            .validate(&keyed(&[Some("tt01"), None, None]), "tconst")
            .unwrap();
        assert!(report.only_missing());
    }

    #[test]
    fn test_custom_missing_token_in_report() {
        let validator = KeyValidator::default().with_missing_token("NA");
        let report = validator
            .validate(&keyed(&[Some("tt01"), None, None]), "tconst")
            .unwrap();
        assert_eq!(report.top_offenders, vec![("NA".to_string(), 2)]);
        assert_eq!(report.missing, 2);
        assert!(report.only_missing());
        assert!(report.ensure_valid().unwrap_err().to_string().contains("NA (x2)"));
    }

    #[test]
    fn test_literal_token_text_is_not_missing() {
        // a present value spelled like the token is corruption, not missing data
        let report = KeyValidator::default()
            .validate(&keyed(&[Some("\\N"), None]), "tconst")
            .unwrap();
        assert_eq!(report.malformed, 2);
        assert_eq!(report.missing, 1);
        assert!(!report.only_missing());
    }

    #[test]
    fn test_top_n_limit() {
        let report = KeyValidator::title_ids(1)
            .validate(&keyed(&[Some("a"), Some("b"), Some("b")]), "tconst")
            .unwrap();
        assert_eq!(report.top_offenders, vec![("b".to_string(), 2)]);
    }

    #[test]
    fn test_ensure_valid_error_names_column() {
        let report = KeyValidator::default()
            .validate(&keyed(&[None, Some("tt01")]), "tconst")
            .unwrap();
        let err = report.ensure_valid().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILURE");
        let message = err.to_string();
        assert!(message.contains("tconst"));
        assert!(message.contains("name.basics"));
        assert!(message.contains("\\N"));
    }

    #[test]
    fn test_retain_well_formed() {
        let cleaned = KeyValidator::default()
            .retain_well_formed(&keyed(&[Some("tt01"), None, Some("tt02")]), "tconst")
            .unwrap();
        assert_eq!(cleaned.height(), 2);
        let report = KeyValidator::default().validate(&cleaned, "tconst").unwrap();
        assert!(report.all_well_formed());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let validator = KeyValidator::default();
        assert!(validator.is_well_formed(&Cell::text("tt123")));
        assert!(!validator.is_well_formed(&Cell::text("xtt123")));
        assert!(!validator.is_well_formed(&Cell::text("tt123 ")));
        assert!(!validator.is_well_formed(&Cell::Missing));
    }
}
