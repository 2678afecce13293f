//! Configuration types for the title pipeline and the profiler.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use crate::error::{PrunerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// The token IMDb extracts use for a missing value.
pub const MISSING_TOKEN: &str = "\\N";

/// How raw bytes are turned into text when loading a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextEncoding {
    /// Reject invalid UTF-8 with a format error.
    #[default]
    Utf8,
    /// Replace invalid UTF-8 sequences with U+FFFD.
    Utf8Lossy,
}

/// What to do when one key appears several times on a side of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JoinMultiplicity {
    /// Standard relational semantics: matching rows multiply.
    #[default]
    Preserve,
    /// Multiply as usual, then drop output rows that repeat exactly.
    DistinctRows,
}

/// Options for reading and writing delimited text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Field delimiter. Default: tab
    pub delimiter: u8,
    /// Cell values read as missing. The first one is also what gets written
    /// for a missing value. Default: `["\N"]`
    pub missing_tokens: Vec<String>,
    /// Whether `"` quotes fields. IMDb extracts contain bare quote characters
    /// inside titles, so this is off by default.
    pub quoting: bool,
    /// Default: strict UTF-8
    pub encoding: TextEncoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            missing_tokens: vec![MISSING_TOKEN.to_string()],
            quoting: false,
            encoding: TextEncoding::default(),
        }
    }
}

impl LoadOptions {
    /// Token written for a missing value.
    pub fn missing_token(&self) -> &str {
        self.missing_tokens
            .first()
            .map(String::as_str)
            .unwrap_or(MISSING_TOKEN)
    }

    pub fn is_missing(&self, value: &str) -> bool {
        self.missing_tokens.iter().any(|token| token == value)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if matches!(self.delimiter, b'\n' | b'\r') {
            return Err(ConfigValidationError::InvalidDelimiter(
                self.delimiter as char,
            ));
        }
        if self.missing_tokens.is_empty() {
            return Err(ConfigValidationError::EmptySet("missing_tokens".to_string()));
        }
        Ok(())
    }
}

/// File names of the four IMDb extracts, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFiles {
    pub akas: PathBuf,
    pub basics: PathBuf,
    pub ratings: PathBuf,
    pub names: PathBuf,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            akas: PathBuf::from("title.akas.tsv"),
            basics: PathBuf::from("title.basics.tsv"),
            ratings: PathBuf::from("title.ratings.tsv"),
            names: PathBuf::from("name.basics.tsv"),
        }
    }
}

/// Configuration for the title pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use movie_pruner::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir("data")
///     .regions(["US", "GB"])
///     .remediate_malformed_keys(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the four source files.
    /// Default: "data"
    pub data_dir: PathBuf,

    /// Source file names inside `data_dir`.
    pub sources: SourceFiles,

    /// Where the combined relation is written. Existing files are overwritten.
    /// Default: "data/us.movies.actors.tsv"
    pub output_path: PathBuf,

    /// Reading/writing options shared by all files.
    pub load: LoadOptions,

    /// Separator inside multi-valued cells (genres, professions, known-for titles).
    /// Default: ','
    pub list_delimiter: char,

    /// Regions kept from title.akas.
    /// Default: {"US"}
    pub regions: BTreeSet<String>,

    /// Title types kept from title.basics.
    /// Default: {"movie", "tvMovie"}
    pub title_types: BTreeSet<String>,

    /// A person is kept (all of their rows) if any of their professions is listed here.
    /// Default: {"actor", "actress"}
    pub professions: BTreeSet<String>,

    /// Name of the shared title identifier after renaming.
    /// Default: "tconst"
    pub key_column: String,

    /// Drop rows whose key is malformed instead of aborting the run.
    /// Default: true
    pub remediate_malformed_keys: bool,

    /// How many of the most frequent malformed keys a validation report keeps.
    /// Default: 5
    pub sample_offenders: usize,

    /// Handling of rows multiplied by repeated keys.
    /// Default: Preserve
    pub multiplicity: JoinMultiplicity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sources: SourceFiles::default(),
            output_path: PathBuf::from("data/us.movies.actors.tsv"),
            load: LoadOptions::default(),
            list_delimiter: ',',
            regions: set_of(["US"]),
            title_types: set_of(["movie", "tvMovie"]),
            professions: set_of(["actor", "actress"]),
            key_column: "tconst".to_string(),
            remediate_malformed_keys: true,
            sample_offenders: 5,
            multiplicity: JoinMultiplicity::default(),
        }
    }
}

fn set_of<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Full path of one source file.
    pub fn source_path(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        self.load.validate()?;

        if self.list_delimiter as u32 == self.load.delimiter as u32 {
            return Err(ConfigValidationError::DelimiterClash(self.list_delimiter));
        }

        for (field, set) in [
            ("regions", &self.regions),
            ("title_types", &self.title_types),
            ("professions", &self.professions),
        ] {
            if set.is_empty() {
                return Err(ConfigValidationError::EmptySet(field.to_string()));
            }
        }

        if self.key_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyKeyColumn);
        }

        if self.sample_offenders == 0 {
            return Err(ConfigValidationError::InvalidSampleSize(self.sample_offenders));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid field delimiter {0:?}")]
    InvalidDelimiter(char),

    #[error("List delimiter {0:?} is also the field delimiter")]
    DelimiterClash(char),

    #[error("'{0}' must contain at least one value")]
    EmptySet(String),

    #[error("Key column name must not be empty")]
    EmptyKeyColumn,

    #[error("Invalid offender sample size: {0} (must be at least 1)")]
    InvalidSampleSize(usize),
}

impl From<ConfigValidationError> for PrunerError {
    fn from(err: ConfigValidationError) -> Self {
        PrunerError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_dir: Option<PathBuf>,
    sources: Option<SourceFiles>,
    output_path: Option<PathBuf>,
    load: Option<LoadOptions>,
    list_delimiter: Option<char>,
    regions: Option<BTreeSet<String>>,
    title_types: Option<BTreeSet<String>>,
    professions: Option<BTreeSet<String>>,
    key_column: Option<String>,
    remediate_malformed_keys: Option<bool>,
    sample_offenders: Option<usize>,
    multiplicity: Option<JoinMultiplicity>,
}

impl PipelineConfigBuilder {
    /// Set the directory the source files are read from.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Override the source file names.
    pub fn sources(mut self, sources: SourceFiles) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Set the output file for the combined relation.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load = Some(options);
        self
    }

    pub fn list_delimiter(mut self, delimiter: char) -> Self {
        self.list_delimiter = Some(delimiter);
        self
    }

    /// Set the regions kept from title.akas.
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(set_of(regions));
        self
    }

    /// Set the title types kept from title.basics.
    pub fn title_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_types = Some(set_of(types));
        self
    }

    /// Set the professions that qualify a person.
    pub fn professions<I, S>(mut self, professions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.professions = Some(set_of(professions));
        self
    }

    pub fn key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }

    /// Drop malformed keys before joining (true) or abort the run (false).
    pub fn remediate_malformed_keys(mut self, remediate: bool) -> Self {
        self.remediate_malformed_keys = Some(remediate);
        self
    }

    pub fn sample_offenders(mut self, n: usize) -> Self {
        self.sample_offenders = Some(n);
        self
    }

    pub fn multiplicity(mut self, multiplicity: JoinMultiplicity) -> Self {
        self.multiplicity = Some(multiplicity);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            sources: self.sources.unwrap_or(defaults.sources),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            load: self.load.unwrap_or(defaults.load),
            list_delimiter: self.list_delimiter.unwrap_or(defaults.list_delimiter),
            regions: self.regions.unwrap_or(defaults.regions),
            title_types: self.title_types.unwrap_or(defaults.title_types),
            professions: self.professions.unwrap_or(defaults.professions),
            key_column: self.key_column.unwrap_or(defaults.key_column),
            remediate_malformed_keys: self
                .remediate_malformed_keys
                .unwrap_or(defaults.remediate_malformed_keys),
            sample_offenders: self.sample_offenders.unwrap_or(defaults.sample_offenders),
            multiplicity: self.multiplicity.unwrap_or(defaults.multiplicity),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Column classification
// =============================================================================

/// Semantic tag of a column, independent of how its values are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A label with no order (identifiers, names, genres).
    Nominal,
    /// Ordered, but distances are meaningless (position within a series).
    Ordinal,
    /// A measured quantity.
    Scalar,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Nominal => "nominal",
            Classification::Ordinal => "ordinal",
            Classification::Scalar => "scalar",
        })
    }
}

/// Fixed lookup from column name to [`Classification`].
///
/// The profiler never derives a classification from data; a column with no
/// entry here is an error. Swap the table to profile a different schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationTable(HashMap<String, Classification>);

impl ClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for every column of the combined IMDb relation.
    pub fn imdb() -> Self {
        use Classification::*;
        [
            ("tconst", Nominal),
            ("nconst", Nominal),
            ("primaryName", Nominal),
            ("birthYear", Scalar),
            ("deathYear", Scalar),
            ("primaryProfession", Nominal),
            ("titleType", Nominal),
            ("primaryTitle", Nominal),
            ("originalTitle", Nominal),
            // flags carry more than a label: 1 means "more adult" than 0
            ("isAdult", Scalar),
            ("startYear", Scalar),
            ("endYear", Scalar),
            ("runtimeMinutes", Scalar),
            ("genres", Nominal),
            // the 5th entry comes after the 4th
            ("ordering", Ordinal),
            ("title", Nominal),
            ("region", Nominal),
            ("language", Nominal),
            ("types", Nominal),
            ("attributes", Nominal),
            ("isOriginalTitle", Scalar),
            ("averageRating", Scalar),
            ("numVotes", Scalar),
        ]
        .into_iter()
        .collect()
    }

    /// Read a table from a JSON object such as `{"tconst": "nominal"}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PrunerError::io(path, e))?;
        let table: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(table)
    }

    pub fn insert(&mut self, column: impl Into<String>, classification: Classification) {
        self.0.insert(column.into(), classification);
    }

    pub fn get(&self, column: &str) -> Option<Classification> {
        self.0.get(column).copied()
    }

    /// Classification of `column`, or [`PrunerError::UnknownColumn`].
    pub fn classify(&self, column: &str) -> Result<Classification> {
        self.get(column)
            .ok_or_else(|| PrunerError::UnknownColumn(column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Classification)> for ClassificationTable {
    fn from_iter<I: IntoIterator<Item = (S, Classification)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.key_column, "tconst");
        assert_eq!(config.list_delimiter, ',');
        assert!(config.regions.contains("US"));
        assert!(config.title_types.contains("tvMovie"));
        assert!(config.remediate_malformed_keys);
        assert_eq!(config.multiplicity, JoinMultiplicity::Preserve);
        assert_eq!(config.load.missing_token(), "\\N");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .data_dir("imdb")
            .regions(["GB", "IE"])
            .professions(["director"])
            .remediate_malformed_keys(false)
            .multiplicity(JoinMultiplicity::DistinctRows)
            .build()
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("imdb"));
        assert_eq!(config.regions.len(), 2);
        assert!(config.professions.contains("director"));
        assert!(!config.remediate_malformed_keys);
        assert_eq!(
            config.source_path(&config.sources.akas),
            PathBuf::from("imdb/title.akas.tsv")
        );
    }

    #[test]
    fn test_validation_empty_set() {
        let result = PipelineConfig::builder()
            .title_types(Vec::<String>::new())
            .build();
        assert!(matches!(result, Err(ConfigValidationError::EmptySet(f)) if f == "title_types"));
    }

    #[test]
    fn test_validation_delimiter_clash() {
        let result = PipelineConfig::builder().list_delimiter('\t').build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::DelimiterClash('\t'))
        ));
    }

    #[test]
    fn test_validation_sample_size() {
        let result = PipelineConfig::builder().sample_offenders(0).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidSampleSize(0))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "data_dir": "imdb",
            "sources": {
                "akas": "a.tsv",
                "basics": "b.tsv",
                "ratings": "r.tsv",
                "names": "n.tsv"
            },
            "output_path": "out.tsv",
            "load": {
                "delimiter": 9,
                "missing_tokens": ["\\N", ""],
                "quoting": false,
                "encoding": "Utf8Lossy"
            },
            "list_delimiter": "|",
            "regions": ["US"],
            "title_types": ["movie"],
            "professions": ["actress"],
            "key_column": "tconst",
            "remediate_malformed_keys": false,
            "sample_offenders": 3,
            "multiplicity": "DistinctRows"
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).expect("valid config JSON");
        assert_eq!(config.list_delimiter, '|');
        assert_eq!(config.load.encoding, TextEncoding::Utf8Lossy);
        assert!(config.load.is_missing(""));
        assert_eq!(config.multiplicity, JoinMultiplicity::DistinctRows);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_classification_table_imdb() {
        let table = ClassificationTable::imdb();
        assert_eq!(table.len(), 23);
        assert_eq!(table.get("ordering"), Some(Classification::Ordinal));
        assert_eq!(table.get("averageRating"), Some(Classification::Scalar));
        assert!(matches!(
            table.classify("budget"),
            Err(PrunerError::UnknownColumn(c)) if c == "budget"
        ));
    }

    #[test]
    fn test_classification_table_from_json() {
        let table: ClassificationTable =
            serde_json::from_str(r#"{"x": "scalar", "y": "nominal"}"#).unwrap();
        assert_eq!(table.get("x"), Some(Classification::Scalar));
        assert_eq!(table.get("y"), Some(Classification::Nominal));
        assert_eq!(Classification::Ordinal.to_string(), "ordinal");
    }
}
