use super::csv_error;
use crate::config::{LoadOptions, TextEncoding};
use crate::error::{PrunerError, Result};
use crate::relation::{Cell, Relation};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Reads delimited text into a [`Relation`] with every cell typed as text.
///
/// The first row is the header. Cells equal to one of the configured missing
/// tokens become [`Cell::Missing`]. A row whose field count differs from the
/// header's is a [`PrunerError::Format`].
#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    options: LoadOptions,
}

impl TableLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load the file at `path` as a relation called `name`.
    pub fn load(&self, path: impl AsRef<Path>, name: impl Into<String>) -> Result<Relation> {
        let path = path.as_ref();
        let name = name.into();
        info!("Loading '{}' from {}", name, path.display());

        let file = File::open(path).map_err(|e| PrunerError::io(path, e))?;
        let relation = self.load_from_reader(file, path, name)?;

        info!(
            "Loaded '{}': {} rows x {} columns",
            relation.name(),
            relation.height(),
            relation.width()
        );
        Ok(relation)
    }

    /// Load from any reader. `source` only labels errors.
    pub fn load_from_reader<R: Read>(
        &self,
        reader: R,
        source: &Path,
        name: impl Into<String>,
    ) -> Result<Relation> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quoting(self.options.quoting)
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .map_err(|e| csv_error(source, e))?
            .clone();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(PrunerError::Format {
                path: source.to_path_buf(),
                line: 1,
                reason: "missing header row".to_string(),
            });
        }

        let columns = headers
            .iter()
            .map(|field| self.decode(field, source, 1).map(Cow::into_owned))
            .collect::<Result<Vec<_>>>()?;
        debug!("Header of {}: {:?}", source.display(), columns);

        let mut relation = Relation::new(name, columns)?;
        for record in reader.byte_records() {
            let record = record.map_err(|e| csv_error(source, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let row = record
                .iter()
                .map(|field| {
                    let text = self.decode(field, source, line)?;
                    Ok(if self.options.is_missing(&text) {
                        Cell::Missing
                    } else {
                        Cell::text(text)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            relation.push_row(row)?;
        }

        Ok(relation)
    }

    fn decode<'a>(&self, field: &'a [u8], source: &Path, line: u64) -> Result<Cow<'a, str>> {
        match self.options.encoding {
            TextEncoding::Utf8 => std::str::from_utf8(field).map(Cow::Borrowed).map_err(|e| {
                PrunerError::Format {
                    path: source.to_path_buf(),
                    line,
                    reason: format!("invalid UTF-8: {e}"),
                }
            }),
            TextEncoding::Utf8Lossy => Ok(String::from_utf8_lossy(field)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn load_str(content: &str) -> Result<Relation> {
        TableLoader::default().load_from_reader(content.as_bytes(), Path::new("inline.tsv"), "t")
    }

    #[test]
    fn test_load_basic() {
        let relation = load_str("tconst\taverageRating\tnumVotes\ntt01\t5.7\t1800\ntt02\t\\N\t12\n")
            .unwrap();
        assert_eq!(relation.columns(), &["tconst", "averageRating", "numVotes"]);
        assert_eq!(relation.height(), 2);
        assert_eq!(relation.row(0)[1], Cell::text("5.7"));
        assert_eq!(relation.row(1)[1], Cell::Missing);
    }

    #[test]
    fn test_values_stay_text() {
        let relation = load_str("n\n42\n").unwrap();
        assert_eq!(relation.row(0)[0], Cell::text("42"));
    }

    #[test]
    fn test_bare_quotes_are_data() {
        let relation = load_str("title\n\"Rocky\" II\n").unwrap();
        assert_eq!(relation.row(0)[0], Cell::text("\"Rocky\" II"));
    }

    #[test]
    fn test_short_row_is_format_error() {
        let err = load_str("a\tb\tc\n1\t2\n").unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ERROR");
        assert!(err.to_string().contains("found 2"), "{err}");
    }

    #[test]
    fn test_long_row_is_format_error() {
        let err = load_str("a\tb\n1\t2\n1\t2\t3\n").unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ERROR");
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let err = load_str("").unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ERROR");
    }

    #[test]
    fn test_header_only() {
        let relation = load_str("a\tb\n").unwrap();
        assert_eq!(relation.shape(), (0, 2));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes: &[u8] = b"a\n\xff\xfe\n";
        let strict = TableLoader::default().load_from_reader(bytes, Path::new("x"), "t");
        assert_eq!(strict.unwrap_err().error_code(), "FORMAT_ERROR");

        let lossy = TableLoader::new(LoadOptions {
            encoding: TextEncoding::Utf8Lossy,
            ..LoadOptions::default()
        })
        .load_from_reader(bytes, Path::new("x"), "t")
        .unwrap();
        assert_eq!(lossy.height(), 1);
    }

    #[test]
    fn test_custom_missing_tokens() {
        let loader = TableLoader::new(LoadOptions {
            missing_tokens: vec!["\\N".to_string(), "NA".to_string()],
            ..LoadOptions::default()
        });
        let relation = loader
            .load_from_reader("a\nNA\n\\N\nx\n".as_bytes(), Path::new("x"), "t")
            .unwrap();
        let missing = relation
            .column("a")
            .unwrap()
            .filter(|c| c.is_missing())
            .count();
        assert_eq!(missing, 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TableLoader::default()
            .load("/definitely/not/here.tsv", "t")
            .unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "nconst\tprimaryName\nnm01\tFred Astaire\n").unwrap();
        let relation = TableLoader::default().load(file.path(), "names").unwrap();
        assert_eq!(relation.name(), "names");
        assert_eq!(relation.row(0)[1], Cell::text("Fred Astaire"));
    }
}
