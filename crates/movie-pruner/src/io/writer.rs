use super::csv_error;
use crate::config::LoadOptions;
use crate::error::{PrunerError, Result};
use crate::relation::{Cell, Relation};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Serializes a [`Relation`] to delimited text.
///
/// Header first, then rows in relation order. Missing cells are written as
/// the first configured missing token. An existing file at the target path is
/// overwritten.
#[derive(Debug, Clone, Default)]
pub struct TableWriter {
    options: LoadOptions,
}

impl TableWriter {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Write `relation` to `path`, replacing whatever is there.
    pub fn write(&self, relation: &Relation, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PrunerError::io(path, e))?;
        self.write_to(relation, file, path)?;
        info!(
            "Wrote '{}' ({} rows x {} columns) to {}",
            relation.name(),
            relation.height(),
            relation.width(),
            path.display()
        );
        Ok(())
    }

    /// Write to any sink. `target` only labels errors.
    pub fn write_to<W: Write>(&self, relation: &Relation, sink: W, target: &Path) -> Result<()> {
        let style = if self.options.quoting {
            csv::QuoteStyle::Necessary
        } else {
            csv::QuoteStyle::Never
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .quote_style(style)
            .from_writer(sink);

        self.check_representable(relation.columns().iter().map(String::as_str), target, 1)?;
        writer
            .write_record(relation.columns())
            .map_err(|e| csv_error(target, e))?;

        let missing = self.options.missing_token();
        for (index, row) in relation.rows().enumerate() {
            let fields: Vec<String> = row
                .iter()
                .map(|cell| cell.render().unwrap_or_else(|| missing.to_string()))
                .collect();
            let line = index as u64 + 2;
            self.check_representable(fields.iter().map(String::as_str), target, line)?;
            self.check_not_missing_token(row, &fields, target, line)?;
            writer
                .write_record(&fields)
                .map_err(|e| csv_error(target, e))?;
        }

        writer.flush().map_err(|e| PrunerError::io(target, e))?;
        Ok(())
    }

    /// Render the whole relation into a string.
    pub fn to_string(&self, relation: &Relation) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_to(relation, &mut buffer, Path::new("<memory>"))?;
        String::from_utf8(buffer).map_err(|e| PrunerError::Internal(e.to_string()))
    }

    /// Without quoting, a field holding the delimiter or a line break cannot be
    /// read back, and neither can a row made of one empty field.
    fn check_representable<'a, I>(&self, fields: I, target: &Path, line: u64) -> Result<()>
    where
        I: ExactSizeIterator<Item = &'a str>,
    {
        if self.options.quoting {
            return Ok(());
        }
        let single = fields.len() == 1;
        let delimiter = self.options.delimiter as char;
        for field in fields {
            let reason = if field.contains(delimiter) {
                Some("field contains the delimiter")
            } else if field.contains(['\n', '\r']) {
                Some("field contains a line break")
            } else if single && field.is_empty() {
                Some("row of a single empty field")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(PrunerError::Format {
                    path: target.to_path_buf(),
                    line,
                    reason: format!("{reason} and quoting is disabled"),
                });
            }
        }
        Ok(())
    }

    /// A present value spelled like a missing token would be read back as
    /// missing.
    fn check_not_missing_token(
        &self,
        row: &[Cell],
        fields: &[String],
        target: &Path,
        line: u64,
    ) -> Result<()> {
        let clash = row
            .iter()
            .zip(fields)
            .find(|(cell, field)| !cell.is_missing() && self.options.is_missing(field));
        match clash {
            Some((_, field)) => Err(PrunerError::Format {
                path: target.to_path_buf(),
                line,
                reason: format!("value '{field}' is a missing-value token"),
            }),
            None => Ok(()),
        }
    }
}
