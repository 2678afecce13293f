//! Delimited text input and output.
//!
//! [`TableLoader`] turns a header-first delimited file into a [`Relation`]
//! of text cells, [`TableWriter`] does the reverse. Both share
//! [`LoadOptions`](crate::config::LoadOptions) so a written file loads back
//! into the same relation.
//!
//! [`Relation`]: crate::relation::Relation

mod loader;
mod writer;

pub use loader::TableLoader;
pub use writer::TableWriter;

use crate::error::PrunerError;
use std::path::Path;

/// Translate a `csv` error into the crate taxonomy: I/O problems stay I/O,
/// everything the parser complains about is a format error.
pub(crate) fn csv_error(path: &Path, err: csv::Error) -> PrunerError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PrunerError::io(path, source),
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => PrunerError::Format {
            path: path.to_path_buf(),
            line: pos.map(|p| p.line()).unwrap_or(line),
            reason: format!("expected {expected_len} fields like the header, found {len}"),
        },
        other => PrunerError::Format {
            path: path.to_path_buf(),
            line,
            reason: format!("{other:?}"),
        },
    }
}
