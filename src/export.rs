use crate::scoring::{ExceptionRows, ExceptionSheet};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not export {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("could not flush {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Download naming convention: `<authority>_<category>.csv`.
pub fn suggested_file_name(authority: &str, category: &str) -> String {
    format!("{authority}_{category}.csv")
}

/// Writes any serializable row sequence as a headed CSV file.
pub fn write_csv<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|source| ExportError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    for row in rows {
        writer.serialize(row).map_err(|source| ExportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Writes one exception category under its suggested file name, returning
/// the path written.
pub fn write_exception_sheet(
    dir: &Path,
    authority: &str,
    sheet: &ExceptionSheet,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(suggested_file_name(authority, sheet.category));
    match &sheet.rows {
        ExceptionRows::Plans(rows) => write_csv(&path, rows)?,
        ExceptionRows::Facilities(rows) => write_csv(&path, rows)?,
    }
    Ok(path)
}
