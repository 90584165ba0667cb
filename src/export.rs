//! Report export (JSON and CSV)
//!
//! JSON keeps the snapshot's nesting: `{ "<Category>": { "<field>": value } }`.
//! CSV flattens it to one `Category,Field,Value` row per field.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format `{0}` (expected json or csv)")]
    UnknownFormat(String),

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode JSON report for {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode CSV report for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    /// Destination the failed export was aimed at, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ExportError::UnknownFormat(_) => None,
            ExportError::Io { path, .. }
            | ExportError::Json { path, .. }
            | ExportError::Csv { path, .. } => Some(path.as_path()),
        }
    }
}

/// `<dir>/<file_stem>.<ext>`
pub fn default_destination(dir: &Path, file_stem: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{file_stem}.{}", format.extension()))
}

/// Write `snapshot` to `path`. The snapshot is only read.
pub fn export(snapshot: &Snapshot, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, snapshot).map_err(|source| {
                ExportError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        ExportFormat::Csv => write_csv(snapshot, &mut writer).map_err(|source| ExportError::Csv {
            path: path.to_path_buf(),
            source,
        })?,
    }

    writer.flush().map_err(io_err)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    tracing::info!(
        path = %path.display(),
        format = %format,
        fields = snapshot.field_count(),
        "Report exported"
    );
    Ok(())
}

fn write_csv<W: Write>(snapshot: &Snapshot, writer: W) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Category", "Field", "Value"])?;
    for (category, fields) in snapshot.iter() {
        for (name, value) in fields.iter() {
            let value = value.to_string();
            csv.write_record([category.label(), name, value.as_str()])?;
        }
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::FakeSource;
    use crate::snapshot::SnapshotAggregator;
    use std::sync::Arc;

    fn snapshot() -> Snapshot {
        SnapshotAggregator::new(Arc::new(FakeSource)).build_snapshot()
    }

    #[test]
    fn json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let snapshot = snapshot();

        export(&snapshot, &path, ExportFormat::Json).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let back: Snapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(back, snapshot);
        assert!(content.contains("\"usage_percent\": \"N/A\""));
    }

    #[test]
    fn csv_has_one_row_per_field_plus_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let snapshot = snapshot();

        export(&snapshot, &path, ExportFormat::Csv).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 1 + snapshot.field_count());
        assert_eq!(&rows[0], vec!["Category", "Field", "Value"]);
        assert_eq!(&rows[1], vec!["System", "os_name", "N/A"]);
        assert!(rows
            .iter()
            .any(|r| r == vec!["CPU", "frequency_mhz", "3200"]));
    }

    #[test]
    fn unwritable_destination_returns_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let err = export(&snapshot(), &path, ExportFormat::Json).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn formats_parse_and_name_their_extension() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap().extension(), "csv");
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(
            default_destination(Path::new("/tmp"), "hardware_report", ExportFormat::Csv),
            PathBuf::from("/tmp/hardware_report.csv")
        );
    }
}
