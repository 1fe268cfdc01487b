//! Directory ingestion: every supported file, concatenated into one dataset.

use super::dataset::Dataset;
use super::source::{CsvSource, DataSource, DataSourceInfo, ExcelSource, JsonSource, SqliteSource};
use insightforge_core::config::SqliteInput;
use insightforge_core::error::IngestError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File formats picked up from the input directory, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    Csv,
    Excel,
    Json,
}

impl DataFormat {
    pub const ALL: [DataFormat; 3] = [DataFormat::Csv, DataFormat::Excel, DataFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Excel => "xlsx",
            DataFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    fn source(self, path: PathBuf) -> Box<dyn DataSource> {
        match self {
            DataFormat::Csv => Box::new(CsvSource { path }),
            DataFormat::Excel => Box::new(ExcelSource { path }),
            DataFormat::Json => Box::new(JsonSource { path }),
        }
    }
}

/// A file that was found but could not be loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub location: String,
    pub reason: String,
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub dataset: Dataset,
    /// Sources that contributed at least one row.
    pub sources: Vec<DataSourceInfo>,
    pub skipped: Vec<SkippedFile>,
}

/// List the files of one format in `dir`, sorted by file name.
///
/// A missing or unreadable directory yields no files.
pub fn discover_files(dir: &Path, format: DataFormat) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Input directory is not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && DataFormat::from_path(path) == Some(format))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Loads every supported file of a directory, plus an optional SQLite table.
pub struct DirectoryLoader {
    dir: PathBuf,
    sqlite: Option<SqliteInput>,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sqlite: None,
        }
    }

    pub fn with_sqlite(mut self, sqlite: Option<SqliteInput>) -> Self {
        self.sqlite = sqlite;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sources(&self) -> Vec<Box<dyn DataSource>> {
        let mut sources: Vec<Box<dyn DataSource>> = DataFormat::ALL
            .into_iter()
            .flat_map(|format| {
                discover_files(&self.dir, format)
                    .into_iter()
                    .map(move |path| format.source(path))
            })
            .collect();
        if let Some(sqlite) = &self.sqlite {
            sources.push(Box::new(SqliteSource {
                db_path: sqlite.db_path.clone(),
                table: sqlite.table.clone(),
            }));
        }
        sources
    }

    /// Load and concatenate every source.
    ///
    /// Per-source failures are logged and skipped. Sources without rows are
    /// neither counted nor skipped. Fails with
    /// [`IngestError::NoData`] only when nothing yielded any rows.
    pub async fn load(&self) -> Result<IngestSummary, IngestError> {
        info!(dir = %self.dir.display(), "Scanning for CSV/Excel/JSON files");

        let mut dataset = Dataset::empty();
        let mut loaded = Vec::new();
        let mut skipped = Vec::new();

        for source in self.sources() {
            let mut source_info = source.source_info();
            match source.load().await {
                Ok(part) => {
                    debug!(
                        location = %source_info.location,
                        rows = part.row_count(),
                        columns = part.column_count(),
                        "Loaded source"
                    );
                    if part.is_empty() {
                        continue;
                    }
                    source_info.row_count = Some(part.row_count());
                    dataset.append(part);
                    loaded.push(source_info);
                }
                Err(e) => {
                    warn!(location = %source_info.location, error = %e, "Skipping unreadable source");
                    skipped.push(SkippedFile {
                        location: source_info.location,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if dataset.is_empty() {
            return Err(IngestError::NoData {
                dir: self.dir.clone(),
            });
        }

        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            sources = loaded.len(),
            skipped = skipped.len(),
            "Ingestion complete"
        );

        Ok(IngestSummary {
            dataset,
            sources: loaded,
            skipped,
        })
    }
}
