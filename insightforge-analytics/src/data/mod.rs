//! Tabular data: model, loaders, schema inference, cleaning, and export.

pub mod clean;
pub mod dataset;
pub mod export;
pub mod loader;
pub mod schema;
pub mod source;
pub mod value;

pub use clean::clean_dataset;
pub use dataset::Dataset;
pub use export::write_csv;
pub use loader::{DataFormat, DirectoryLoader, IngestSummary, SkippedFile, discover_files};
pub use schema::{ColumnSchema, ColumnType, SchemaDefinition, infer_column_type, infer_schema};
pub use source::{CsvSource, DataSource, DataSourceInfo, ExcelSource, JsonSource, SqliteSource};
pub use value::Value;

/// 0/1 column marking an active engagement event.
pub const ACTIVITY_COLUMN: &str = "activity";
/// Grouping column for per-category breakdowns.
pub const CATEGORY_COLUMN: &str = "category";
/// Grouping column for per-keyword breakdowns.
pub const KEYWORD_COLUMN: &str = "ad_keywords";
