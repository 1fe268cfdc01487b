//! Data source abstraction for loading datasets from various formats.

use super::dataset::Dataset;
use super::value::{Value, parse_datetime};
use async_trait::async_trait;
use calamine::{Data, DataType, Reader, open_workbook_auto};
use insightforge_core::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Information about a loaded source, reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

impl DataSourceInfo {
    fn new(source_type: &str, location: &Path) -> Self {
        Self {
            source_type: source_type.to_string(),
            location: location.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

/// Trait for loading a whole dataset from a source.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn load(&self) -> Result<Dataset, IngestError>;

    fn source_info(&self) -> DataSourceInfo;
}

/// Make header names unique and non-empty.
///
/// Blank headers become `Unnamed: {i}`; repeats get a `.n` suffix.
fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// CSV file data source.
pub struct CsvSource {
    pub path: PathBuf,
}

impl CsvSource {
    fn parse(path: &Path, bytes: &[u8]) -> Result<Dataset, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| IngestError::parse(path, e))?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::parse(path, "No columns to parse from file"));
        }
        let columns = normalize_headers(headers.iter().map(str::to_string));
        let width = columns.len();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| IngestError::parse(path, e))?;
            if record.len() > width {
                return Err(IngestError::parse(
                    path,
                    format!(
                        "row {} has {} fields, expected {width}",
                        line + 2,
                        record.len()
                    ),
                ));
            }
            let mut row: Vec<Value> = record.iter().map(Value::parse).collect();
            row.resize(width, Value::Null);
            rows.push(row);
        }

        Ok(Dataset::new(columns, rows))
    }
}

#[async_trait]
impl DataSource for CsvSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| IngestError::read(&self.path, e))?;
        Self::parse(&self.path, &bytes)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo::new("csv", &self.path)
    }
}

// ---------------------------------------------------------------------------
// ExcelSource
// ---------------------------------------------------------------------------

/// Excel workbook data source. Reads the first worksheet; row one is the header.
pub struct ExcelSource {
    pub path: PathBuf,
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::Int(*f as i64)
            } else {
                Value::Float(*f)
            }
        }
        Data::String(s) => Value::text_or_null(s),
        Data::DateTime(_) => cell.as_datetime().map_or(Value::Null, Value::DateTime),
        Data::DateTimeIso(s) => {
            parse_datetime(s).map_or_else(|| Value::Text(s.clone()), Value::DateTime)
        }
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

fn read_workbook(path: &Path) -> Result<Dataset, IngestError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::read(path, e))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::parse(path, "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| IngestError::parse(path, e))?;

    let mut rows_iter = range.rows();
    let header = rows_iter
        .next()
        .ok_or_else(|| IngestError::parse(path, format!("sheet '{sheet}' is empty")))?;
    let columns = normalize_headers(header.iter().map(|c| match c {
        Data::Empty => String::new(),
        other => other.to_string(),
    }));
    let width = columns.len();

    let rows = rows_iter
        .map(|cells| {
            let mut row: Vec<Value> = cells.iter().take(width).map(excel_cell).collect();
            row.resize(width, Value::Null);
            row
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

#[async_trait]
impl DataSource for ExcelSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_workbook(&path))
            .await
            .map_err(|e| IngestError::read(&self.path, format!("Excel task join error: {e}")))?
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo::new("excel", &self.path)
    }
}

// ---------------------------------------------------------------------------
// JsonSource
// ---------------------------------------------------------------------------

/// JSON file data source.
///
/// Accepts an array of records, an object of column arrays, an object of
/// `column -> {index -> value}` maps, or a single record object.
pub struct JsonSource {
    pub path: PathBuf,
}

#[derive(Default)]
struct ColumnBuilder {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnBuilder {
    fn slot(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }
}

fn json_records(items: Vec<serde_json::Value>) -> Dataset {
    let mut builder = ColumnBuilder::default();
    let mut sparse: Vec<Vec<(usize, Value)>> = Vec::with_capacity(items.len());
    for item in items {
        let cells = match item {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (builder.slot(&k), Value::from(v)))
                .collect(),
            scalar => vec![(builder.slot("0"), Value::from(scalar))],
        };
        sparse.push(cells);
    }
    densify(builder.columns, sparse)
}

fn json_columns(map: serde_json::Map<String, serde_json::Value>) -> Dataset {
    let columns: Vec<String> = map.keys().cloned().collect();
    let height = map
        .values()
        .filter_map(|v| v.as_array().map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut rows = vec![vec![Value::Null; columns.len()]; height];
    for (c, (_, values)) in map.into_iter().enumerate() {
        if let serde_json::Value::Array(values) = values {
            for (r, v) in values.into_iter().enumerate() {
                rows[r][c] = Value::from(v);
            }
        }
    }
    Dataset::new(columns, rows)
}

fn json_indexed_columns(map: serde_json::Map<String, serde_json::Value>) -> Dataset {
    let columns: Vec<String> = map.keys().cloned().collect();
    let mut row_keys = ColumnBuilder::default();
    let mut sparse: Vec<Vec<(usize, Value)>> = Vec::new();
    for (c, (_, values)) in map.into_iter().enumerate() {
        if let serde_json::Value::Object(cells) = values {
            for (key, v) in cells {
                let r = row_keys.slot(&key);
                if r == sparse.len() {
                    sparse.push(Vec::new());
                }
                sparse[r].push((c, Value::from(v)));
            }
        }
    }
    densify(columns, sparse)
}

fn densify(columns: Vec<String>, sparse: Vec<Vec<(usize, Value)>>) -> Dataset {
    let width = columns.len();
    let rows = sparse
        .into_iter()
        .map(|cells| {
            let mut row = vec![Value::Null; width];
            for (i, v) in cells {
                row[i] = v;
            }
            row
        })
        .collect();
    Dataset::new(columns, rows)
}

impl JsonSource {
    fn parse(path: &Path, bytes: &[u8]) -> Result<Dataset, IngestError> {
        let json: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| IngestError::parse(path, e))?;
        match json {
            serde_json::Value::Array(items) => Ok(json_records(items)),
            serde_json::Value::Object(map) if map.is_empty() => Ok(Dataset::empty()),
            serde_json::Value::Object(map) if map.values().all(|v| v.is_array()) => {
                Ok(json_columns(map))
            }
            serde_json::Value::Object(map) if map.values().all(|v| v.is_object()) => {
                Ok(json_indexed_columns(map))
            }
            serde_json::Value::Object(map) => {
                Ok(json_records(vec![serde_json::Value::Object(map)]))
            }
            other => Err(IngestError::parse(
                path,
                format!("expected a JSON array or object, found {other}"),
            )),
        }
    }
}

#[async_trait]
impl DataSource for JsonSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| IngestError::read(&self.path, e))?;
        Self::parse(&self.path, &bytes)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo::new("json", &self.path)
    }
}

// ---------------------------------------------------------------------------
// SqliteSource
// ---------------------------------------------------------------------------

/// SQLite table data source. Loads every row of one table.
pub struct SqliteSource {
    pub db_path: PathBuf,
    pub table: String,
}

impl SqliteSource {
    fn query(&self) -> String {
        format!("SELECT * FROM \"{}\"", self.table.replace('"', "\"\""))
    }
}

fn read_table(db_path: &Path, query: &str) -> Result<Dataset, rusqlite::Error> {
    let conn =
        rusqlite::Connection::open_with_flags(db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(query)?;
    let column_count = stmt.column_count();
    let columns: Vec<String> = (0..column_count)
        .map(|i| stmt.column_name(i).unwrap_or("?").to_string())
        .collect();

    let mut rows = Vec::new();
    let mut result_rows = stmt.query([])?;
    while let Some(row) = result_rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let val = match row.get_ref(i) {
                Ok(rusqlite::types::ValueRef::Null) => Value::Null,
                Ok(rusqlite::types::ValueRef::Integer(n)) => Value::Int(n),
                Ok(rusqlite::types::ValueRef::Real(f)) => Value::Float(f),
                Ok(rusqlite::types::ValueRef::Text(t)) => {
                    Value::Text(String::from_utf8_lossy(t).into_owned())
                }
                Ok(rusqlite::types::ValueRef::Blob(_)) => Value::Text("<blob>".to_string()),
                Err(_) => Value::Null,
            };
            values.push(val);
        }
        rows.push(values);
    }

    Ok(Dataset::new(columns, rows))
}

#[async_trait]
impl DataSource for SqliteSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let db_path = self.db_path.clone();
        let query = self.query();

        // Run blocking SQLite operations on a blocking thread
        tokio::task::spawn_blocking(move || {
            read_table(&db_path, &query).map_err(|e| IngestError::read(&db_path, e))
        })
        .await
        .map_err(|e| IngestError::read(&self.db_path, format!("SQLite task join error: {e}")))?
    }

    fn source_info(&self) -> DataSourceInfo {
        let mut info = DataSourceInfo::new("sqlite", &self.db_path);
        info.location = format!("{}#{}", info.location, self.table);
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_normalize_headers() {
        let headers = normalize_headers(
            ["a", "", "a", "b", "a"].into_iter().map(String::from),
        );
        assert_eq!(headers, vec!["a", "Unnamed: 1", "a.1", "b", "a.2"]);
    }

    #[test]
    fn test_csv_parse_types_and_na_tokens() {
        let csv = b"category,activity,score,note\nTech,1,2.5,ok\nRetail,0,NA,\n";
        let ds = CsvSource::parse(Path::new("t.csv"), csv).unwrap();
        assert_eq!(ds.columns, vec!["category", "activity", "score", "note"]);
        assert_eq!(
            ds.rows[0],
            vec![
                Value::Text("Tech".into()),
                Value::Int(1),
                Value::Float(2.5),
                Value::Text("ok".into())
            ]
        );
        assert_eq!(ds.rows[1][2], Value::Null);
        assert_eq!(ds.rows[1][3], Value::Null);
    }

    #[test]
    fn test_csv_short_rows_are_padded() {
        let ds = CsvSource::parse(Path::new("t.csv"), b"a,b,c\n1,2\n").unwrap();
        assert_eq!(ds.rows[0], vec![Value::Int(1), Value::Int(2), Value::Null]);
    }

    #[test]
    fn test_csv_rejects_empty_and_ragged_files() {
        assert!(CsvSource::parse(Path::new("empty.csv"), b"").is_err());
        assert!(CsvSource::parse(Path::new("wide.csv"), b"a\n1,2,3\n").is_err());
    }

    #[test]
    fn test_json_records() {
        let body = br#"[{"category": "Tech", "activity": 1}, {"category": "Ops", "extra": {"k": 1}}]"#;
        let ds = JsonSource::parse(Path::new("t.json"), body).unwrap();
        assert_eq!(ds.columns, vec!["category", "activity", "extra"]);
        assert_eq!(ds.rows[1][1], Value::Null);
        assert_eq!(ds.rows[1][2], Value::Text("{\"k\":1}".into()));
    }

    #[test]
    fn test_json_column_orientations() {
        let arrays = br#"{"a": [1, 2, 3], "b": ["x", "y"]}"#;
        let ds = JsonSource::parse(Path::new("t.json"), arrays).unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows[2], vec![Value::Int(3), Value::Null]);

        let indexed = br#"{"a": {"0": 1, "1": 2}, "b": {"1": "y"}}"#;
        let ds = JsonSource::parse(Path::new("t.json"), indexed).unwrap();
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.rows[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(ds.rows[1], vec![Value::Int(2), Value::Text("y".into())]);
    }

    #[test]
    fn test_json_single_record_and_invalid() {
        let ds = JsonSource::parse(Path::new("t.json"), br#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(ds.row_count(), 1);
        assert!(JsonSource::parse(Path::new("t.json"), b"42").is_err());
        assert!(JsonSource::parse(Path::new("t.json"), b"{not json").is_err());
    }

    #[tokio::test]
    async fn test_csv_source_load_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "category,activity").unwrap();
        writeln!(file, "Tech,1").unwrap();
        let source = CsvSource {
            path: file.path().to_path_buf(),
        };
        let ds = source.load().await.unwrap();
        assert_eq!(ds.row_count(), 1);
        assert_eq!(source.source_info().source_type, "csv");
    }

    #[tokio::test]
    async fn test_sqlite_source_load() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("events.db");
        {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE events (category TEXT, activity INTEGER, score REAL, blob BLOB);
                 INSERT INTO events VALUES ('Tech', 1, 0.5, x'00');
                 INSERT INTO events VALUES (NULL, 0, NULL, NULL);",
            )
            .unwrap();
        }
        let source = SqliteSource {
            db_path: db_path.clone(),
            table: "events".into(),
        };
        let ds = source.load().await.unwrap();
        assert_eq!(ds.columns, vec!["category", "activity", "score", "blob"]);
        assert_eq!(
            ds.rows[0],
            vec![
                Value::Text("Tech".into()),
                Value::Int(1),
                Value::Float(0.5),
                Value::Text("<blob>".into())
            ]
        );
        assert_eq!(ds.rows[1][0], Value::Null);
        assert!(source.source_info().location.ends_with("#events"));
    }

    #[tokio::test]
    async fn test_sqlite_missing_table_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("empty.db");
        rusqlite::Connection::open(&db_path).unwrap();
        let source = SqliteSource {
            db_path,
            table: "nope".into(),
        };
        assert!(matches!(
            source.load().await,
            Err(IngestError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_excel_source_rejects_garbage() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"definitely not a zip archive").unwrap();
        let source = ExcelSource {
            path: file.path().to_path_buf(),
        };
        assert!(source.load().await.is_err());
    }

    #[test]
    fn test_excel_cell_mapping() {
        assert_eq!(excel_cell(&Data::Float(3.0)), Value::Int(3));
        assert_eq!(excel_cell(&Data::Float(3.5)), Value::Float(3.5));
        assert_eq!(excel_cell(&Data::String("N/A".into())), Value::Null);
        assert_eq!(excel_cell(&Data::Empty), Value::Null);
    }
}
