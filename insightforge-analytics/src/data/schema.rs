//! Schema definition and type inference for datasets.

use super::dataset::Dataset;
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    String,
    DateTime,
    Mixed,
    Null,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
            ColumnType::DateTime => "datetime",
            ColumnType::Mixed => "mixed",
            ColumnType::Null => "null",
        };
        f.write_str(label)
    }
}

/// Schema definition for a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
}

/// Schema for a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
}

/// Infer a column type from its cells, ignoring nulls.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_text = false;
    let mut has_time = false;

    for v in values {
        match v {
            Value::Null => {}
            Value::Int(_) => has_int = true,
            Value::Float(_) => has_float = true,
            Value::Bool(_) => has_bool = true,
            Value::Text(_) => has_text = true,
            Value::DateTime(_) | Value::NoTime => has_time = true,
        }
    }

    match (has_int, has_float, has_bool, has_text, has_time) {
        (false, false, false, false, false) => ColumnType::Null,
        (false, false, false, false, true) => ColumnType::DateTime,
        (false, false, true, false, false) => ColumnType::Boolean,
        (true, false, false, false, false) => ColumnType::Integer,
        (_, true, false, false, false) => ColumnType::Float,
        (false, false, false, true, false) => ColumnType::String,
        _ => ColumnType::Mixed,
    }
}

/// Infer schema from a dataset.
pub fn infer_schema(dataset: &Dataset) -> SchemaDefinition {
    let columns = dataset
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnSchema {
            name: name.clone(),
            dtype: infer_column_type(dataset.column_at(i)),
            null_count: dataset.column_at(i).filter(|v| v.is_null()).count(),
        })
        .collect();

    SchemaDefinition { columns }
}
