//! Null normalization.
//!
//! Each column is cleaned on its own, by inferred type:
//! numeric columns fill absent cells with zero; temporal columns (already
//! temporal, or named like a date) are parsed with unparseable cells set to
//! [`Value::NoTime`]; everything else fills absent cells with a sentinel
//! string. The numeric check runs before the name heuristic, and cleaning a
//! cleaned dataset changes nothing.

use super::dataset::Dataset;
use super::schema::{ColumnType, infer_column_type};
use super::value::{Value, parse_datetime};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Treatment {
    Zero(ColumnType),
    Temporal,
    Sentinel,
}

fn treatment_for(name: &str, dtype: ColumnType) -> Treatment {
    match dtype {
        ColumnType::Integer | ColumnType::Float | ColumnType::Boolean => Treatment::Zero(dtype),
        ColumnType::DateTime => Treatment::Temporal,
        _ if name.to_lowercase().contains("date") => Treatment::Temporal,
        _ => Treatment::Sentinel,
    }
}

fn clean_cell(cell: &Value, treatment: Treatment, missing_text: &str) -> Value {
    match (treatment, cell) {
        (Treatment::Zero(ColumnType::Integer), Value::Null) => Value::Int(0),
        (Treatment::Zero(ColumnType::Boolean), Value::Null) => Value::Bool(false),
        (Treatment::Zero(_), Value::Null) => Value::Float(0.0),
        (Treatment::Temporal, Value::DateTime(_) | Value::NoTime) => cell.clone(),
        (Treatment::Temporal, Value::Text(raw)) => {
            parse_datetime(raw).map_or(Value::NoTime, Value::DateTime)
        }
        (Treatment::Temporal, _) => Value::NoTime,
        (Treatment::Sentinel, Value::Null) => Value::Text(missing_text.to_string()),
        _ => cell.clone(),
    }
}

/// Return a cleaned copy of `dataset`.
pub fn clean_dataset(dataset: &Dataset, missing_text: &str) -> Dataset {
    let treatments: Vec<Treatment> = dataset
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let treatment = treatment_for(name, infer_column_type(dataset.column_at(i)));
            debug!(column = %name, ?treatment, "Cleaning column");
            treatment
        })
        .collect();

    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            treatments
                .iter()
                .enumerate()
                .map(|(i, &t)| clean_cell(row.get(i).unwrap_or(&Value::Null), t, missing_text))
                .collect()
        })
        .collect();

    Dataset::new(dataset.columns.clone(), rows)
}
