//! CSV export of a cleaned dataset.

use super::dataset::Dataset;
use super::value::Value;
use std::path::Path;

/// Text written for one cell. Whole floats keep a `.0` so float columns
/// stay float when read back.
fn csv_field(cell: &Value) -> String {
    match cell {
        Value::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{x:.1}"),
        other => other.to_string(),
    }
}

/// Write `dataset` as CSV. Temporal cells are ISO-8601; `NoTime` is empty.
pub fn write_csv(dataset: &Dataset, path: &Path) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(csv_field))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::value::{Value, parse_datetime};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned_dataset.csv");
        let ds = Dataset::new(
            vec!["category".into(), "date".into(), "note".into()],
            vec![
                vec![
                    Value::Text("Tech, Inc".into()),
                    Value::DateTime(parse_datetime("2024-01-05").unwrap()),
                    Value::Float(1.5),
                ],
                vec![Value::Text("Ops".into()), Value::NoTime, Value::Int(2)],
            ],
        );
        write_csv(&ds, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "category,date,note\n\"Tech, Inc\",2024-01-05,1.5\nOps,,2\n"
        );
    }

    #[test]
    fn test_whole_floats_keep_decimal_point() {
        assert_eq!(csv_field(&Value::Float(8.0)), "8.0");
        assert_eq!(csv_field(&Value::Float(0.0)), "0.0");
        assert_eq!(csv_field(&Value::Float(-3.0)), "-3.0");
        assert_eq!(csv_field(&Value::Float(3.25)), "3.25");
        assert_eq!(csv_field(&Value::Int(8)), "8");
    }
}
