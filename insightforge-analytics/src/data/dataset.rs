//! The in-memory tabular dataset.

use super::value::Value;
use std::collections::HashMap;

/// Rows × named columns with heterogeneous per-column values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate the cells of one column, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.column_at(idx))
    }

    pub fn column_at(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).unwrap_or(&Value::Null))
    }

    /// Append another dataset row-wise.
    ///
    /// The column set becomes the union of both, in order of first
    /// appearance; cells for columns a source lacks are `Value::Null`.
    pub fn append(&mut self, other: Dataset) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let mut positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let mut added = Vec::new();
        for col in &other.columns {
            if !positions.contains_key(col.as_str()) {
                positions.insert(col.as_str(), self.columns.len() + added.len());
                added.push(col.clone());
            }
        }
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| positions.get(c.as_str()).copied())
            .collect();

        self.columns.extend(added);
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Value::Null);
        }
        for row in other.rows {
            let mut aligned = vec![Value::Null; width];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                aligned[target] = cell;
            }
            self.rows.push(aligned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_append_unions_columns() {
        let mut base = Dataset::new(
            vec!["category".into(), "activity".into()],
            vec![vec![text("Tech"), Value::Int(1)]],
        );
        let other = Dataset::new(
            vec!["activity".into(), "region".into()],
            vec![vec![Value::Int(0), text("EU")]],
        );
        base.append(other);

        assert_eq!(base.columns, vec!["category", "activity", "region"]);
        assert_eq!(
            base.rows,
            vec![
                vec![text("Tech"), Value::Int(1), Value::Null],
                vec![Value::Null, Value::Int(0), text("EU")],
            ]
        );
    }

    #[test]
    fn test_append_into_empty() {
        let mut base = Dataset::empty();
        base.append(Dataset::new(vec!["a".into()], vec![vec![Value::Int(1)]]));
        assert_eq!(base.row_count(), 1);
        assert_eq!(base.columns, vec!["a"]);
    }

    #[test]
    fn test_column_lookup() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Int(1)], vec![Value::Int(2), Value::Int(3)]],
        );
        assert!(ds.has_column("b"));
        assert!(ds.column("missing").is_none());
        let b: Vec<_> = ds.column("b").unwrap().cloned().collect();
        assert_eq!(b, vec![Value::Null, Value::Int(3)]);
    }
}
