use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A typed cell value. Empty cells load as [`Value::Missing`].
///
/// Values end up in `BTreeSet`s (control options) and `HashMap`s (grouping),
/// so equality, ordering and hashing are total: numbers compare with
/// `f64::total_cmp`.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Number(v) => v.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl Value {
    /// Numeric view of the value; `None` for text, missing and non-finite numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Parse a raw cell as a finite number, the way the loader coerces numeric columns.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Schema – column names and inferred kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered column list, built once at load time and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Classify every column of `records`.
    ///
    /// A column is numeric when every non-empty cell parses as a finite
    /// number and at least one cell is non-empty; otherwise it is categorical.
    pub fn infer(headers: &[String], records: &[Vec<String>]) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut seen_value = false;
                let all_numeric = records.iter().all(|record| {
                    let raw = record.get(idx).map_or("", |s| s.trim());
                    if raw.is_empty() {
                        return true;
                    }
                    seen_value = true;
                    parse_number(raw).is_some()
                });
                let kind = if all_numeric && seen_value {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Categorical
                };
                Column {
                    name: name.clone(),
                    kind,
                }
            })
            .collect();
        Schema { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }


    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.kind_of(name) == Some(ColumnKind::Numeric)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .map(|c| c.name.as_str())
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the table
// ---------------------------------------------------------------------------

/// Stable row identity: the row's position in the loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    values: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Row { id, values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a schema column index.
    pub fn at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of a named column, resolved through `schema`.
    pub fn get(&self, schema: &Schema, column: &str) -> Option<&Value> {
        schema.index_of(column).and_then(|idx| self.at(idx))
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The loaded table: schema, rows and per-column unique values.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    rows: Vec<Row>,
    /// For each column the sorted set of unique values (filter options).
    pub unique_values: BTreeMap<String, BTreeSet<Value>>,
    /// Column whose values label rows, validated unique.
    pub id_column: Option<String>,
}

impl Dataset {
    /// Build a dataset from raw text records.
    ///
    /// Every record must have as many fields as there are headers. Cells are
    /// coerced per the inferred column kind.
    pub fn from_records(
        headers: Vec<String>,
        records: Vec<Vec<String>>,
        id_column: Option<&str>,
    ) -> Result<Self, LoadError> {
        if headers.is_empty() {
            return Err(LoadError::MissingHeader);
        }
        if records.is_empty() {
            return Err(LoadError::EmptyDataset);
        }
        for (row, record) in records.iter().enumerate() {
            if record.len() != headers.len() {
                return Err(LoadError::RowShape {
                    row,
                    expected: headers.len(),
                    found: record.len(),
                });
            }
        }

        let schema = Schema::infer(&headers, &records);

        let rows: Vec<Row> = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let values = record
                    .iter()
                    .zip(schema.columns())
                    .map(|(raw, column)| coerce(raw, column.kind))
                    .collect();
                Row::new(RowId(i), values)
            })
            .collect();

        Self::from_rows(schema, rows, id_column)
    }

    /// Build a dataset from already-typed rows.
    pub fn from_rows(
        schema: Schema,
        rows: Vec<Row>,
        id_column: Option<&str>,
    ) -> Result<Self, LoadError> {
        if let Some(column) = id_column {
            let idx = schema
                .index_of(column)
                .ok_or_else(|| LoadError::MissingIdColumn {
                    column: column.to_string(),
                })?;
            let mut seen = HashSet::with_capacity(rows.len());
            for row in &rows {
                let value = row.at(idx).cloned().unwrap_or(Value::Missing);
                if !seen.insert(value.clone()) {
                    return Err(LoadError::DuplicateId {
                        column: column.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = BTreeMap::new();
        for (idx, column) in schema.columns().iter().enumerate() {
            let set = unique_values.entry(column.name.clone()).or_default();
            for row in &rows {
                if let Some(v) = row.at(idx) {
                    set.insert(v.clone());
                }
            }
        }

        Ok(Dataset {
            schema,
            rows,
            unique_values,
            id_column: id_column.map(str::to_string),
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id.0).filter(|r| r.id == id)
    }

    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a Value> {
        row.get(&self.schema, column)
    }

    /// Human-readable label for a row: the id column value, else its position.
    pub fn label(&self, id: RowId) -> String {
        self.id_column
            .as_deref()
            .and_then(|col| self.row(id).and_then(|r| self.value(r, col)))
            .map(|v| v.to_string())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn coerce(raw: &str, kind: ColumnKind) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Missing;
    }
    match kind {
        ColumnKind::Numeric => parse_number(trimmed)
            .map(Value::Number)
            .unwrap_or(Value::Missing),
        ColumnKind::Categorical => Value::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_inference() {
        let headers = strings(&["Car", "MPG", "Cylinders", "Mixed", "Empty"]);
        let records = vec![
            strings(&["a", "18", "8", "1", ""]),
            strings(&["b", "", "4", "x", ""]),
            strings(&["c", "31.5", "4", "2", ""]),
        ];
        let schema = Schema::infer(&headers, &records);

        assert_eq!(schema.kind_of("Car"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("MPG"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("Cylinders"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("Mixed"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("Empty"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("Nope"), None);
    }

    #[test]
    fn test_coercion_follows_column_kind() {
        let ds = Dataset::from_records(
            strings(&["Car", "MPG", "Mixed"]),
            vec![strings(&["a", "18", "1"]), strings(&["b", "", "x"])],
            None,
        )
        .unwrap();

        let first = &ds.rows()[0];
        let second = &ds.rows()[1];
        assert_eq!(ds.value(first, "MPG"), Some(&Value::Number(18.0)));
        assert_eq!(ds.value(second, "MPG"), Some(&Value::Missing));
        // Numeric-looking text stays text in a categorical column.
        assert_eq!(ds.value(first, "Mixed"), Some(&Value::Text("1".into())));
        assert_eq!(ds.unique_values["Car"].len(), 2);
    }

    #[test]
    fn test_row_shape_mismatch_is_rejected() {
        let err = Dataset::from_records(
            strings(&["a", "b"]),
            vec![strings(&["1", "2"]), strings(&["3"])],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::RowShape {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_id_column_must_be_unique() {
        let err = Dataset::from_records(
            strings(&["Car", "MPG"]),
            vec![strings(&["a", "1"]), strings(&["a", "2"])],
            Some("Car"),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId { .. }));

        let err = Dataset::from_records(strings(&["Car"]), vec![strings(&["a"])], Some("Id"))
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingIdColumn { .. }));
    }

    #[test]
    fn test_labels_use_id_column() {
        let ds = Dataset::from_records(
            strings(&["Car", "MPG"]),
            vec![strings(&["pinto", "1"]), strings(&["civic", "2"])],
            Some("Car"),
        )
        .unwrap();
        assert_eq!(ds.label(RowId(1)), "civic");
        assert_eq!(ds.label(RowId(7)), "#7");
    }

    #[test]
    fn test_value_ordering_is_total() {
        let mut set = BTreeSet::new();
        set.insert(Value::Text("b".into()));
        set.insert(Value::Number(2.0));
        set.insert(Value::Missing);
        set.insert(Value::Number(-1.0));
        set.insert(Value::Text("a".into()));
        let ordered: Vec<String> = set.iter().map(|v| v.to_string()).collect();
        assert_eq!(ordered, vec!["<missing>", "-1", "2", "a", "b"]);
    }
}
