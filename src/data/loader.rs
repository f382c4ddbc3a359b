use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Dataset;
use crate::error::LoadError;

/// Outcome of a background load, delivered once.
pub type LoadResult = Result<Dataset, LoadError>;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma-delimited, header row = column names (recommended)
/// * `.json`    – `[{ "Car": "...", "MPG": 18, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path, id_column: Option<&str>) -> LoadResult {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(File::open(path)?, id_column),
        "json" => read_json(File::open(path)?, id_column),
        "parquet" | "pq" => load_parquet(path, id_column),
        other => Err(LoadError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Load `path` on a worker thread; the receiver yields exactly one result.
pub fn spawn_load(path: PathBuf, id_column: Option<String>) -> Receiver<LoadResult> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let result = load_file(&path, id_column.as_deref());
        if let Err(e) = &result {
            log::error!("Failed to load {}: {e}", path.display());
        }
        // The UI may have moved on to another file; nobody to tell then.
        let _ = tx.send(result);
    });
    rx
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
///
/// The reader is flexible so that short or long rows reach schema
/// validation and fail with [`LoadError::RowShape`] rather than a generic
/// CSV error.
pub fn read_csv<R: Read>(reader: R, id_column: Option<&str>) -> LoadResult {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::MissingHeader);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(|v| v.to_string()).collect());
    }

    Dataset::from_records(headers, records, id_column)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Car": "chevrolet chevelle malibu", "MPG": 18, "Origin": "US" },
///   ...
/// ]
/// ```
///
/// The first record's keys define the header, in the order they appear in
/// the file; every other record must carry exactly the same keys.
pub fn read_json<R: Read>(reader: R, id_column: Option<&str>) -> LoadResult {
    let root: JsonValue = serde_json::from_reader(reader)?;
    let items = match root {
        JsonValue::Array(items) => items,
        _ => return Err(LoadError::NotARecord { row: 0 }),
    };

    let mut headers: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(items.len());

    for (row, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or(LoadError::NotARecord { row })?;
        if row == 0 {
            headers = obj.keys().cloned().collect();
        }
        if obj.len() != headers.len() {
            return Err(LoadError::RowShape {
                row,
                expected: headers.len(),
                found: obj.len(),
            });
        }
        if let Some(key) = headers.iter().find(|h| !obj.contains_key(*h)) {
            return Err(LoadError::MissingKey {
                row,
                key: key.clone(),
            });
        }

        let record = headers
            .iter()
            .map(|h| json_to_cell(&obj[h]).ok_or(LoadError::NotARecord { row }))
            .collect::<Result<Vec<String>, _>>()?;
        records.push(record);
    }

    Dataset::from_records(headers, records, id_column)
}

fn json_to_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null => Some(String::new()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Every cell is rendered to text with Arrow's display formatter and then
/// classified exactly like CSV input, so a column's kind does not depend
/// on the file format it came from.
fn load_parquet(path: &Path, id_column: Option<&str>) -> LoadResult {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let mut record = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                if column.is_null(row) {
                    record.push(String::new());
                } else {
                    record.push(array_value_to_string(column.as_ref(), row)?);
                }
            }
            records.push(record);
        }
    }

    Dataset::from_records(headers, records, id_column)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::model::{ColumnKind, RowId, Value};

    const CARS: &str = "\
Car,Manufacturer,MPG,Cylinders,Horsepower,Origin
chevrolet chevelle malibu,chevrolet,18,8,130,US
buick skylark 320,buick,15,8,165,US
datsun pl510,datsun,27,4,88,Japan
ford pinto,ford,25,4,,US
";

    #[test]
    fn test_read_csv() {
        let ds = read_csv(CARS.as_bytes(), Some("Car")).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.schema.len(), 6);
        assert_eq!(ds.schema.kind_of("MPG"), Some(ColumnKind::Numeric));
        assert_eq!(ds.schema.kind_of("Horsepower"), Some(ColumnKind::Numeric));
        assert_eq!(ds.schema.kind_of("Origin"), Some(ColumnKind::Categorical));

        let pinto = &ds.rows()[3];
        assert_eq!(ds.value(pinto, "Horsepower"), Some(&Value::Missing));
        assert_eq!(ds.value(pinto, "Cylinders"), Some(&Value::Number(4.0)));
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let text = "a,b\n1,2\n3\n";
        let err = read_csv(text.as_bytes(), None).unwrap_err();
        assert!(matches!(err, LoadError::RowShape { row: 1, .. }));
    }

    #[test]
    fn test_read_csv_header_only() {
        let err = read_csv("a,b\n".as_bytes(), None).unwrap_err();
        assert!(matches!(err, LoadError::EmptyDataset));

        let err = read_csv("".as_bytes(), None).unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader));
    }

    #[test]
    fn test_read_json_records() {
        let text = r#"[
            {"Car": "a", "MPG": 18, "Origin": "US"},
            {"Car": "b", "MPG": null, "Origin": "Japan"}
        ]"#;
        let ds = read_json(text.as_bytes(), None).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.schema.is_numeric("MPG"));
        assert_eq!(ds.value(&ds.rows()[1], "MPG"), Some(&Value::Missing));
    }

    #[test]
    fn test_read_json_rejects_mismatched_keys() {
        let text = r#"[{"a": 1, "b": 2}, {"a": 1, "c": 2}]"#;
        let err = read_json(text.as_bytes(), None).unwrap_err();
        assert!(matches!(&err, LoadError::MissingKey { row: 1, key } if key == "b"));

        let text = r#"[{"a": 1, "b": 2}, {"a": 1}]"#;
        let err = read_json(text.as_bytes(), None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RowShape {
                row: 1,
                expected: 2,
                found: 1
            }
        ));

        let err = read_json(r#"[{"a": [1, 2]}]"#.as_bytes(), None).unwrap_err();
        assert!(matches!(err, LoadError::NotARecord { row: 0 }));
    }

    #[test]
    fn test_read_json_keeps_key_order() {
        let text = r#"[
            {"Origin": "US", "MPG": 18, "Car": "a"},
            {"Car": "b", "MPG": 15, "Origin": "US"}
        ]"#;
        let ds = read_json(text.as_bytes(), None).unwrap();
        assert_eq!(ds.schema.names().collect::<Vec<_>>(), vec!["Origin", "MPG", "Car"]);
        // Later records are matched by key, not position.
        assert_eq!(ds.value(&ds.rows()[1], "Car"), Some(&Value::from("b")));
        assert_eq!(ds.value(&ds.rows()[1], "MPG"), Some(&Value::Number(15.0)));
    }

    #[test]
    fn test_load_parquet_columns() {
        use std::sync::Arc;

        use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("Name", DataType::Utf8, false),
            Field::new("MPG", DataType::Float64, true),
            Field::new("Cylinders", DataType::Int64, false),
            Field::new("Turbo", DataType::Boolean, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["pinto", "beetle", "civic"])),
                Arc::new(Float64Array::from(vec![Some(25.0), None, Some(31.5)])),
                Arc::new(Int64Array::from(vec![4, 4, 4])),
                Arc::new(BooleanArray::from(vec![false, true, false])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path(), Some("Name")).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.schema.names().collect::<Vec<_>>(),
            vec!["Name", "MPG", "Cylinders", "Turbo"]
        );
        let kinds: Vec<ColumnKind> = ds.schema.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Categorical,
                ColumnKind::Numeric,
                ColumnKind::Numeric,
                ColumnKind::Categorical
            ]
        );

        let beetle = &ds.rows()[1];
        assert_eq!(ds.value(beetle, "MPG"), Some(&Value::Missing));
        assert_eq!(ds.value(beetle, "Turbo"), Some(&Value::from("true")));
        assert_eq!(ds.value(&ds.rows()[2], "MPG"), Some(&Value::Number(31.5)));
        assert_eq!(ds.label(RowId(2)), "civic");
    }

    #[test]
    fn test_load_file_dispatch() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CARS.as_bytes()).unwrap();
        let ds = load_file(file.path(), None).unwrap();
        assert_eq!(ds.len(), 4);

        let other = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = load_file(other.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));

        let err = load_file(Path::new("/definitely/not/here.csv"), None).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_spawn_load_delivers_result() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CARS.as_bytes()).unwrap();
        let rx = spawn_load(file.path().to_path_buf(), Some("Car".to_string()));
        let ds = rx.recv().unwrap().unwrap();
        assert_eq!(ds.id_column.as_deref(), Some("Car"));
    }
}
