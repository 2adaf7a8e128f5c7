use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::array_value_to_string;
use calamine::{Data, Range, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – any flat Parquet file (Pandas / Polars `to_parquet`)
/// * `.json`    – `[{ "col": value, ... }, ...]` (`df.to_json(orient='records')`)
/// * `.csv`     – header row followed by data rows
/// * `.xlsx` / `.xls` / `.xlsb` / `.ods` – first worksheet, header row first
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let result = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        other => Err(anyhow::anyhow!("Unsupported file extension: .{other}")),
    };
    result.map_err(|e| LoadError::new(path, e))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

/// CSV layout: header row with column names, every other row is data.
/// Cell types are guessed per cell; dtypes are unified per column afterwards.
pub fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        bail!("CSV file has no header row");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_value_type).collect());
    }
    promote_infinities(&mut rows, headers.len());

    Ok(Dataset::from_rows(headers, rows))
}

/// Cells read as missing values, the same set dataframe readers use by default.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn guess_value_type(s: &str) -> Value {
    let s = s.trim();
    if NA_TOKENS.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    // `f64::from_str` also takes "inf" and "NaN"; those stay text here
    if s.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }
    match s {
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    text_value(s)
}

fn infinity(s: &str) -> Option<f64> {
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Turn `inf` spellings into floats, but only in columns whose other values
/// are all numbers. Elsewhere they are ordinary text.
fn promote_infinities(rows: &mut [Vec<Value>], width: usize) {
    for col in 0..width {
        let mut has_number = false;
        let mut has_infinity = false;
        let numeric = rows.iter().filter_map(|row| row.get(col)).all(|v| match v {
            Value::Integer(_) | Value::Float(_) => {
                has_number = true;
                true
            }
            Value::String(s) if infinity(s).is_some() => {
                has_infinity = true;
                true
            }
            Value::Null => true,
            _ => false,
        });
        if !(numeric && has_number && has_infinity) {
            continue;
        }
        for cell in rows.iter_mut().filter_map(|row| row.get_mut(col)) {
            if let Value::String(s) = cell {
                if let Some(f) = infinity(s) {
                    *cell = Value::Float(f);
                }
            }
        }
    }
}

/// A text cell: a missing-value marker, a date or a plain string.
fn text_cell(s: &str) -> Value {
    if NA_TOKENS.contains(&s.trim()) {
        Value::Null
    } else {
        text_value(s)
    }
}

/// Classify a piece of text as a date (`YYYY-MM-DD...`) or a plain string.
fn text_value(s: &str) -> Value {
    if looks_like_iso_date(s) {
        Value::Date(s.to_string())
    } else {
        Value::String(s.to_string())
    }
}

fn looks_like_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 10 {
        return false;
    }
    let digits = |r: std::ops::Range<usize>| b[r].iter().all(u8::is_ascii_digit);
    digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && (b.len() == 10 || b[10] == b' ' || b[10] == b'T')
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// Read the first worksheet of an Excel or OpenDocument workbook.
fn load_workbook(path: &Path) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("reading first worksheet")?;
    read_sheet(&range)
}

/// First row holds the column names; blank header cells are named
/// `Unnamed: <n>` after their position.
pub fn read_sheet(range: &Range<Data>) -> Result<Dataset> {
    let mut rows = range.rows();
    let header = rows.next().context("worksheet is empty")?;
    let headers = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => format!("Unnamed: {i}"),
            other => other.to_string(),
        })
        .collect();
    let rows = rows.map(|row| row.iter().map(sheet_value).collect()).collect();
    Ok(Dataset::from_rows(headers, rows))
}

fn sheet_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        // Spreadsheets store every number as a double
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Integer(*f as i64),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(when) => {
                let text = when.format("%Y-%m-%d %H:%M:%S").to_string();
                Value::Date(text.trim_end_matches(" 00:00:00").to_string())
            }
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Value::Date(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Region": "North", "Category": "Electronics", "Sales": 5400.0 },
///   ...
/// ]
/// ```
///
/// Columns appear in the order they are first seen; missing keys become nulls.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

pub fn parse_json_records(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut keyed_rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let idx = *positions.entry(key.clone()).or_insert_with(|| {
                column_names.push(key.clone());
                column_names.len() - 1
            });
            cells.push((idx, json_to_value(val)));
        }
        keyed_rows.push(cells);
    }

    let width = column_names.len();
    let rows = keyed_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![Value::Null; width];
            for (idx, value) in cells {
                row[idx] = value;
            }
            row
        })
        .collect();

    Ok(Dataset::from_rows(column_names, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => text_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Every column becomes a dataset column.
///
/// Integer columns of any width are widened to `i64`, floats to `f64`;
/// dates and timestamps are rendered as ISO-8601 text.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<Value>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch
            .columns()
            .iter()
            .zip(&column_names)
            .map(|(col, name)| {
                normalize_column(col).with_context(|| format!("column '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let values = columns
                .iter()
                .zip(&column_names)
                .map(|(col, name)| {
                    extract_value(col, row)
                        .with_context(|| format!("Row {row}: failed to read '{name}'"))
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(values);
        }
    }

    Ok(Dataset::from_rows(column_names, rows))
}

// -- Parquet / Arrow helpers --

/// Cast integer and float columns to their 64-bit counterparts so that value
/// extraction only has to deal with a handful of physical types.
fn normalize_column(col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(DataType::Int64),
        DataType::Float16 | DataType::Float32 => Some(DataType::Float64),
        DataType::Utf8View | DataType::LargeUtf8 => Some(DataType::Utf8),
        _ => None,
    };
    match target {
        Some(dt) => cast(col, &dt).with_context(|| format!("casting to {dt:?}")),
        None => Ok(col.clone()),
    }
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::Int64 => {
            let arr = col
                .as_primitive_opt::<Int64Type>()
                .context("expected Int64Array")?;
            Value::Integer(arr.value(row))
        }
        DataType::Float64 => {
            let arr = col
                .as_primitive_opt::<Float64Type>()
                .context("expected Float64Array")?;
            Value::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_boolean_opt().context("expected BooleanArray")?;
            Value::Bool(arr.value(row))
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            Value::Date(array_value_to_string(col, row).context("formatting date")?)
        }
        _ => Value::String(array_value_to_string(col, row).context("formatting value")?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::model::ColumnType;

    #[test]
    fn csv_cells_are_typed() {
        let data = "Category,Sales,Date,Active\nA,100,2024-01-02,true\nB,200.5,2024-01-03,false\nA,,2024-02-01,true\n";
        let ds = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(ds.len(), 3);
        let dtypes: Vec<ColumnType> = ds.columns.iter().map(|c| c.dtype).collect();
        assert_eq!(
            dtypes,
            vec![
                ColumnType::Text,
                ColumnType::Float,
                ColumnType::Date,
                ColumnType::Bool
            ]
        );
        assert_eq!(ds.rows[2][1], Value::Null);
        assert_eq!(ds.rows[0][1], Value::Integer(100));
    }

    #[test]
    fn json_records_keep_first_seen_columns_and_fill_nulls() {
        let text = r#"[{"Category":"A","Sales":100},{"Sales":2.5,"Extra":"x"}]"#;
        let ds = parse_json_records(text).unwrap();

        assert_eq!(ds.columns.len(), 3);
        let names: Vec<&str> = ds.column_names().collect();
        assert!(names.contains(&"Extra"));
        let extra = ds.column_index("Extra").unwrap();
        assert_eq!(ds.rows[0][extra], Value::Null);
        assert_eq!(ds.column("Sales").unwrap().dtype, ColumnType::Float);
    }

    #[test]
    fn json_rejects_non_array_root() {
        assert!(parse_json_records(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Category,Sales").unwrap();
        writeln!(f, "A,1").unwrap();
        drop(f);

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 1);

        let err = load_file(&dir.path().join("data.xlsx")).unwrap_err();
        assert!(err.to_string().contains("opening workbook"), "{err}");

        let err = load_file(&dir.path().join("data.txt")).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn missing_markers_become_nulls() {
        let data = "Name,Sales\nNan,100\nBob,NaN\nNA,NA\nAl,N/A\nJo,2.5\n";
        let ds = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(ds.column("Sales").unwrap().dtype, ColumnType::Float);
        assert_eq!(ds.column("Name").unwrap().dtype, ColumnType::Text);
        assert_eq!(ds.rows[0][0], Value::String("Nan".into()));
        assert_eq!(ds.rows[1][1], Value::Null);
        assert_eq!(ds.rows[2], vec![Value::Null, Value::Null]);
        assert_eq!(ds.rows[3][1], Value::Null);
    }

    #[test]
    fn infinities_are_numbers_only_in_numeric_columns() {
        let data = "Label,Ratio\ninf,1.5\nx,-inf\n";
        let ds = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(ds.column("Label").unwrap().dtype, ColumnType::Text);
        assert_eq!(ds.rows[0][0], Value::String("inf".into()));
        assert_eq!(ds.column("Ratio").unwrap().dtype, ColumnType::Float);
        assert_eq!(ds.rows[1][1], Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn worksheet_cells_are_typed() {
        let mut range: Range<Data> = Range::new((0, 0), (3, 3));
        for (col, name) in ["Region", "Sales", "Active", "Date"].into_iter().enumerate() {
            range.set_value((0, col as u32), Data::String(name.into()));
        }
        range.set_value((1, 0), Data::String("North".into()));
        range.set_value((1, 1), Data::Float(120.0));
        range.set_value((1, 2), Data::Bool(true));
        range.set_value((1, 3), Data::DateTimeIso("2024-01-02".into()));
        range.set_value((2, 0), Data::String("South".into()));
        range.set_value((2, 1), Data::Float(80.5));
        range.set_value((2, 2), Data::Bool(false));
        range.set_value((3, 0), Data::String("NA".into()));
        range.set_value((3, 1), Data::Int(7));

        let ds = read_sheet(&range).unwrap();
        assert_eq!(
            ds.column_names().collect::<Vec<_>>(),
            vec!["Region", "Sales", "Active", "Date"]
        );
        assert_eq!(ds.len(), 3);
        let dtypes: Vec<ColumnType> = ds.columns.iter().map(|c| c.dtype).collect();
        assert_eq!(
            dtypes,
            vec![
                ColumnType::Text,
                ColumnType::Float,
                ColumnType::Bool,
                ColumnType::Date
            ]
        );
        assert_eq!(ds.rows[0][1], Value::Integer(120));
        assert_eq!(ds.rows[2][0], Value::Null);
        assert_eq!(ds.rows[2][3], Value::Null);
    }

    #[test]
    fn blank_header_cells_get_positional_names() {
        let mut range: Range<Data> = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), Data::String("Sales".into()));
        range.set_value((1, 0), Data::Int(1));
        range.set_value((1, 1), Data::Int(2));

        let ds = read_sheet(&range).unwrap();
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["Sales", "Unnamed: 1"]);
    }

    #[test]
    fn iso_dates_are_detected() {
        assert!(looks_like_iso_date("2024-03-01"));
        assert!(looks_like_iso_date("2024-03-01T10:00:00"));
        assert!(!looks_like_iso_date("2024/03/01"));
        assert!(!looks_like_iso_date("Electronics"));
    }
}
