use std::io::Write;
use std::path::Path;

use super::error::ExportError;
use super::filter::FilteredView;
use super::model::Value;

/// Write the rows of `view` as CSV: a header row with the dataset's columns,
/// then one record per row. No index column is added; nulls become empty
/// fields.
pub fn write_csv<W: Write>(view: &FilteredView, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(view.dataset().column_names())?;
    for row in view.rows() {
        wtr.write_record(row.iter().map(cell_text))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export `view` to a CSV file at `path`, returning the number of data rows written.
pub fn export_csv(view: &FilteredView, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(view, std::io::BufWriter::new(file))?;
    log::info!("Exported {} rows to {}", view.len(), path.display());
    Ok(view.len())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        // `{:?}` keeps the decimal point, so floats reload as floats
        Value::Float(f) => format!("{f:?}"),
        Value::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::filter::apply_filter;
    use crate::data::model::Dataset;

    fn dataset() -> Arc<Dataset> {
        Arc::new(Dataset::from_rows(
            vec!["Category".into(), "Sales".into(), "Note".into()],
            vec![
                vec![Value::String("A".into()), Value::Float(100.5), Value::Null],
                vec![
                    Value::String("B, Inc".into()),
                    Value::Integer(200),
                    Value::String("ok".into()),
                ],
                vec![Value::String("A".into()), Value::Integer(50), Value::Null],
            ],
        ))
    }

    fn to_string(view: &FilteredView) -> String {
        let mut buf = Vec::new();
        write_csv(view, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_and_rows_without_index() {
        let view = apply_filter(&dataset(), "Sales > 60").unwrap();
        assert_eq!(
            to_string(&view),
            "Category,Sales,Note\nA,100.5,\n\"B, Inc\",200,ok\n"
        );
    }

    #[test]
    fn empty_view_still_has_header() {
        let view = apply_filter(&dataset(), "Sales > 1000").unwrap();
        assert_eq!(to_string(&view), "Category,Sales,Note\n");
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered_data.csv");
        let view = apply_filter(&dataset(), "").unwrap();

        let written = export_csv(&view, &path).unwrap();
        assert_eq!(written, 3);

        let reloaded = crate::data::loader::load_file(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.columns, dataset().columns);
    }
}
