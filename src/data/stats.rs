use std::collections::BTreeMap;

use super::error::SummaryComputationError;
use super::filter::FilteredView;
use super::model::Value;

// ---------------------------------------------------------------------------
// Summary statistics over one numeric column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub sum: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Number of non-null values that went into the statistics.
    pub count: usize,
}

/// Resolve `column` in the view's dataset and insist that it is numeric.
fn numeric_column_index(
    view: &FilteredView,
    column: &str,
) -> Result<usize, SummaryComputationError> {
    let ds = view.dataset();
    let idx = ds
        .column_index(column)
        .ok_or_else(|| SummaryComputationError::UnknownColumn(column.to_string()))?;
    let dtype = ds.columns[idx].dtype;
    if !dtype.is_numeric() {
        return Err(SummaryComputationError::NotNumeric {
            column: column.to_string(),
            dtype: dtype.to_string(),
        });
    }
    Ok(idx)
}

/// Sum, mean, max and min of `column` over the rows of `view`.
///
/// Null and NaN cells are skipped, as a dataframe's `sum`/`mean` would. Fails if the
/// view is empty or has no numbers in that column.
pub fn compute_summary(
    view: &FilteredView,
    column: &str,
) -> Result<Summary, SummaryComputationError> {
    if view.is_empty() {
        return Err(SummaryComputationError::EmptySelection);
    }
    let idx = numeric_column_index(view, column)?;

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for v in view.rows().filter_map(|row| row[idx].number()) {
        sum += v;
        count += 1;
        max = max.max(v);
        min = min.min(v);
    }

    if count == 0 {
        return Err(SummaryComputationError::NoNumericData(column.to_string()));
    }

    Ok(Summary {
        sum,
        mean: sum / count as f64,
        max,
        min,
        count,
    })
}

// ---------------------------------------------------------------------------
// Grouped aggregates for the bar / pie charts
// ---------------------------------------------------------------------------

/// Sum of `numeric_column` per distinct value of `category_column`.
///
/// Groups come back sorted by category value. Missing numbers add nothing to
/// their group; a null category forms a group of its own.
pub fn group_and_sum(
    view: &FilteredView,
    category_column: &str,
    numeric_column: &str,
) -> Result<Vec<(Value, f64)>, SummaryComputationError> {
    let ds = view.dataset();
    let cat_idx = ds
        .column_index(category_column)
        .ok_or_else(|| SummaryComputationError::UnknownColumn(category_column.to_string()))?;
    let num_idx = numeric_column_index(view, numeric_column)?;

    let mut groups: BTreeMap<&Value, f64> = BTreeMap::new();
    for row in view.rows() {
        *groups.entry(&row[cat_idx]).or_insert(0.0) += row[num_idx].number().unwrap_or(0.0);
    }

    Ok(groups.into_iter().map(|(k, v)| (k.clone(), v)).collect())
}

/// One `(category, value)` point per row with a non-missing value, in row order.
pub fn scatter_points(
    view: &FilteredView,
    category_column: &str,
    numeric_column: &str,
) -> Result<Vec<(Value, f64)>, SummaryComputationError> {
    let ds = view.dataset();
    let cat_idx = ds
        .column_index(category_column)
        .ok_or_else(|| SummaryComputationError::UnknownColumn(category_column.to_string()))?;
    let num_idx = numeric_column_index(view, numeric_column)?;

    Ok(view
        .rows()
        .filter_map(|row| row[num_idx].number().map(|y| (row[cat_idx].clone(), y)))
        .collect())
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// Format a metric with thousands separators and two decimals: `1,234,567.89`.
pub fn format_metric(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0.00" reads oddly; only show the sign when something survives rounding
    let negative = value < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b));
    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::filter::apply_filter;
    use crate::data::loader::read_csv;
    use crate::data::model::Dataset;

    fn sales() -> Arc<Dataset> {
        Arc::new(Dataset::from_rows(
            vec!["Category".into(), "Sales".into()],
            vec![
                vec![Value::String("A".into()), Value::Integer(100)],
                vec![Value::String("B".into()), Value::Integer(200)],
                vec![Value::String("A".into()), Value::Integer(50)],
            ],
        ))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_over_full_dataset() {
        let view = apply_filter(&sales(), "").unwrap();
        let s = compute_summary(&view, "Sales").unwrap();
        assert!(approx(s.sum, 350.0));
        assert!(approx(s.max, 200.0));
        assert!(approx(s.min, 50.0));
        assert_eq!(format_metric(s.mean), "116.67");
        assert!(s.min <= s.mean && s.mean <= s.max);
        assert!(approx(s.sum, s.mean * s.count as f64));
    }

    #[test]
    fn groups_over_full_and_filtered_dataset() {
        let ds = sales();
        let all = apply_filter(&ds, "").unwrap();
        assert_eq!(
            group_and_sum(&all, "Category", "Sales").unwrap(),
            vec![(Value::String("A".into()), 150.0), (Value::String("B".into()), 200.0)]
        );

        let filtered = apply_filter(&ds, "Sales > 60").unwrap();
        assert_eq!(filtered.indices(), &[0, 1]);
        assert_eq!(
            group_and_sum(&filtered, "Category", "Sales").unwrap(),
            vec![(Value::String("A".into()), 100.0), (Value::String("B".into()), 200.0)]
        );
    }

    #[test]
    fn group_sums_add_up_to_summary_sum() {
        let ds = Arc::new(Dataset::from_rows(
            vec!["Region".into(), "Spend".into()],
            vec![
                vec![Value::String("North".into()), Value::Float(10.25)],
                vec![Value::Null, Value::Float(4.5)],
                vec![Value::String("South".into()), Value::Null],
                vec![Value::String("North".into()), Value::Float(-3.0)],
            ],
        ));
        let view = apply_filter(&ds, "").unwrap();
        let summary = compute_summary(&view, "Spend").unwrap();
        let groups = group_and_sum(&view, "Region", "Spend").unwrap();
        let total: f64 = groups.iter().map(|(_, v)| v).sum();
        assert!(approx(total, summary.sum));
        assert_eq!(summary.count, 3);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].0, Value::Null);
    }

    #[test]
    fn empty_selection() {
        let view = apply_filter(&sales(), "Sales > 1000").unwrap();
        assert!(view.is_empty());
        assert_eq!(
            compute_summary(&view, "Sales").unwrap_err(),
            SummaryComputationError::EmptySelection
        );
        assert!(group_and_sum(&view, "Category", "Sales").unwrap().is_empty());
        assert!(scatter_points(&view, "Category", "Sales").unwrap().is_empty());
    }

    #[test]
    fn non_numeric_or_unknown_columns_fail() {
        let view = apply_filter(&sales(), "").unwrap();
        assert!(matches!(
            compute_summary(&view, "Category"),
            Err(SummaryComputationError::NotNumeric { .. })
        ));
        assert!(matches!(
            compute_summary(&view, "Profit"),
            Err(SummaryComputationError::UnknownColumn(_))
        ));
        assert!(group_and_sum(&view, "Nope", "Sales").is_err());
    }

    #[test]
    fn all_null_numeric_column_has_no_data() {
        let ds = Arc::new(Dataset::from_rows(
            vec!["Category".into(), "Sales".into()],
            vec![
                vec![Value::String("A".into()), Value::Integer(1)],
                vec![Value::String("B".into()), Value::Null],
            ],
        ));
        let view = apply_filter(&ds, "Category == 'B'").unwrap();
        assert_eq!(
            compute_summary(&view, "Sales").unwrap_err(),
            SummaryComputationError::NoNumericData("Sales".into())
        );
    }

    #[test]
    fn scatter_keeps_row_order() {
        let view = apply_filter(&sales(), "").unwrap();
        let points = scatter_points(&view, "Category", "Sales").unwrap();
        let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
        assert_eq!(ys, vec![100.0, 200.0, 50.0]);
    }

    #[test]
    fn missing_markers_stay_out_of_the_statistics() {
        let data = "Category,Sales\nA,100\nB,NaN\nA,50\nB,NA\n";
        let ds = Arc::new(read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap());
        assert_eq!(ds.numeric_columns(), vec!["Sales".to_string()]);

        let view = apply_filter(&ds, "").unwrap();
        let s = compute_summary(&view, "Sales").unwrap();
        assert_eq!(s.count, 2);
        assert!(approx(s.sum, 150.0));
        assert!(s.min <= s.mean && s.mean <= s.max);
        assert!(approx(s.sum, s.mean * s.count as f64));

        let groups = group_and_sum(&view, "Category", "Sales").unwrap();
        assert_eq!(
            groups,
            vec![(Value::String("A".into()), 150.0), (Value::String("B".into()), 0.0)]
        );
        assert_eq!(scatter_points(&view, "Category", "Sales").unwrap().len(), 2);
    }

    #[test]
    fn nan_floats_count_as_missing() {
        let ds = Arc::new(Dataset::from_rows(
            vec!["Category".into(), "Sales".into()],
            vec![
                vec![Value::String("A".into()), Value::Float(2.5)],
                vec![Value::String("A".into()), Value::Float(f64::NAN)],
                vec![Value::String("B".into()), Value::Float(-0.0)],
                vec![Value::String("B".into()), Value::Float(0.0)],
            ],
        ));
        let view = apply_filter(&ds, "").unwrap();
        let s = compute_summary(&view, "Sales").unwrap();
        assert_eq!(s.count, 3);
        assert!(s.sum.is_finite() && s.mean.is_finite());
        assert!(s.min <= s.mean && s.mean <= s.max);

        let groups = group_and_sum(&view, "Sales", "Sales").unwrap();
        // -0.0 and 0.0 are one group; NaN groups with nothing else
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn metric_formatting() {
        assert_eq!(format_metric(0.0), "0.00");
        assert_eq!(format_metric(999.999), "1,000.00");
        assert_eq!(format_metric(1234567.891), "1,234,567.89");
        assert_eq!(format_metric(-1234.5), "-1,234.50");
        assert_eq!(format_metric(-0.001), "0.00");
        assert_eq!(format_metric(123456.0), "123,456.00");
    }
}
