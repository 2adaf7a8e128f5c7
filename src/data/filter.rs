use std::cmp::Ordering;
use std::sync::Arc;

use super::error::FilterSyntaxError;
use super::expr::{self, CmpOp, Expr, Operand};
use super::model::{ColumnType, Dataset, Value};

// ---------------------------------------------------------------------------
// Filtered view: the dataset plus the indices of rows that passed
// ---------------------------------------------------------------------------

/// A subset of a [`Dataset`], identified by ascending row indices.
///
/// Rows are never copied, so a view can only ever contain rows of its dataset.
#[derive(Debug, Clone)]
pub struct FilteredView {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl FilteredView {
    /// A view containing every row.
    pub fn all(dataset: Arc<Dataset>) -> Self {
        let indices = (0..dataset.len()).collect();
        FilteredView { dataset, indices }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Shared handle to the underlying dataset.
    pub fn source(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over the rows in the view, in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.indices.iter().map(|&i| self.dataset.rows[i].as_slice())
    }

    /// The `n`-th row of the view.
    pub fn row(&self, n: usize) -> Option<&[Value]> {
        let idx = *self.indices.get(n)?;
        self.dataset.rows.get(idx).map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// apply_filter
// ---------------------------------------------------------------------------

/// Keep the rows of `dataset` for which `expression` is true.
///
/// An empty (or blank) expression keeps every row. The expression is parsed,
/// checked against the dataset's columns and only then evaluated, so a bad
/// expression never produces a partial result.
pub fn apply_filter(
    dataset: &Arc<Dataset>,
    expression: &str,
) -> Result<FilteredView, FilterSyntaxError> {
    if expression.trim().is_empty() {
        return Ok(FilteredView::all(Arc::clone(dataset)));
    }

    let ast = expr::parse(expression)?;
    let predicate = bind(&ast, dataset, expression)?;

    let indices = dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| predicate.eval(row))
        .map(|(i, _)| i)
        .collect();

    Ok(FilteredView {
        dataset: Arc::clone(dataset),
        indices,
    })
}

// ---------------------------------------------------------------------------
// Binding: resolve column names to indices and type-check comparisons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Term {
    Column(usize),
    Literal(Value),
}

impl Term {
    fn value<'a>(&'a self, row: &'a [Value]) -> &'a Value {
        match self {
            Term::Column(i) => &row[*i],
            Term::Literal(v) => v,
        }
    }
}

/// An expression whose columns have been resolved against one dataset.
#[derive(Debug, Clone)]
enum Predicate {
    Compare(Term, CmpOp, Term),
    In {
        term: Term,
        list: Vec<Value>,
        negated: bool,
    },
    Truthy(Term),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

/// Broad kinds used for the static ordering check. `None` means the column
/// type does not pin a kind (mixed or all-null) and is checked per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    Text,
    Bool,
}

fn kind_of(dtype: ColumnType) -> Option<Kind> {
    match dtype {
        ColumnType::Integer | ColumnType::Float => Some(Kind::Number),
        ColumnType::Text | ColumnType::Date => Some(Kind::Text),
        ColumnType::Bool => Some(Kind::Bool),
        ColumnType::Mixed | ColumnType::Empty => None,
    }
}

fn bind(ast: &Expr, dataset: &Dataset, src: &str) -> Result<Predicate, FilterSyntaxError> {
    let predicate = match ast {
        Expr::Compare { left, op, right } => {
            let (lt, lkind) = bind_operand(left, dataset, src)?;
            let (rt, rkind) = bind_operand(right, dataset, src)?;
            if op.is_ordering() {
                if let (Some(a), Some(b)) = (lkind, rkind) {
                    if a != b {
                        return Err(FilterSyntaxError::new(
                            src,
                            operand_pos(left),
                            format!(
                                "cannot compare {} with {} using '{op}'",
                                describe(left, dataset),
                                describe(right, dataset)
                            ),
                        ));
                    }
                }
            }
            Predicate::Compare(lt, *op, rt)
        }
        Expr::In {
            operand,
            list,
            negated,
        } => {
            let (term, _) = bind_operand(operand, dataset, src)?;
            Predicate::In {
                term,
                list: list.clone(),
                negated: *negated,
            }
        }
        Expr::Truthy(operand) => {
            let (term, kind) = bind_operand(operand, dataset, src)?;
            let is_bool = match operand {
                Operand::Literal(v) => matches!(v, Value::Bool(_)),
                Operand::Column { .. } => kind.is_none() || kind == Some(Kind::Bool),
            };
            if !is_bool {
                return Err(FilterSyntaxError::new(
                    src,
                    operand_pos(operand),
                    format!(
                        "{} is not a condition; compare it with a value, e.g. `x > 0`",
                        describe(operand, dataset)
                    ),
                ));
            }
            Predicate::Truthy(term)
        }
        Expr::And(a, b) => Predicate::And(
            Box::new(bind(a, dataset, src)?),
            Box::new(bind(b, dataset, src)?),
        ),
        Expr::Or(a, b) => Predicate::Or(
            Box::new(bind(a, dataset, src)?),
            Box::new(bind(b, dataset, src)?),
        ),
        Expr::Not(inner) => Predicate::Not(Box::new(bind(inner, dataset, src)?)),
    };
    Ok(predicate)
}

fn bind_operand(
    operand: &Operand,
    dataset: &Dataset,
    src: &str,
) -> Result<(Term, Option<Kind>), FilterSyntaxError> {
    match operand {
        Operand::Column { name, pos } => {
            let idx = dataset.column_index(name).ok_or_else(|| {
                FilterSyntaxError::new(src, *pos, format!("name '{name}' is not defined"))
            })?;
            Ok((Term::Column(idx), kind_of(dataset.columns[idx].dtype)))
        }
        Operand::Literal(v) => Ok((Term::Literal(v.clone()), kind_of(v.column_type()))),
    }
}

fn operand_pos(operand: &Operand) -> usize {
    match operand {
        Operand::Column { pos, .. } => *pos,
        Operand::Literal(_) => 0,
    }
}

fn describe(operand: &Operand, dataset: &Dataset) -> String {
    match operand {
        Operand::Column { name, .. } => match dataset.column(name) {
            Some(c) => format!("{} column '{name}'", c.dtype),
            None => format!("column '{name}'"),
        },
        Operand::Literal(v) => format!("{} value {v}", v.column_type()),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

impl Predicate {
    fn eval(&self, row: &[Value]) -> bool {
        match self {
            Predicate::Compare(l, op, r) => compare(l.value(row), *op, r.value(row)),
            Predicate::In {
                term,
                list,
                negated,
            } => {
                let v = term.value(row);
                let found = list.iter().any(|item| compare(v, CmpOp::Eq, item));
                found != *negated
            }
            Predicate::Truthy(t) => matches!(t.value(row), Value::Bool(true)),
            Predicate::And(a, b) => a.eval(row) && b.eval(row),
            Predicate::Or(a, b) => a.eval(row) || b.eval(row),
            Predicate::Not(inner) => !inner.eval(row),
        }
    }
}

/// Compare two cells.
///
/// Nulls and values of different kinds are unequal to everything and never
/// ordered, so only `!=` holds for them.
pub fn compare(a: &Value, op: CmpOp, b: &Value) -> bool {
    let ordering = match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            }
        }
        (
            Value::String(x) | Value::Date(x),
            Value::String(y) | Value::Date(y),
        ) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    };
    match ordering {
        Some(o) => match op {
            CmpOp::Eq => o == Ordering::Equal,
            CmpOp::Ne => o != Ordering::Equal,
            CmpOp::Lt => o == Ordering::Less,
            CmpOp::Le => o != Ordering::Greater,
            CmpOp::Gt => o == Ordering::Greater,
            CmpOp::Ge => o != Ordering::Less,
        },
        None => op == CmpOp::Ne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Arc<Dataset> {
        Arc::new(Dataset::from_rows(
            vec!["Category".into(), "Sales".into(), "Active".into()],
            vec![
                vec![Value::String("A".into()), Value::Integer(100), Value::Bool(true)],
                vec![Value::String("B".into()), Value::Integer(200), Value::Bool(false)],
                vec![Value::String("A".into()), Value::Integer(50), Value::Bool(true)],
            ],
        ))
    }

    fn matching(expr: &str) -> Vec<usize> {
        apply_filter(&sales(), expr).unwrap().indices().to_vec()
    }

    #[test]
    fn empty_expression_keeps_everything() {
        let ds = sales();
        let view = apply_filter(&ds, "").unwrap();
        assert_eq!(view.indices(), &[0, 1, 2]);
        assert_eq!(view.rows().count(), ds.len());
        assert_eq!(apply_filter(&ds, "  \t").unwrap().len(), 3);
    }

    #[test]
    fn numeric_comparison_filters_rows() {
        assert_eq!(matching("Sales > 60"), vec![0, 1]);
        assert_eq!(matching("Sales <= 100"), vec![0, 2]);
        assert_eq!(matching("Sales == 100.0"), vec![0]);
        assert_eq!(matching("60 < Sales"), vec![0, 1]);
        assert_eq!(matching("(Sales) > 60"), vec![0, 1]);
    }

    #[test]
    fn string_and_logical_operators() {
        assert_eq!(matching("Category == 'A'"), vec![0, 2]);
        assert_eq!(matching("Category == 'A' and Sales > 60"), vec![0]);
        assert_eq!(matching("Category == 'B' or Sales < 60"), vec![1, 2]);
        assert_eq!(matching("not Category == 'A'"), vec![1]);
        assert_eq!(matching("Category in ['B', 'C']"), vec![1]);
        assert_eq!(matching("Category not in ['B']"), vec![0, 2]);
        assert_eq!(matching("Active"), vec![0, 2]);
        assert_eq!(matching("~Active"), vec![1]);
    }

    #[test]
    fn filter_is_sound_and_complete() {
        let ds = sales();
        let view = apply_filter(&ds, "Sales >= 100").unwrap();
        let sales_idx = ds.column_index("Sales").unwrap();
        for (i, row) in ds.rows.iter().enumerate() {
            let passes = row[sales_idx].as_f64().unwrap() >= 100.0;
            assert_eq!(view.indices().contains(&i), passes);
        }
    }

    #[test]
    fn malformed_expression_is_a_syntax_error() {
        let err = apply_filter(&sales(), "Sales >> 60").unwrap_err();
        assert_eq!(err.expression, "Sales >> 60");
    }

    #[test]
    fn unknown_column_is_a_syntax_error() {
        let err = apply_filter(&sales(), "Revenue > 5").unwrap_err();
        assert!(err.message.contains("'Revenue' is not defined"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn ordering_text_against_number_is_rejected() {
        let err = apply_filter(&sales(), "Category > 5").unwrap_err();
        assert!(err.message.contains("cannot compare"), "{}", err.message);
        // equality across kinds is allowed, it is just never true
        assert!(matching("Category == 5").is_empty());
    }

    #[test]
    fn non_boolean_operand_is_not_a_condition() {
        assert!(apply_filter(&sales(), "Sales").is_err());
        assert!(apply_filter(&sales(), "'x'").is_err());
        assert_eq!(matching("True"), vec![0, 1, 2]);
    }

    #[test]
    fn nulls_only_satisfy_not_equal() {
        assert!(!compare(&Value::Null, CmpOp::Eq, &Value::Null));
        assert!(!compare(&Value::Null, CmpOp::Lt, &Value::Integer(1)));
        assert!(compare(&Value::Null, CmpOp::Ne, &Value::Integer(1)));
        assert!(compare(&Value::Integer(2), CmpOp::Gt, &Value::Float(1.5)));
        assert!(compare(
            &Value::Date("2024-01-02".into()),
            CmpOp::Ge,
            &Value::String("2024-01-01".into())
        ));
    }
}
