use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Group keys live in `BTreeMap`s downstream, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text; lexical order is chronological.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeMap keys --

/// Float key used by `Ord` and `Hash`: `-0.0` folds into `0.0` and every NaN
/// into one canonical NaN.
fn float_key(f: f64) -> f64 {
    if f.is_nan() {
        f64::NAN
    } else if f == 0.0 {
        0.0
    } else {
        f
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let ra = rank(self);
        let rb = rank(other);
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => float_key(*a).total_cmp(&float_key(*b)),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) | Value::Date(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => float_key(*f).to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Numeric view of the value; `None` for non-numeric cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Missing value: `Null`, or a float NaN as Parquet and dataframes write it.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view that treats missing values as absent.
    pub fn number(&self) -> Option<f64> {
        if self.is_null() {
            None
        } else {
            self.as_f64()
        }
    }

    /// The column type this single value would imply.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::Text,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(f) if f.is_nan() => ColumnType::Empty,
            Value::Float(_) => ColumnType::Float,
            Value::Bool(_) => ColumnType::Bool,
            Value::Date(_) => ColumnType::Date,
            Value::Null => ColumnType::Empty,
        }
    }
}

// ---------------------------------------------------------------------------
// Column types
// ---------------------------------------------------------------------------

/// The fixed dtype of a column, inferred once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Bool,
    Date,
    /// Values of several incompatible kinds.
    Mixed,
    /// Only nulls (or no rows at all).
    Empty,
}

impl ColumnType {
    /// Widen `self` so that it also admits values of type `other`.
    pub fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, Empty) => a,
            (Empty, b) => b,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Mixed,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Columns offered for grouping: string-typed (pandas `object`) columns.
    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Mixed)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
            ColumnType::Mixed => "mixed",
            ColumnType::Empty => "empty",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

/// The full parsed table. Rows are stored positionally, aligned with `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from column names and rows, inferring each column's dtype.
    ///
    /// Short rows are padded with `Null`; extra cells are dropped.
    pub fn from_rows(column_names: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = column_names.len();
        let mut dtypes = vec![ColumnType::Empty; width];

        for row in &mut rows {
            row.resize(width, Value::Null);
            for (dtype, value) in dtypes.iter_mut().zip(row.iter()) {
                *dtype = dtype.unify(value.column_type());
            }
        }

        let columns = column_names
            .into_iter()
            .zip(dtypes)
            .map(|(name, dtype)| Column { name, dtype })
            .collect();

        Dataset { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns that can be used as the grouping axis.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.dtype.is_categorical())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Columns that can be aggregated.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }
}
