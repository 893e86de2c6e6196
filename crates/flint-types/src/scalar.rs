use std::fmt;

use crate::datatype::DataType;

/// A single scalar value, either a literal from SQL text or a value pulled
/// out of an array at a particular row.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    /// Months, days, microseconds.
    Interval(i32, i32, i64),
}

impl ScalarValue {
    pub fn datatype(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Date32(_) => DataType::Date32,
            ScalarValue::Timestamp(_) => DataType::Timestamp,
            ScalarValue::Interval(..) => DataType::Interval,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Coerce int/float scalars onto a common float domain, the way the
    /// evaluator does for cross-type comparisons in joins (§4.5).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Utf8(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Boolean(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::Utf8(v) => write!(f, "'{v}'"),
            ScalarValue::Date32(v) => write!(f, "DATE({v})"),
            ScalarValue::Timestamp(v) => write!(f, "TIMESTAMP({v})"),
            ScalarValue::Interval(months, days, micros) => {
                write!(f, "INTERVAL({months}mo {days}d {micros}us)")
            }
        }
    }
}

/// Ordering over scalars used by `Sort` and comparison kernels. Nulls sort
/// last, matching the engine's default `ORDER BY` behavior.
impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => Some(Ordering::Equal),
            (ScalarValue::Null, _) => Some(Ordering::Greater),
            (_, ScalarValue::Null) => Some(Ordering::Less),
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => a.partial_cmp(b),
            (ScalarValue::Int64(a), ScalarValue::Int64(b)) => a.partial_cmp(b),
            (ScalarValue::Float64(a), ScalarValue::Float64(b)) => a.partial_cmp(b),
            (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => a.partial_cmp(b),
            (ScalarValue::Date32(a), ScalarValue::Date32(b)) => a.partial_cmp(b),
            (ScalarValue::Timestamp(a), ScalarValue::Timestamp(b)) => a.partial_cmp(b),
            // Cross-type numeric comparisons are coerced to a common float
            // domain per §4.5.
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}
