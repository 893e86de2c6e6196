use std::fmt;

/// Logical data types flowing through arrays, columns, and expressions.
///
/// This is intentionally a flatter set than a full Arrow type system: the
/// engine only needs to reason about the types its functions, comparisons
/// and connectors actually dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unknown/unresolved type. Used transiently before a literal or
    /// parameter has been typed; never appears on a bound column.
    Unknown,
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date32,
    Timestamp,
    Interval,
    /// A nested list, used by `UNNEST` targets and `GENERATE_SERIES`-style
    /// function datasets before they're flattened to a row-producing column.
    List(Box<DataType>),
    /// A disposition-tagged struct. Not otherwise structurally typed; the
    /// struct fields are looked up by [`crate::schema::Column`] disposition.
    Struct,
}

impl DataType {
    pub const fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Whether this type is one of the four the specification names as
    /// eligible for predicate pushdown into a connector (§4.4, §6).
    pub const fn is_pushable(&self) -> bool {
        matches!(
            self,
            DataType::Boolean | DataType::Float64 | DataType::Int64 | DataType::Utf8
        )
    }

    /// `true` when the type is not yet known; callers should not use this
    /// to reject a comparison (type 0 / unknown is ignored per §4.2).
    pub const fn is_unknown(&self) -> bool {
        matches!(self, DataType::Unknown)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Unknown => write!(f, "UNKNOWN"),
            DataType::Null => write!(f, "NULL"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Int64 => write!(f, "INTEGER"),
            DataType::Float64 => write!(f, "DOUBLE"),
            DataType::Utf8 => write!(f, "VARCHAR"),
            DataType::Date32 => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Interval => write!(f, "INTERVAL"),
            DataType::List(inner) => write!(f, "ARRAY({inner})"),
            DataType::Struct => write!(f, "STRUCT"),
        }
    }
}
