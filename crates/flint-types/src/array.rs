use crate::datatype::DataType;
use crate::scalar::ScalarValue;
use crate::validity::Validity;

/// A typed, fixed-length column of values plus a validity bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArray<T> {
    pub values: Vec<T>,
    pub validity: Validity,
}

impl<T: Clone> PrimitiveArray<T> {
    pub fn from_values(values: Vec<T>) -> Self {
        let len = values.len();
        PrimitiveArray {
            values,
            validity: Validity::from_bools(std::iter::repeat(true).take(len)),
        }
    }

    pub fn from_options(values: impl IntoIterator<Item = Option<T>>, fill: T) -> Self {
        let mut data = Vec::new();
        let mut valid = Vec::new();
        for v in values {
            match v {
                Some(v) => {
                    data.push(v);
                    valid.push(true);
                }
                None => {
                    data.push(fill.clone());
                    valid.push(false);
                }
            }
        }
        PrimitiveArray {
            values: data,
            validity: Validity::from_bools(valid),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.is_valid(idx)
    }

    pub fn value(&self, idx: usize) -> Option<&T> {
        if self.is_valid(idx) {
            self.values.get(idx)
        } else {
            None
        }
    }
}

/// A columnar array of one of the engine's logical data types.
///
/// Kept as a tagged enum over typed arrays rather than one dynamically typed
/// container, so kernels in the expression evaluator and aggregate
/// operators dispatch once per batch rather than once per value.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Null(usize),
    Boolean(PrimitiveArray<bool>),
    Int64(PrimitiveArray<i64>),
    Float64(PrimitiveArray<f64>),
    Utf8(PrimitiveArray<String>),
    Date32(PrimitiveArray<i32>),
    Timestamp(PrimitiveArray<i64>),
}

impl Array {
    pub fn datatype(&self) -> DataType {
        match self {
            Array::Null(_) => DataType::Null,
            Array::Boolean(_) => DataType::Boolean,
            Array::Int64(_) => DataType::Int64,
            Array::Float64(_) => DataType::Float64,
            Array::Utf8(_) => DataType::Utf8,
            Array::Date32(_) => DataType::Date32,
            Array::Timestamp(_) => DataType::Timestamp,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Null(n) => *n,
            Array::Boolean(a) => a.len(),
            Array::Int64(a) => a.len(),
            Array::Float64(a) => a.len(),
            Array::Utf8(a) => a.len(),
            Array::Date32(a) => a.len(),
            Array::Timestamp(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        match self {
            Array::Null(_) => false,
            Array::Boolean(a) => a.is_valid(idx),
            Array::Int64(a) => a.is_valid(idx),
            Array::Float64(a) => a.is_valid(idx),
            Array::Utf8(a) => a.is_valid(idx),
            Array::Date32(a) => a.is_valid(idx),
            Array::Timestamp(a) => a.is_valid(idx),
        }
    }

    /// Fetch the value at `idx` as an owned [`ScalarValue`].
    pub fn scalar(&self, idx: usize) -> ScalarValue {
        if !self.is_valid(idx) {
            return ScalarValue::Null;
        }
        match self {
            Array::Null(_) => ScalarValue::Null,
            Array::Boolean(a) => ScalarValue::Boolean(a.values[idx]),
            Array::Int64(a) => ScalarValue::Int64(a.values[idx]),
            Array::Float64(a) => ScalarValue::Float64(a.values[idx]),
            Array::Utf8(a) => ScalarValue::Utf8(a.values[idx].clone()),
            Array::Date32(a) => ScalarValue::Date32(a.values[idx]),
            Array::Timestamp(a) => ScalarValue::Timestamp(a.values[idx]),
        }
    }

    /// Broadcast a scalar to an array of the given length, used when a
    /// literal appears in an expression evaluated over a whole morsel.
    pub fn broadcast(scalar: &ScalarValue, len: usize) -> Array {
        match scalar {
            ScalarValue::Null => Array::Null(len),
            ScalarValue::Boolean(v) => Array::Boolean(PrimitiveArray::from_values(vec![*v; len])),
            ScalarValue::Int64(v) => Array::Int64(PrimitiveArray::from_values(vec![*v; len])),
            ScalarValue::Float64(v) => Array::Float64(PrimitiveArray::from_values(vec![*v; len])),
            ScalarValue::Utf8(v) => Array::Utf8(PrimitiveArray::from_values(vec![v.clone(); len])),
            ScalarValue::Date32(v) => Array::Date32(PrimitiveArray::from_values(vec![*v; len])),
            ScalarValue::Timestamp(v) => {
                Array::Timestamp(PrimitiveArray::from_values(vec![*v; len]))
            }
            ScalarValue::Interval(..) => Array::Null(len),
        }
    }

    /// Select rows by index, used by `Sort`, join probes, and filter masks.
    pub fn take(&self, indices: &[usize]) -> Array {
        match self {
            Array::Null(_) => Array::Null(indices.len()),
            Array::Boolean(a) => Array::Boolean(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).copied()),
                false,
            )),
            Array::Int64(a) => Array::Int64(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).copied()),
                0,
            )),
            Array::Float64(a) => Array::Float64(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).copied()),
                0.0,
            )),
            Array::Utf8(a) => Array::Utf8(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).cloned()),
                String::new(),
            )),
            Array::Date32(a) => Array::Date32(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).copied()),
                0,
            )),
            Array::Timestamp(a) => Array::Timestamp(PrimitiveArray::from_options(
                indices.iter().map(|&i| a.value(i).copied()),
                0,
            )),
        }
    }

    /// Boolean mask filter, used by the `Filter` operator.
    pub fn filter(&self, mask: &PrimitiveArray<bool>) -> Array {
        let indices: Vec<usize> = (0..self.len())
            .filter(|&i| mask.is_valid(i) && mask.values[i])
            .collect();
        self.take(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_respects_nulls() {
        let arr = Array::Int64(PrimitiveArray::from_options(
            vec![Some(1), None, Some(3)],
            0,
        ));
        let taken = arr.take(&[2, 1, 0]);
        assert_eq!(taken.scalar(0), ScalarValue::Int64(3));
        assert_eq!(taken.scalar(1), ScalarValue::Null);
        assert_eq!(taken.scalar(2), ScalarValue::Int64(1));
    }

    #[test]
    fn filter_keeps_only_true_rows() {
        let arr = Array::Int64(PrimitiveArray::from_values(vec![10, 20, 30]));
        let mask = PrimitiveArray::from_values(vec![true, false, true]);
        let filtered = arr.filter(&mask);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.scalar(0), ScalarValue::Int64(10));
        assert_eq!(filtered.scalar(1), ScalarValue::Int64(30));
    }

    #[test]
    fn broadcast_fills_whole_array() {
        let arr = Array::broadcast(&ScalarValue::Utf8("x".into()), 3);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.scalar(2), ScalarValue::Utf8("x".into()));
    }
}
