use std::sync::Arc;

use flint_error::{EngineError, ErrorKind, Result};

use crate::array::Array;

/// A columnar record batch flowing between physical operators.
///
/// Every column is the same length; operators consume and produce morsels
/// and no per-row representation exists on the hot path.
#[derive(Debug, Clone, PartialEq)]
pub struct Morsel {
    columns: Vec<Arc<Array>>,
    num_rows: usize,
}

impl Morsel {
    pub fn empty() -> Self {
        Morsel {
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    pub fn empty_with_num_rows(num_rows: usize) -> Self {
        Morsel {
            columns: Vec::new(),
            num_rows,
        }
    }

    pub fn try_new(columns: Vec<Array>) -> Result<Self> {
        let len = match columns.first() {
            Some(arr) => arr.len(),
            None => return Ok(Morsel::empty()),
        };

        for col in &columns {
            if col.len() != len {
                return Err(EngineError::new(
                    ErrorKind::InvalidInternalState,
                    format!("expected column length {len}, got {}", col.len()),
                ));
            }
        }

        Ok(Morsel {
            columns: columns.into_iter().map(Arc::new).collect(),
            num_rows: len,
        })
    }

    pub fn column(&self, idx: usize) -> Option<&Arc<Array>> {
        self.columns.get(idx)
    }

    pub fn columns(&self) -> &[Arc<Array>] {
        &self.columns
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Project and reorder columns, used by the `Project` operator.
    pub fn project(&self, indices: &[usize]) -> Self {
        Morsel {
            columns: indices.iter().map(|&idx| self.columns[idx].clone()).collect(),
            num_rows: self.num_rows,
        }
    }

    /// Concatenate with another morsel of the same schema, used by the
    /// morsel-resizing consolidation step (§4.4).
    pub fn concat(&self, other: &Morsel) -> Result<Self> {
        if self.num_columns() != other.num_columns() {
            return Err(EngineError::new(
                ErrorKind::InvalidInternalState,
                "cannot concatenate morsels with differing column counts",
            ));
        }

        let mut columns = Vec::with_capacity(self.num_columns());
        for (a, b) in self.columns.iter().zip(other.columns.iter()) {
            columns.push(Arc::new(concat_array((**a).clone(), (**b).clone())));
        }

        Ok(Morsel {
            columns,
            num_rows: self.num_rows + other.num_rows,
        })
    }

    pub fn estimated_byte_size(&self) -> usize {
        // Rough per-row estimate used for morsel-target sizing; avoids
        // walking variable-length string data on every resize decision.
        const AVG_COLUMN_BYTES: usize = 16;
        self.num_rows * self.num_columns().max(1) * AVG_COLUMN_BYTES
    }
}

fn concat_array(a: Array, b: Array) -> Array {
    use crate::array::PrimitiveArray;
    match (a, b) {
        (Array::Null(x), Array::Null(y)) => Array::Null(x + y),
        (Array::Boolean(mut x), Array::Boolean(y)) => {
            x.values.extend(y.values);
            Array::Boolean(PrimitiveArray::from_values(x.values))
        }
        (Array::Int64(mut x), Array::Int64(y)) => {
            x.values.extend(y.values);
            Array::Int64(PrimitiveArray::from_values(x.values))
        }
        (Array::Float64(mut x), Array::Float64(y)) => {
            x.values.extend(y.values);
            Array::Float64(PrimitiveArray::from_values(x.values))
        }
        (Array::Utf8(mut x), Array::Utf8(y)) => {
            x.values.extend(y.values);
            Array::Utf8(PrimitiveArray::from_values(x.values))
        }
        (Array::Date32(mut x), Array::Date32(y)) => {
            x.values.extend(y.values);
            Array::Date32(PrimitiveArray::from_values(x.values))
        }
        (Array::Timestamp(mut x), Array::Timestamp(y)) => {
            x.values.extend(y.values);
            Array::Timestamp(PrimitiveArray::from_values(x.values))
        }
        (x, _) => x, // mismatched types shouldn't occur within one column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::PrimitiveArray;

    #[test]
    fn try_new_rejects_mismatched_lengths() {
        let cols = vec![
            Array::Int64(PrimitiveArray::from_values(vec![1, 2])),
            Array::Int64(PrimitiveArray::from_values(vec![1, 2, 3])),
        ];
        assert!(Morsel::try_new(cols).is_err());
    }

    #[test]
    fn concat_sums_row_counts() {
        let a = Morsel::try_new(vec![Array::Int64(PrimitiveArray::from_values(vec![1, 2]))])
            .unwrap();
        let b = Morsel::try_new(vec![Array::Int64(PrimitiveArray::from_values(vec![3]))]).unwrap();
        let combined = a.concat(&b).unwrap();
        assert_eq!(combined.num_rows(), 3);
    }
}
