use crate::bitmap::Bitmap;

/// Validity bitmap for an array.
///
/// The underlying bitmap is omitted when an array has no nulls; every value
/// is then considered valid without needing to consult a bitmap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validity(Option<Bitmap>);

impl Validity {
    pub fn all_valid() -> Self {
        Validity(None)
    }

    pub fn from_bools(iter: impl IntoIterator<Item = bool>) -> Self {
        let bitmap = Bitmap::from_bool_iter(iter);
        if bitmap.iter().all(|v| v) {
            Validity(None)
        } else {
            Validity(Some(bitmap))
        }
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        match &self.0 {
            Some(bitmap) => bitmap.value(idx),
            None => true,
        }
    }

    pub fn has_nulls(&self) -> bool {
        self.0.is_some()
    }

    pub fn null_count(&self, len: usize) -> usize {
        match &self.0 {
            Some(bitmap) => bitmap.len() - bitmap.popcnt(),
            None => {
                let _ = len;
                0
            }
        }
    }
}
