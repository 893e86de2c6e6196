//! An LSB-ordered bitmap used to track array validity.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    len: usize,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new_with_all_true(len: usize) -> Self {
        Bitmap::from_bool_iter(std::iter::repeat(true).take(len))
    }

    pub fn from_bool_iter(iter: impl IntoIterator<Item = bool>) -> Self {
        let mut data = Vec::new();
        let mut len = 0;
        let mut iter = iter.into_iter().peekable();

        while iter.peek().is_some() {
            let mut byte = 0u8;
            let mut bit_len = 0;

            for idx in 0..8 {
                match iter.next() {
                    Some(true) => {
                        byte |= 1 << idx;
                        bit_len += 1;
                    }
                    Some(false) => bit_len += 1,
                    None => break,
                }
            }

            if bit_len == 0 {
                break;
            }

            data.push(byte);
            len += bit_len;
        }

        Bitmap { len, data }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn value(&self, idx: usize) -> bool {
        let byte = self.data[idx / 8];
        (byte & (1 << (idx % 8))) != 0
    }

    pub fn popcnt(&self) -> usize {
        (0..self.len).filter(|&idx| self.value(idx)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |idx| self.value(idx))
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Bitmap::from_bool_iter(iter)
    }
}
