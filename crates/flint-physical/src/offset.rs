//! The `Offset` operator (§4.4): skips N rows total across morsels.

use flint_error::Result;
use flint_types::{Array, Morsel};

use crate::operator::OperatorStream;

struct OffsetStream {
    upstream: OperatorStream,
    remaining: i64,
}

pub fn build_offset(n: i64, upstream: OperatorStream) -> OperatorStream {
    Box::new(OffsetStream { upstream, remaining: n.max(0) })
}

impl Iterator for OffsetStream {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let morsel = match self.upstream.next()? {
                Ok(m) => m,
                Err(e) => return Some(Err(e)),
            };
            if self.remaining == 0 {
                return Some(Ok(morsel));
            }
            let rows = morsel.num_rows() as i64;
            if rows <= self.remaining {
                self.remaining -= rows;
                continue;
            }
            let skip = self.remaining as usize;
            self.remaining = 0;
            let indices: Vec<usize> = (skip..morsel.num_rows()).collect();
            let columns: Vec<Array> = morsel.columns().iter().map(|c| c.take(&indices)).collect();
            return Some(Morsel::try_new(columns));
        }
    }
}
