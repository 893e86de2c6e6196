//! The `Limit` operator (§4.4): emits up to N rows across morsels, then
//! stops pulling upstream entirely.

use flint_error::Result;
use flint_types::{Array, Morsel};

use crate::operator::OperatorStream;

struct LimitStream {
    upstream: OperatorStream,
    remaining: i64,
    done: bool,
}

pub fn build_limit(n: i64, upstream: OperatorStream) -> OperatorStream {
    Box::new(LimitStream { upstream, remaining: n.max(0), done: n <= 0 })
}

impl Iterator for LimitStream {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let morsel = match self.upstream.next()? {
            Ok(m) => m,
            Err(e) => return Some(Err(e)),
        };
        let rows = morsel.num_rows() as i64;
        if rows <= self.remaining {
            self.remaining -= rows;
            if self.remaining == 0 {
                self.done = true;
            }
            return Some(Ok(morsel));
        }
        let take = self.remaining as usize;
        self.done = true;
        let indices: Vec<usize> = (0..take).collect();
        let columns: Vec<Array> = morsel.columns().iter().map(|c| c.take(&indices)).collect();
        Some(Morsel::try_new(columns))
    }
}
