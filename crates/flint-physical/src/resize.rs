//! Morsel-sizing consolidation (§4.4): downstream of readers, morsels are
//! split or concatenated toward a target byte size so operators further
//! down the pipeline see reasonably uniform batches. A pull-based look-ahead
//! adaptor: small morsels are merged with whatever comes next, oversized
//! ones are split at a row boundary, no separate push side needed.

use flint_error::{EngineError, ErrorKind, Result};
use flint_types::{Array, Morsel};

use crate::operator::OperatorStream;

/// Default morsel target: `PAGE_SIZE`'s default (§4.8), 64 MiB.
pub const DEFAULT_TARGET_BYTES: usize = 64 * 1024 * 1024;

const SPLIT_ABOVE_RATIO: f64 = 1.2;
const MERGE_BELOW_RATIO: f64 = 0.6;

pub struct Resize {
    upstream: OperatorStream,
    target_bytes: usize,
    pending: Option<Morsel>,
    upstream_done: bool,
    saw_any_rows: bool,
    emitted_any: bool,
}

impl Resize {
    pub fn new(upstream: OperatorStream, target_bytes: usize) -> Self {
        Resize {
            upstream,
            target_bytes,
            pending: None,
            upstream_done: false,
            saw_any_rows: false,
            emitted_any: false,
        }
    }

    fn pull_upstream(&mut self) -> Option<Result<Morsel>> {
        if self.upstream_done {
            return None;
        }
        match self.upstream.next() {
            Some(Ok(m)) => {
                if m.num_rows() > 0 {
                    self.saw_any_rows = true;
                }
                Some(Ok(m))
            }
            Some(Err(e)) => {
                self.upstream_done = true;
                Some(Err(e))
            }
            None => {
                self.upstream_done = true;
                None
            }
        }
    }

    fn below_merge_threshold(&self, m: &Morsel) -> bool {
        (m.estimated_byte_size() as f64) < self.target_bytes as f64 * MERGE_BELOW_RATIO
    }

    fn above_split_threshold(&self, m: &Morsel) -> bool {
        (m.estimated_byte_size() as f64) > self.target_bytes as f64 * SPLIT_ABOVE_RATIO
    }
}

impl Iterator for Resize {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pending.is_none() {
                match self.pull_upstream() {
                    Some(Ok(m)) => self.pending = Some(m),
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        if !self.saw_any_rows && !self.emitted_any {
                            self.emitted_any = true;
                            return Some(Err(EngineError::new(
                                ErrorKind::EmptyResultSet,
                                "scan produced zero rows",
                            )));
                        }
                        return None;
                    }
                }
            }

            // Merge small morsels with whatever comes next until we either
            // reach target, exhaust upstream, or grow past the split bound.
            loop {
                let should_merge = match &self.pending {
                    Some(m) => self.below_merge_threshold(m),
                    None => false,
                };
                if !should_merge {
                    break;
                }
                match self.pull_upstream() {
                    Some(Ok(next)) => match self.pending.take().unwrap().concat(&next) {
                        Ok(merged) => self.pending = Some(merged),
                        Err(e) => return Some(Err(e)),
                    },
                    Some(Err(e)) => return Some(Err(e)),
                    None => break,
                }
            }

            let current = self.pending.take().unwrap();
            if self.above_split_threshold(&current) {
                let per_row = (current.estimated_byte_size() / current.num_rows().max(1)).max(1);
                let split_at = (self.target_bytes / per_row).clamp(1, current.num_rows().saturating_sub(1).max(1));
                if split_at < current.num_rows() {
                    let (head, tail) = split_morsel(&current, split_at);
                    self.pending = Some(tail);
                    self.emitted_any = true;
                    return Some(Ok(head));
                }
            }

            self.emitted_any = true;
            return Some(Ok(current));
        }
    }
}

fn split_morsel(m: &Morsel, at: usize) -> (Morsel, Morsel) {
    let head_idx: Vec<usize> = (0..at).collect();
    let tail_idx: Vec<usize> = (at..m.num_rows()).collect();
    let head_cols: Vec<Array> = m.columns().iter().map(|c| c.take(&head_idx)).collect();
    let tail_cols: Vec<Array> = m.columns().iter().map(|c| c.take(&tail_idx)).collect();
    (
        Morsel::try_new(head_cols).unwrap_or_else(|_| Morsel::empty_with_num_rows(head_idx.len())),
        Morsel::try_new(tail_cols).unwrap_or_else(|_| Morsel::empty_with_num_rows(tail_idx.len())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_types::array::PrimitiveArray;

    fn morsel(rows: i64) -> Morsel {
        Morsel::try_new(vec![Array::Int64(PrimitiveArray::from_values((0..rows).collect()))]).unwrap()
    }

    #[test]
    fn empty_scan_fails_fast() {
        let upstream: OperatorStream = Box::new(std::iter::empty());
        let mut resize = Resize::new(upstream, DEFAULT_TARGET_BYTES);
        let err = resize.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResultSet);
    }

    #[test]
    fn small_morsels_are_merged() {
        let upstream: OperatorStream = Box::new(vec![Ok(morsel(1)), Ok(morsel(1)), Ok(morsel(1))].into_iter());
        let mut resize = Resize::new(upstream, DEFAULT_TARGET_BYTES);
        let first = resize.next().unwrap().unwrap();
        assert_eq!(first.num_rows(), 3);
        assert!(resize.next().is_none());
    }

    #[test]
    fn oversized_morsel_is_split() {
        let upstream: OperatorStream = Box::new(std::iter::once(Ok(morsel(100))));
        // Tiny target forces a split well below the full 100 rows.
        let mut resize = Resize::new(upstream, 32);
        let first = resize.next().unwrap().unwrap();
        assert!(first.num_rows() < 100);
    }
}
