//! The equi-join family (§4.4): `Inner`, `LeftOuter`, `RightOuter`,
//! `FullOuter`, and the four semi/anti variants. `Cross`/`CrossUnnest`
//! have no join key and are built by [`crate::cross_join`] instead.
//!
//! One side is hashed (the "build" side), the other is streamed row by row
//! against it (the "probe" side). Which side is built is picked by which
//! rows the join kind is obligated to preserve whole rather than by a size
//! estimate: semi/anti only ever emit rows from one side, so that side is
//! always the probe and the other is just a membership set; outer joins
//! that must preserve every row of one side stream that side and hash the
//! other. This makes the "guarantee at most one traversal of the build
//! side" property automatic rather than something to track.
//!
//! Rows are matched on a string fingerprint of the key columns, the same
//! technique `distinct.rs` and `aggregate.rs` use, since
//! [`ScalarValue`](flint_types::ScalarValue) has no `Hash` impl. A row
//! with any null key column never matches anything, on either side.

use std::collections::HashMap;
use std::fmt::Write as _;

use flint_core::logical::{JoinKind, JoinStep};
use flint_core::schema::ColumnId;
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::array::PrimitiveArray;
use flint_types::{Array, Morsel};

use crate::operator::OperatorStream;

pub fn build_join(
    join: &JoinStep,
    left: OperatorStream,
    left_schema: &[ColumnId],
    right: OperatorStream,
    right_schema: &[ColumnId],
) -> Result<OperatorStream> {
    if matches!(join.kind, JoinKind::Cross | JoinKind::CrossUnnest) {
        return Err(EngineError::new(
            ErrorKind::InvalidInternalState,
            "cross joins are built by cross_join::build_cross_join",
        ));
    }
    if join.kind == JoinKind::Natural {
        return Err(EngineError::new(
            ErrorKind::InvalidInternalState,
            "NATURAL JOIN should already be lowered to a USING join by the binder",
        ));
    }

    let left_morsel = collect(left)?;
    let right_morsel = collect(right)?;

    let left_keys = column_positions(&join.left_columns, left_schema)?;
    let right_keys = column_positions(&join.right_columns, right_schema)?;

    let columns = match join.kind {
        JoinKind::Inner | JoinKind::LeftOuter | JoinKind::FullOuter => {
            left_driven(join.kind, &left_morsel, &left_keys, &right_morsel, &right_keys)
        }
        JoinKind::RightOuter => right_driven(&left_morsel, &left_keys, &right_morsel, &right_keys),
        JoinKind::LeftSemi | JoinKind::LeftAnti => {
            semi_anti(join.kind == JoinKind::LeftSemi, &left_morsel, &left_keys, &right_morsel, &right_keys)
        }
        JoinKind::RightSemi | JoinKind::RightAnti => {
            semi_anti(join.kind == JoinKind::RightSemi, &right_morsel, &right_keys, &left_morsel, &left_keys)
        }
        JoinKind::Cross | JoinKind::CrossUnnest | JoinKind::Natural => unreachable!("handled above"),
    };

    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}

fn collect(mut stream: OperatorStream) -> Result<Morsel> {
    let mut morsels = Vec::new();
    for morsel in stream.by_ref() {
        morsels.push(morsel?);
    }
    Ok(morsels.into_iter().reduce(|a, b| a.concat(&b).unwrap_or(a)).unwrap_or_else(Morsel::empty))
}

fn column_positions(ids: &[ColumnId], schema: &[ColumnId]) -> Result<Vec<usize>> {
    ids.iter()
        .map(|id| {
            schema
                .iter()
                .position(|c| c == id)
                .ok_or_else(|| EngineError::new(ErrorKind::ColumnNotFound, "join key column missing from its side's schema"))
        })
        .collect()
}

fn row_key(morsel: &Morsel, positions: &[usize], row: usize) -> Option<String> {
    let mut key = String::new();
    for &pos in positions {
        let arr = morsel.column(pos)?;
        if !arr.is_valid(row) {
            return None;
        }
        let _ = write!(key, "{}\u{1f}", arr.scalar(row));
    }
    Some(key)
}

fn build_hash_map(morsel: &Morsel, positions: &[usize]) -> HashMap<String, Vec<usize>> {
    let mut map: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..morsel.num_rows() {
        if let Some(key) = row_key(morsel, positions, row) {
            map.entry(key).or_default().push(row);
        }
    }
    map
}

/// `Inner`/`LeftOuter`/`FullOuter`: hash `right`, stream `left`. Every left
/// row is preserved (padded with null right columns when unmatched) unless
/// the join is `Inner`, in which case an unmatched left row is dropped.
/// `FullOuter` additionally emits right rows that were never probed.
fn left_driven(
    kind: JoinKind,
    left: &Morsel,
    left_keys: &[usize],
    right: &Morsel,
    right_keys: &[usize],
) -> Vec<Array> {
    let build = build_hash_map(right, right_keys);
    let mut right_matched = vec![false; right.num_rows()];
    let mut left_idx: Vec<Option<usize>> = Vec::new();
    let mut right_idx: Vec<Option<usize>> = Vec::new();

    for lrow in 0..left.num_rows() {
        match row_key(left, left_keys, lrow).and_then(|k| build.get(&k)) {
            Some(matches) => {
                for &rrow in matches {
                    right_matched[rrow] = true;
                    left_idx.push(Some(lrow));
                    right_idx.push(Some(rrow));
                }
            }
            None => {
                if kind != JoinKind::Inner {
                    left_idx.push(Some(lrow));
                    right_idx.push(None);
                }
            }
        }
    }

    if kind == JoinKind::FullOuter {
        for (rrow, matched) in right_matched.into_iter().enumerate() {
            if !matched {
                left_idx.push(None);
                right_idx.push(Some(rrow));
            }
        }
    }

    combine(left, &left_idx, right, &right_idx)
}

/// `RightOuter`: hash `left`, stream `right`. Every right row is preserved,
/// padded with null left columns when unmatched.
fn right_driven(left: &Morsel, left_keys: &[usize], right: &Morsel, right_keys: &[usize]) -> Vec<Array> {
    let build = build_hash_map(left, left_keys);
    let mut left_idx: Vec<Option<usize>> = Vec::new();
    let mut right_idx: Vec<Option<usize>> = Vec::new();

    for rrow in 0..right.num_rows() {
        match row_key(right, right_keys, rrow).and_then(|k| build.get(&k)) {
            Some(matches) => {
                for &lrow in matches {
                    left_idx.push(Some(lrow));
                    right_idx.push(Some(rrow));
                }
            }
            None => {
                left_idx.push(None);
                right_idx.push(Some(rrow));
            }
        }
    }

    combine(left, &left_idx, right, &right_idx)
}

/// `LeftSemi`/`LeftAnti`/`RightSemi`/`RightAnti`: `kept` is the side whose
/// rows survive into the output (unchanged, no null padding); `other` only
/// contributes a membership set. `keep_if_present` selects semi (true) or
/// anti (false) behavior.
fn semi_anti(keep_if_present: bool, kept: &Morsel, kept_keys: &[usize], other: &Morsel, other_keys: &[usize]) -> Vec<Array> {
    let build = build_hash_map(other, other_keys);
    let mut keep = Vec::new();
    for row in 0..kept.num_rows() {
        let present = row_key(kept, kept_keys, row).map(|k| build.contains_key(&k)).unwrap_or(false);
        if present == keep_if_present {
            keep.push(row);
        }
    }
    kept.columns().iter().map(|c| c.take(&keep)).collect()
}

fn combine(left: &Morsel, left_idx: &[Option<usize>], right: &Morsel, right_idx: &[Option<usize>]) -> Vec<Array> {
    left.columns()
        .iter()
        .map(|c| take_nullable(c, left_idx))
        .chain(right.columns().iter().map(|c| take_nullable(c, right_idx)))
        .collect()
}

fn take_nullable(arr: &Array, idx: &[Option<usize>]) -> Array {
    match arr {
        Array::Null(_) => Array::Null(idx.len()),
        Array::Boolean(a) => Array::Boolean(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).copied())), false)),
        Array::Int64(a) => Array::Int64(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).copied())), 0)),
        Array::Float64(a) => Array::Float64(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).copied())), 0.0)),
        Array::Utf8(a) => Array::Utf8(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).cloned())), String::new())),
        Array::Date32(a) => Array::Date32(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).copied())), 0)),
        Array::Timestamp(a) => Array::Timestamp(PrimitiveArray::from_options(idx.iter().map(|o| o.and_then(|i| a.value(i).copied())), 0)),
    }
}
