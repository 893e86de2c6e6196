//! The function registry (§4.2, §4.3, §9).
//!
//! A static map from name to signature, populated once at process start.
//! Aliases collapse onto one kernel (`AVG`/`MEAN`/`AVERAGE` all name the
//! same aggregator) the way the specification's "Function registry" design
//! note describes. Scalar and aggregate names share one namespace so the
//! binder can do a single case-insensitive lookup regardless of whether the
//! caller wrote `FUNCTION(...)` or `AGGREGATOR(...)` in SQL.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// The vectorized aggregate kernels named in §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    All,
    Any,
    ApproxMedian,
    Count,
    CountDistinct,
    Distinct,
    List,
    Max,
    Mean,
    Min,
    MinMax,
    Product,
    Stddev,
    Sum,
    Quantiles,
    Variance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    Aggregate(AggregateKind),
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub canonical_name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
    pub kind: FunctionKind,
}

impl FunctionSignature {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, FunctionKind::Aggregate(_))
    }

    pub fn accepts_arity(&self, n: usize) -> bool {
        n >= self.min_arity && n <= self.max_arity
    }
}

fn scalar(name: &'static str, min_arity: usize, max_arity: usize) -> (&'static str, FunctionSignature) {
    (
        name,
        FunctionSignature {
            canonical_name: name,
            min_arity,
            max_arity,
            kind: FunctionKind::Scalar,
        },
    )
}

fn aggregate(
    name: &'static str,
    kind: AggregateKind,
    min_arity: usize,
    max_arity: usize,
) -> (&'static str, FunctionSignature) {
    (
        name,
        FunctionSignature {
            canonical_name: name,
            min_arity,
            max_arity,
            kind: FunctionKind::Aggregate(kind),
        },
    )
}

/// `name → signature`, case-sensitively keyed on upper-case canonical
/// spellings; lookups uppercase the caller's name first.
static REGISTRY: Lazy<HashMap<&'static str, FunctionSignature>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // COUNT(*) is arity 0 in that special case (§4.4); ordinary COUNT(expr)
    // is arity 1. Accept both via a 0..=1 range.
    for (name, sig) in [
        aggregate("ALL", AggregateKind::All, 1, 1),
        aggregate("ANY", AggregateKind::Any, 1, 1),
        aggregate("APPROX_MEDIAN", AggregateKind::ApproxMedian, 1, 1),
        aggregate("COUNT", AggregateKind::Count, 0, 1),
        aggregate("COUNT_DISTINCT", AggregateKind::CountDistinct, 1, 1),
        aggregate("DISTINCT", AggregateKind::Distinct, 1, 1),
        aggregate("LIST", AggregateKind::List, 1, 1),
        aggregate("MAX", AggregateKind::Max, 1, 1),
        aggregate("MEAN", AggregateKind::Mean, 1, 1),
        aggregate("AVG", AggregateKind::Mean, 1, 1),
        aggregate("AVERAGE", AggregateKind::Mean, 1, 1),
        aggregate("MIN", AggregateKind::Min, 1, 1),
        aggregate("MIN_MAX", AggregateKind::MinMax, 1, 1),
        aggregate("PRODUCT", AggregateKind::Product, 1, 1),
        aggregate("STDDEV", AggregateKind::Stddev, 1, 1),
        aggregate("SUM", AggregateKind::Sum, 1, 1),
        aggregate("QUANTILES", AggregateKind::Quantiles, 1, 2),
        aggregate("VARIANCE", AggregateKind::Variance, 1, 1),
    ] {
        m.insert(name, sig);
    }

    for (name, sig) in [
        scalar("DATEPART", 2, 2),
        scalar("GET", 2, 2),
        scalar("TUPLE", 2, 2),
        scalar("UPPER", 1, 1),
        scalar("LOWER", 1, 1),
        scalar("LENGTH", 1, 1),
        scalar("TRIM", 1, 1),
        scalar("ROUND", 1, 2),
        scalar("ABS", 1, 1),
        scalar("COALESCE", 1, usize::MAX),
        scalar("CONCAT", 1, usize::MAX),
        scalar("NOW", 0, 0),
        // CAST/TRY_CAST/SAFE_CAST targets lowered by the planner to
        // `<TYPE>(arg)` / `TRY_<TYPE>(arg)` / `SAFE_<TYPE>(arg)` (§4.1).
        scalar("VARCHAR", 1, 1),
        scalar("INTEGER", 1, 1),
        scalar("DOUBLE", 1, 1),
        scalar("BOOLEAN", 1, 1),
        scalar("DATE", 1, 1),
        scalar("TIMESTAMP", 1, 1),
        scalar("TRY_VARCHAR", 1, 1),
        scalar("TRY_INTEGER", 1, 1),
        scalar("TRY_DOUBLE", 1, 1),
        scalar("TRY_BOOLEAN", 1, 1),
        scalar("TRY_DATE", 1, 1),
        scalar("TRY_TIMESTAMP", 1, 1),
        scalar("SAFE_VARCHAR", 1, 1),
        scalar("SAFE_INTEGER", 1, 1),
        scalar("SAFE_DOUBLE", 1, 1),
        scalar("SAFE_BOOLEAN", 1, 1),
        scalar("SAFE_DATE", 1, 1),
        scalar("SAFE_TIMESTAMP", 1, 1),
    ] {
        m.insert(name, sig);
    }
    m
});

pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    REGISTRY.get(name.to_ascii_uppercase().as_str())
}

pub fn is_aggregate_name(name: &str) -> bool {
    lookup(name).map(|s| s.is_aggregate()).unwrap_or(false)
}

/// All registered names, for fuzzy "did you mean" suggestions on
/// `FunctionNotFound` (§7).
pub fn all_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// The closed set of well-known `Scan` hints (§4.1, §6).
pub const KNOWN_HINTS: &[&str] = &["NO_CACHE", "NO_PARTITION", "NO_PUSH_PROJECTION", "PARALLEL_READ"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_mean_average_collapse_to_one_kernel() {
        let avg = lookup("AVG").unwrap();
        let mean = lookup("mean").unwrap();
        let average = lookup("Average").unwrap();
        assert_eq!(avg.kind, mean.kind);
        assert_eq!(avg.kind, average.kind);
    }

    #[test]
    fn count_accepts_zero_or_one_args() {
        let count = lookup("COUNT").unwrap();
        assert!(count.accepts_arity(0));
        assert!(count.accepts_arity(1));
        assert!(!count.accepts_arity(2));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("sum").is_some());
        assert!(lookup("Sum").is_some());
    }

    #[test]
    fn unknown_function_is_none() {
        assert!(lookup("NOT_A_REAL_FUNCTION").is_none());
    }
}
