//! Error taxonomy shared across the planning and execution pipeline.
//!
//! Every fallible operation in the engine returns `engine_error::Result<T>`.
//! Errors are tagged with an [`ErrorKind`] drawn from the categories the
//! planner and executor actually raise (codebase misconfiguration, SQL
//! binding failures, data-shape failures, ...) so callers and tests can match
//! on the kind rather than parse messages.

use std::fmt;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// The taxonomy of errors the engine can produce.
///
/// Grouped the way the specification groups them: errors that indicate a
/// broken deployment (`Codebase`), a broken invariant inside the engine
/// itself (`Database`), caller misuse (`Programming`), shape-of-data
/// failures (`Data`), authorization (`Security`), and SQL-level planning
/// failures (`Sql`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Codebase
    MissingDependency,
    UnmetRequirement,
    // Database
    IncompleteImplementation,
    InvalidConfiguration,
    InvalidInternalState,
    NotSupported,
    UnsupportedFileType,
    UnsupportedType,
    // Programming
    InvalidCursorState,
    MissingSqlStatement,
    ParameterError,
    // Data
    EmptyDataset,
    EmptyResultSet,
    // Security
    Permissions,
    // SQL
    AmbiguousDataset,
    AmbiguousIdentifier,
    ColumnNotFound,
    DatasetNotFound,
    FunctionNotFound,
    IncompatibleTypes,
    IncorrectType,
    InvalidFunctionParameter,
    InvalidTemporalRangeFilter,
    UnexpectedDatasetReference,
    UnnamedColumn,
    UnnamedSubquery,
    UnsupportedSyntax,
    VariableNotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The engine's single error type.
///
/// Carries the offending symbol and, for planning errors, a qualifier and a
/// fuzzy "did you mean" suggestion, per the propagation policy in the
/// specification.
#[derive(Debug)]
pub struct EngineError {
    kind: ErrorKind,
    message: String,
    /// The dataset/relation qualifier the symbol was resolved against, if any.
    qualifier: Option<String>,
    /// A fuzzy suggestion drawn from the closed set of valid candidates.
    suggestion: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
            qualifier: None,
            suggestion: None,
            source: None,
        }
    }

    /// Shorthand for an [`ErrorKind::InvalidInternalState`] error; this is
    /// what most ad-hoc `.ok_or_else` / bail sites in the planner use.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::InvalidInternalState, message)
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, " (in '{qualifier}')")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, ". Did you mean '{suggestion}'?")?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Build a `NotSupported`/`UnsupportedSyntax` error for a feature that's
/// named in the specification but intentionally unimplemented.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::EngineError::new(
            $crate::ErrorKind::IncompleteImplementation,
            format!($($arg)*),
        ))
    };
}

/// Extension for pulling a required value out of an `Option`, turning a
/// missing value into an `InvalidInternalState` error with context.
pub trait OptionExt<T> {
    fn required(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &str) -> Result<T> {
        self.ok_or_else(|| EngineError::internal(format!("missing required {what}")))
    }
}

/// Extension for attaching additional context to an error as it propagates.
pub trait ResultExt<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| EngineError::internal(format!("{msg}: {e}")))
    }
}

/// Suggest the closest candidate to `target` by normalized Damerau-Levenshtein
/// distance, per the "Did you mean" propagation policy. Returns `None` when
/// the closest candidate is still too far away to be a plausible typo.
pub fn suggest_closest<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    const MIN_SIMILARITY: f64 = 0.5;

    let target_lower = target.to_ascii_lowercase();
    candidates
        .into_iter()
        .map(|candidate| {
            let score = strsim::normalized_damerau_levenshtein(&target_lower, &candidate.to_ascii_lowercase());
            (candidate, score)
        })
        .filter(|(_, score)| *score >= MIN_SIMILARITY)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_closest_picks_near_miss() {
        let candidates = ["planetId", "name", "id"];
        assert_eq!(
            suggest_closest("planetid", candidates),
            Some("planetId".to_string())
        );
    }

    #[test]
    fn suggest_closest_rejects_unrelated() {
        let candidates = ["planetId", "name", "id"];
        assert_eq!(suggest_closest("zzzzzzzz", candidates), None);
    }

    #[test]
    fn display_includes_suggestion() {
        let err = EngineError::new(ErrorKind::ColumnNotFound, "column 'nam' not found")
            .with_qualifier("satellites")
            .with_suggestion("name");
        let text = err.to_string();
        assert!(text.contains("Did you mean 'name'?"));
        assert!(text.contains("satellites"));
    }
}
