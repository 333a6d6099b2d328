//! Error types for sheetflow core
//!
//! Every failure is a per-request outcome:
//! - `NotFound` for tenant mismatches and missing value sets or pairings
//! - `Conflict` for sheet-status and value-set transition refusals
//! - `Validation` for malformed caller input
//! - `Store` for backing-store faults

use crate::types::{InfoTemplateId, SheetStatus, ValueSetContext, ValueSetId, ValueSetStatus};

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Sheet not visible to the caller, or referenced entity missing
    #[error("{0}")]
    NotFound(String),

    /// Current state forbids the requested mutation
    #[error("{0}")]
    Conflict(String),

    /// Caller input rejected before any store access
    #[error("{0}")]
    Validation(String),

    /// Backing store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse error classification, stable across messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity absent or not owned by the caller's tenant
    NotFound,
    /// State forbids the operation
    Conflict,
    /// Malformed input
    Validation,
    /// Infrastructure failure
    Internal,
}

impl ErrorKind {
    /// Machine-readable name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl EngineError {
    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Domain outcomes are terminal; only store faults may be retried by callers
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }

    /// Sheet is unknown to the caller's tenant
    #[inline]
    #[must_use]
    pub fn sheet_not_found() -> Self {
        Self::NotFound("Sheet not found".to_string())
    }

    /// Value set is not attached to the sheet
    #[inline]
    #[must_use]
    pub fn value_set_not_found(id: ValueSetId) -> Self {
        Self::NotFound(format!("Value set {id} not found"))
    }

    /// Sheet status forbids mutation
    #[inline]
    #[must_use]
    pub fn sheet_not_editable(status: SheetStatus) -> Self {
        Self::Conflict(format!("Sheet is not editable in status {status}"))
    }

    /// Value set is not in Draft
    #[inline]
    #[must_use]
    pub fn invalid_transition(current: ValueSetStatus) -> Self {
        Self::Conflict(format!("Invalid transition: current status is {current}"))
    }

    /// Target status is not legal for the context
    #[inline]
    #[must_use]
    pub fn illegal_target(context: ValueSetContext, only: ValueSetStatus) -> Self {
        let who = match context {
            ValueSetContext::Requirement | ValueSetContext::Offered => "Requirement/Offered",
            ValueSetContext::AsBuilt => "AsBuilt",
        };
        Self::Conflict(format!("{who} can only transition to {only}"))
    }

    /// Field values of a non-Draft set are frozen
    #[inline]
    #[must_use]
    pub fn value_set_frozen(id: ValueSetId, status: ValueSetStatus) -> Self {
        Self::Conflict(format!(
            "Value set {id} is {status}; its field values are frozen"
        ))
    }

    /// No requirement/counterpart pairing exists for the field
    #[inline]
    #[must_use]
    pub fn pairing_not_found(value_set: ValueSetId, field: InfoTemplateId) -> Self {
        Self::NotFound(format!(
            "No variance for field {field} on value set {value_set}"
        ))
    }

    /// Reviewer tried to decide on a matching field
    #[inline]
    #[must_use]
    pub fn nothing_to_review(field: InfoTemplateId) -> Self {
        Self::Conflict(format!(
            "Field {field} matches the requirement; only deviations can be reviewed"
        ))
    }
}

/// Backing store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data violates an invariant
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the expected shape
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_messages_match_contract() {
        assert_eq!(
            EngineError::sheet_not_editable(SheetStatus::Approved).to_string(),
            "Sheet is not editable in status Approved"
        );
        assert_eq!(
            EngineError::invalid_transition(ValueSetStatus::Locked).to_string(),
            "Invalid transition: current status is Locked"
        );
        assert_eq!(
            EngineError::illegal_target(ValueSetContext::Offered, ValueSetStatus::Locked)
                .to_string(),
            "Requirement/Offered can only transition to Locked"
        );
        assert_eq!(
            EngineError::illegal_target(ValueSetContext::AsBuilt, ValueSetStatus::Verified)
                .to_string(),
            "AsBuilt can only transition to Verified"
        );
    }

    #[test]
    fn error_kinds() {
        assert_eq!(EngineError::sheet_not_found().kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::sheet_not_editable(SheetStatus::Verified).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::Validation("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::from(StoreError::Corrupt("x".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn domain_errors_are_not_retryable() {
        assert!(!EngineError::sheet_not_found().is_retryable());
        assert!(!EngineError::invalid_transition(ValueSetStatus::Draft).is_retryable());
        assert!(EngineError::from(StoreError::Unavailable("down".into())).is_retryable());
    }
}
