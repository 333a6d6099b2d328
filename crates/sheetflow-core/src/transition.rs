//! Value-set status transitions
//!
//! One table keyed by context drives every value set:
//!
//! | Context     | Legal from Draft |
//! |-------------|------------------|
//! | Requirement | Locked           |
//! | Offered     | Locked           |
//! | AsBuilt     | Verified         |
//!
//! Nothing leaves Locked or Verified.

use crate::error::{EngineError, EngineResult};
use crate::types::{ValueSetContext, ValueSetStatus};

/// The single status a context may advance to from Draft
#[inline]
#[must_use]
pub fn legal_target(context: ValueSetContext) -> ValueSetStatus {
    match context {
        ValueSetContext::Requirement | ValueSetContext::Offered => ValueSetStatus::Locked,
        ValueSetContext::AsBuilt => ValueSetStatus::Verified,
    }
}

/// Statuses reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(context: ValueSetContext, from: ValueSetStatus) -> Vec<ValueSetStatus> {
    match from {
        ValueSetStatus::Draft => vec![legal_target(context)],
        ValueSetStatus::Locked | ValueSetStatus::Verified => vec![],
    }
}

/// Validates a value-set status transition
///
/// The current status is checked before the target, so repeating an applied
/// transition reports the status it already reached.
///
/// # Errors
/// `EngineError::Conflict` naming the current status or the legal target.
pub fn validate_transition(
    context: ValueSetContext,
    from: ValueSetStatus,
    to: ValueSetStatus,
) -> EngineResult<()> {
    if from != ValueSetStatus::Draft {
        return Err(EngineError::invalid_transition(from));
    }
    let only = legal_target(context);
    if to != only {
        return Err(EngineError::illegal_target(context, only));
    }
    Ok(())
}

/// Stateless transition checker
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTransitionMachine;

impl StatusTransitionMachine {
    /// Create machine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate and return the status to write
    ///
    /// # Errors
    /// See [`validate_transition`].
    #[inline]
    pub fn plan(
        &self,
        context: ValueSetContext,
        current: ValueSetStatus,
        target: ValueSetStatus,
    ) -> EngineResult<ValueSetStatus> {
        validate_transition(context, current, target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn requirement_and_offered_lock() {
        for ctx in [ValueSetContext::Requirement, ValueSetContext::Offered] {
            assert!(validate_transition(ctx, ValueSetStatus::Draft, ValueSetStatus::Locked).is_ok());
            let err =
                validate_transition(ctx, ValueSetStatus::Draft, ValueSetStatus::Verified).unwrap_err();
            assert_eq!(err.to_string(), "Requirement/Offered can only transition to Locked");
        }
    }

    #[test]
    fn as_built_verifies() {
        let ctx = ValueSetContext::AsBuilt;
        assert!(validate_transition(ctx, ValueSetStatus::Draft, ValueSetStatus::Verified).is_ok());
        let err = validate_transition(ctx, ValueSetStatus::Draft, ValueSetStatus::Locked).unwrap_err();
        assert_eq!(err.to_string(), "AsBuilt can only transition to Verified");
    }

    #[test]
    fn non_draft_reports_current_status_first() {
        let err = validate_transition(
            ValueSetContext::Requirement,
            ValueSetStatus::Locked,
            ValueSetStatus::Verified,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Invalid transition: current status is Locked");
    }

    #[test]
    fn draft_to_draft_is_not_a_noop() {
        let err = StatusTransitionMachine::new()
            .plan(
                ValueSetContext::AsBuilt,
                ValueSetStatus::Draft,
                ValueSetStatus::Draft,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for ctx in ValueSetContext::ALL {
            assert!(allowed_transitions(*ctx, ValueSetStatus::Locked).is_empty());
            assert!(allowed_transitions(*ctx, ValueSetStatus::Verified).is_empty());
            assert_eq!(allowed_transitions(*ctx, ValueSetStatus::Draft).len(), 1);
        }
    }
}
