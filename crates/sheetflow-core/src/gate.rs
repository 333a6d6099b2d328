//! Sheet status gate
//!
//! Value-set mutation is only allowed while the parent sheet is in an
//! authoring status. Reads are never gated here.

use crate::access::SheetAccess;
use crate::error::{EngineError, EngineResult};
use crate::store::SheetDirectory;
use crate::types::SheetStatus;
use std::sync::Arc;

/// Sheet statuses that admit value-set mutation
pub const MUTABLE_SHEET_STATUSES: [SheetStatus; 3] = [
    SheetStatus::Draft,
    SheetStatus::ModifiedDraft,
    SheetStatus::Rejected,
];

/// Whether a sheet in `status` accepts mutation
#[inline]
#[must_use]
pub fn is_mutable(status: SheetStatus) -> bool {
    MUTABLE_SHEET_STATUSES.contains(&status)
}

/// Fail with Conflict unless `status` accepts mutation
///
/// # Errors
/// `EngineError::Conflict` with "Sheet is not editable in status {status}"
#[inline]
pub fn assert_mutable(status: SheetStatus) -> EngineResult<()> {
    if is_mutable(status) {
        Ok(())
    } else {
        Err(EngineError::sheet_not_editable(status))
    }
}

/// Proof that the sheet was mutable when the request was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationPermit {
    access: SheetAccess,
    status: SheetStatus,
}

impl MutationPermit {
    /// Underlying tenant access
    #[inline]
    #[must_use]
    pub fn access(&self) -> &SheetAccess {
        &self.access
    }

    /// Sheet status observed at admission
    #[inline]
    #[must_use]
    pub fn sheet_status(&self) -> SheetStatus {
        self.status
    }
}

/// Reads the sheet status and issues mutation permits
#[derive(Clone)]
pub struct SheetStatusGate {
    directory: Arc<dyn SheetDirectory>,
}

impl std::fmt::Debug for SheetStatusGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetStatusGate").finish_non_exhaustive()
    }
}

impl SheetStatusGate {
    /// Create a gate over a sheet directory
    #[inline]
    #[must_use]
    pub fn new(directory: Arc<dyn SheetDirectory>) -> Self {
        Self { directory }
    }

    /// Admit a mutation on an already-authorized sheet
    ///
    /// # Errors
    /// - `EngineError::Conflict` if the sheet is Verified or Approved
    /// - `EngineError::NotFound` if the sheet vanished after authorization
    pub async fn admit(&self, access: SheetAccess) -> EngineResult<MutationPermit> {
        let status = self
            .directory
            .sheet_status(access.sheet())
            .await?
            .ok_or_else(EngineError::sheet_not_found)?;

        if let Err(e) = assert_mutable(status) {
            tracing::warn!(sheet = %access.sheet(), %status, "mutation refused by sheet status");
            return Err(e);
        }
        Ok(MutationPermit { access, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessGuard;
    use crate::error::ErrorKind;
    use crate::store::InMemoryDirectory;
    use crate::types::{AccountId, SheetId};

    #[test]
    fn authoring_statuses_are_mutable() {
        assert!(assert_mutable(SheetStatus::Draft).is_ok());
        assert!(assert_mutable(SheetStatus::ModifiedDraft).is_ok());
        assert!(assert_mutable(SheetStatus::Rejected).is_ok());
    }

    #[test]
    fn reviewed_statuses_are_frozen() {
        for status in [SheetStatus::Verified, SheetStatus::Approved] {
            let err = assert_mutable(status).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert_eq!(
                err.to_string(),
                format!("Sheet is not editable in status {status}")
            );
        }
    }

    #[tokio::test]
    async fn admit_reads_current_status() {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.register_sheet(SheetId(1), AccountId(1), SheetStatus::Rejected);
        let guard = AccessGuard::new(dir.clone());
        let gate = SheetStatusGate::new(dir.clone());

        let access = guard.authorize(AccountId(1), SheetId(1)).await.unwrap();
        let permit = gate.admit(access).await.unwrap();
        assert_eq!(permit.sheet_status(), SheetStatus::Rejected);

        dir.set_status(SheetId(1), SheetStatus::Verified);
        let err = gate.admit(access).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
