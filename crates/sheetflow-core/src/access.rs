//! Tenant isolation guard
//!
//! Every entry point resolves a [`SheetAccess`] first. The token can only be
//! minted here, so no code path reaches a sheet's value sets without passing
//! the ownership check. Foreign and missing sheets both surface as NotFound.

use crate::error::{EngineError, EngineResult, StoreError};
use crate::store::SheetDirectory;
use crate::types::{AccountId, SheetId};
use std::sync::Arc;

/// Proof that `account` owns `sheet`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetAccess {
    sheet: SheetId,
    account: AccountId,
}

impl SheetAccess {
    /// Sheet the caller may touch
    #[inline]
    #[must_use]
    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    /// Caller's tenant
    #[inline]
    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }
}

/// Ownership check in front of every operation
#[derive(Clone)]
pub struct AccessGuard {
    directory: Arc<dyn SheetDirectory>,
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").finish_non_exhaustive()
    }
}

impl AccessGuard {
    /// Create a guard over a sheet directory
    #[inline]
    #[must_use]
    pub fn new(directory: Arc<dyn SheetDirectory>) -> Self {
        Self { directory }
    }

    /// Whether `account` owns `sheet`
    pub async fn owns_sheet(&self, sheet: SheetId, account: AccountId) -> Result<bool, StoreError> {
        self.directory.sheet_belongs_to_account(sheet, account).await
    }

    /// Resolve access or fail with NotFound
    ///
    /// # Errors
    /// - `EngineError::NotFound` when the sheet does not exist or belongs to
    ///   another tenant
    /// - `EngineError::Store` when the directory cannot answer
    pub async fn authorize(&self, account: AccountId, sheet: SheetId) -> EngineResult<SheetAccess> {
        if self.owns_sheet(sheet, account).await? {
            Ok(SheetAccess { sheet, account })
        } else {
            tracing::debug!(%sheet, %account, "sheet not visible to tenant");
            Err(EngineError::sheet_not_found())
        }
    }
}
