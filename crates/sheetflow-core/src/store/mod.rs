//! Storage seams
//!
//! [`ValueSetStore`] owns value sets, field values and variance decisions.
//! [`SheetDirectory`] is the read-only view of the filled-sheet entity that
//! lives outside this crate.

mod memory;

pub use memory::{InMemoryDirectory, InMemoryStore};

use crate::error::StoreError;
use crate::types::{
    AccountId, FieldValue, InfoTemplateId, PartyId, RawValue, SheetId, SheetLayout, SheetStatus,
    ValueSet, ValueSetContext, ValueSetId, ValueSetStatus, VarianceDecision,
};
use async_trait::async_trait;

/// Result of a conditional status write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Status was `expected` and is now the new value
    Applied,
    /// Status was not `expected`; nothing written
    Mismatch(ValueSetStatus),
    /// No such value set on the sheet
    Missing,
}

/// Read-only access to filled sheets
#[async_trait]
pub trait SheetDirectory: Send + Sync {
    /// Current review status, `None` if the sheet does not exist
    async fn sheet_status(&self, sheet: SheetId) -> Result<Option<SheetStatus>, StoreError>;

    /// Whether `sheet` is owned by `account`
    async fn sheet_belongs_to_account(
        &self,
        sheet: SheetId,
        account: AccountId,
    ) -> Result<bool, StoreError>;

    /// Template structure of the sheet
    async fn sheet_layout(&self, sheet: SheetId) -> Result<Option<SheetLayout>, StoreError>;
}

/// Persistence for value sets and everything hanging off them
///
/// Every method is a single atomic operation against the store.
#[async_trait]
pub trait ValueSetStore: Send + Sync {
    /// Create a Draft value set
    async fn insert_value_set(
        &self,
        sheet: SheetId,
        context: ValueSetContext,
        party: Option<PartyId>,
    ) -> Result<ValueSet, StoreError>;

    /// All value sets of a sheet, oldest first
    async fn list_value_sets(&self, sheet: SheetId) -> Result<Vec<ValueSet>, StoreError>;

    /// One value set, only if it belongs to `sheet`
    async fn get_value_set(
        &self,
        sheet: SheetId,
        id: ValueSetId,
    ) -> Result<Option<ValueSet>, StoreError>;

    /// Write `next` only if the stored status is `expected`
    async fn compare_and_set_status(
        &self,
        sheet: SheetId,
        id: ValueSetId,
        expected: ValueSetStatus,
        next: ValueSetStatus,
    ) -> Result<CasOutcome, StoreError>;

    /// Insert or replace a field value
    async fn upsert_field_value(
        &self,
        value_set: ValueSetId,
        field: InfoTemplateId,
        value: RawValue,
    ) -> Result<(), StoreError>;

    /// All field values of a value set, ordered by field id
    async fn field_values(&self, value_set: ValueSetId) -> Result<Vec<FieldValue>, StoreError>;

    /// Insert or replace a reviewer decision
    async fn put_variance_decision(&self, decision: VarianceDecision) -> Result<(), StoreError>;

    /// Drop decisions on `field`, for one value set or, with `None`, for
    /// every value set of the sheet; returns how many were removed
    async fn remove_variance_decisions(
        &self,
        sheet: SheetId,
        field: InfoTemplateId,
        value_set: Option<ValueSetId>,
    ) -> Result<usize, StoreError>;

    /// Decisions recorded against one counterpart value set
    async fn variance_decisions(
        &self,
        sheet: SheetId,
        value_set: ValueSetId,
    ) -> Result<Vec<VarianceDecision>, StoreError>;
}
