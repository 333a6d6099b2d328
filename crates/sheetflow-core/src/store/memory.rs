//! In-memory store and sheet directory backed by `DashMap`

use super::{CasOutcome, SheetDirectory, ValueSetStore};
use crate::error::StoreError;
use crate::types::{
    AccountId, FieldValue, InfoTemplateId, PartyId, RawValue, SheetId, SheetLayout, SheetStatus,
    ValueSet, ValueSetContext, ValueSetId, ValueSetStatus, VarianceDecision,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type FieldKey = (ValueSetId, InfoTemplateId);

/// Concurrent in-memory [`ValueSetStore`]
///
/// Ids come from a monotonic sequence, so a higher id is always a newer set.
#[derive(Debug)]
pub struct InMemoryStore {
    next_id: AtomicU64,
    value_sets: DashMap<ValueSetId, ValueSet>,
    field_values: DashMap<FieldKey, RawValue>,
    decisions: DashMap<FieldKey, VarianceDecision>,
}

impl InMemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            value_sets: DashMap::new(),
            field_values: DashMap::new(),
            decisions: DashMap::new(),
        }
    }

    /// Number of value sets across all sheets
    #[inline]
    #[must_use]
    pub fn value_set_count(&self) -> usize {
        self.value_sets.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueSetStore for InMemoryStore {
    async fn insert_value_set(
        &self,
        sheet: SheetId,
        context: ValueSetContext,
        party: Option<PartyId>,
    ) -> Result<ValueSet, StoreError> {
        let id = ValueSetId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let value_set = ValueSet {
            value_set_id: id,
            sheet_id: sheet,
            context,
            party_id: party,
            status: ValueSetStatus::Draft,
        };
        self.value_sets.insert(id, value_set.clone());
        Ok(value_set)
    }

    async fn list_value_sets(&self, sheet: SheetId) -> Result<Vec<ValueSet>, StoreError> {
        let mut sets: Vec<ValueSet> = self
            .value_sets
            .iter()
            .filter(|entry| entry.sheet_id == sheet)
            .map(|entry| entry.value().clone())
            .collect();
        sets.sort_by_key(|vs| vs.value_set_id);
        Ok(sets)
    }

    async fn get_value_set(
        &self,
        sheet: SheetId,
        id: ValueSetId,
    ) -> Result<Option<ValueSet>, StoreError> {
        Ok(self
            .value_sets
            .get(&id)
            .filter(|vs| vs.sheet_id == sheet)
            .map(|vs| vs.value().clone()))
    }

    async fn compare_and_set_status(
        &self,
        sheet: SheetId,
        id: ValueSetId,
        expected: ValueSetStatus,
        next: ValueSetStatus,
    ) -> Result<CasOutcome, StoreError> {
        // get_mut holds the shard write lock for the whole check-and-write
        let Some(mut entry) = self.value_sets.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if entry.sheet_id != sheet {
            return Ok(CasOutcome::Missing);
        }
        if entry.status != expected {
            return Ok(CasOutcome::Mismatch(entry.status));
        }
        entry.status = next;
        Ok(CasOutcome::Applied)
    }

    async fn upsert_field_value(
        &self,
        value_set: ValueSetId,
        field: InfoTemplateId,
        value: RawValue,
    ) -> Result<(), StoreError> {
        if !self.value_sets.contains_key(&value_set) {
            return Err(StoreError::Corrupt(format!(
                "field value for unknown value set {value_set}"
            )));
        }
        self.field_values.insert((value_set, field), value);
        Ok(())
    }

    async fn field_values(&self, value_set: ValueSetId) -> Result<Vec<FieldValue>, StoreError> {
        let mut values: Vec<FieldValue> = self
            .field_values
            .iter()
            .filter(|entry| entry.key().0 == value_set)
            .map(|entry| FieldValue {
                value_set_id: value_set,
                info_template_id: entry.key().1,
                value: entry.value().clone(),
            })
            .collect();
        values.sort_by_key(|fv| fv.info_template_id);
        Ok(values)
    }

    async fn put_variance_decision(&self, decision: VarianceDecision) -> Result<(), StoreError> {
        self.decisions
            .insert((decision.value_set_id, decision.info_template_id), decision);
        Ok(())
    }

    async fn remove_variance_decisions(
        &self,
        sheet: SheetId,
        field: InfoTemplateId,
        value_set: Option<ValueSetId>,
    ) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.decisions.retain(|(vs, f), decision| {
            let hit = decision.sheet_id == sheet
                && *f == field
                && value_set.map_or(true, |target| target == *vs);
            if hit {
                removed += 1;
            }
            !hit
        });
        Ok(removed)
    }

    async fn variance_decisions(
        &self,
        sheet: SheetId,
        value_set: ValueSetId,
    ) -> Result<Vec<VarianceDecision>, StoreError> {
        let mut decisions: Vec<VarianceDecision> = self
            .decisions
            .iter()
            .filter(|entry| entry.key().0 == value_set && entry.sheet_id == sheet)
            .map(|entry| entry.value().clone())
            .collect();
        decisions.sort_by_key(|d| d.info_template_id);
        Ok(decisions)
    }
}

#[derive(Debug, Clone, Copy)]
struct SheetRecord {
    account: AccountId,
    status: SheetStatus,
}

/// In-memory [`SheetDirectory`] for tests and standalone deployments
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    sheets: DashMap<SheetId, SheetRecord>,
    layouts: DashMap<SheetId, SheetLayout>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a sheet
    pub fn register_sheet(&self, sheet: SheetId, account: AccountId, status: SheetStatus) {
        self.sheets.insert(sheet, SheetRecord { account, status });
    }

    /// Change a sheet's review status; returns false if the sheet is unknown
    pub fn set_status(&self, sheet: SheetId, status: SheetStatus) -> bool {
        match self.sheets.get_mut(&sheet) {
            Some(mut record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }

    /// Attach a template layout to a sheet
    pub fn set_layout(&self, sheet: SheetId, layout: SheetLayout) {
        self.layouts.insert(sheet, layout);
    }
}

#[async_trait]
impl SheetDirectory for InMemoryDirectory {
    async fn sheet_status(&self, sheet: SheetId) -> Result<Option<SheetStatus>, StoreError> {
        Ok(self.sheets.get(&sheet).map(|r| r.status))
    }

    async fn sheet_belongs_to_account(
        &self,
        sheet: SheetId,
        account: AccountId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .sheets
            .get(&sheet)
            .is_some_and(|r| r.account == account))
    }

    async fn sheet_layout(&self, sheet: SheetId) -> Result<Option<SheetLayout>, StoreError> {
        Ok(self.layouts.get(&sheet).map(|l| l.value().clone()))
    }
}
