//! Value-set engine
//!
//! Entry point for every operation on a sheet's value sets:
//! - Reads pass the access guard only
//! - Mutations pass the access guard, then the sheet status gate
//! - Transitions are a single conditional write in the store
//! - Variance decisions are stored against the values they judged

use crate::access::{AccessGuard, SheetAccess};
use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gate::{MutationPermit, SheetStatusGate};
use crate::requests::{CreateValueSet, PatchVariance};
use crate::store::{CasOutcome, SheetDirectory, ValueSetStore};
use crate::transition::StatusTransitionMachine;
use crate::types::{
    AccountId, FieldDataType, FieldValue, InfoTemplateId, PartyId, RawValue, SheetId,
    SheetLayout, ValueSet, ValueSetContext, ValueSetId, ValueSetStatus, VarianceDecision,
    VarianceStatus,
};
use crate::variance::{index_values, Column, CompareView, VarianceEngine};
use std::sync::Arc;

/// Orchestrates guards, store and variance logic
pub struct ValueSetEngine {
    config: EngineConfig,
    directory: Arc<dyn SheetDirectory>,
    store: Arc<dyn ValueSetStore>,
    guard: AccessGuard,
    gate: SheetStatusGate,
    machine: StatusTransitionMachine,
    variance: VarianceEngine,
    audit: AuditLog,
}

impl std::fmt::Debug for ValueSetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueSetEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ValueSetEngine {
    /// Create engine over a sheet directory and a value-set store
    #[must_use]
    pub fn new(
        config: EngineConfig,
        directory: Arc<dyn SheetDirectory>,
        store: Arc<dyn ValueSetStore>,
    ) -> Self {
        Self {
            config,
            guard: AccessGuard::new(directory.clone()),
            gate: SheetStatusGate::new(directory.clone()),
            directory,
            store,
            machine: StatusTransitionMachine::new(),
            variance: VarianceEngine::new(),
            audit: AuditLog::new(),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get audit log
    #[inline]
    #[must_use]
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    async fn read(&self, account: AccountId, sheet: SheetId) -> EngineResult<SheetAccess> {
        self.guard.authorize(account, sheet).await
    }

    async fn mutation(&self, account: AccountId, sheet: SheetId) -> EngineResult<MutationPermit> {
        let access = self.guard.authorize(account, sheet).await?;
        self.gate.admit(access).await
    }

    async fn value_set(&self, sheet: SheetId, id: ValueSetId) -> EngineResult<ValueSet> {
        self.store
            .get_value_set(sheet, id)
            .await?
            .ok_or_else(|| EngineError::value_set_not_found(id))
    }

    fn record(&self, permit: &MutationPermit, action: AuditAction, detail: String) {
        if self.config.audit_enabled {
            let access = permit.access();
            self.audit
                .append(access.sheet(), access.account(), action, detail);
        }
    }

    /// All value sets of a sheet
    ///
    /// # Errors
    /// NotFound if the sheet is not the caller's.
    pub async fn list_value_sets(
        &self,
        account: AccountId,
        sheet: SheetId,
    ) -> EngineResult<Vec<ValueSet>> {
        let access = self.read(account, sheet).await?;
        let sets = self.store.list_value_sets(access.sheet()).await?;
        tracing::debug!(%sheet, count = sets.len(), "listed value sets");
        Ok(sets)
    }

    /// One value set of a sheet
    ///
    /// # Errors
    /// NotFound if the sheet is not the caller's or the set is not on it.
    pub async fn get_value_set(
        &self,
        account: AccountId,
        sheet: SheetId,
        id: ValueSetId,
    ) -> EngineResult<ValueSet> {
        let access = self.read(account, sheet).await?;
        self.value_set(access.sheet(), id).await
    }

    /// Create a Draft value set
    ///
    /// # Errors
    /// - NotFound if the sheet is not the caller's
    /// - Conflict if the sheet is Verified or Approved
    pub async fn create_value_set(
        &self,
        account: AccountId,
        sheet: SheetId,
        request: CreateValueSet,
    ) -> EngineResult<ValueSet> {
        let permit = self.mutation(account, sheet).await?;
        // party ids only ever travel with Offered sets
        let party = match request.context {
            ValueSetContext::Offered => request.party_id,
            _ => None,
        };

        let created = self
            .store
            .insert_value_set(sheet, request.context, party)
            .await?;

        tracing::info!(
            %sheet,
            value_set = %created.value_set_id,
            context = %created.context,
            "created value set"
        );
        self.record(
            &permit,
            AuditAction::ValueSetCreated,
            format!(
                "value set {} ({}) created",
                created.value_set_id, created.context
            ),
        );
        Ok(created)
    }

    /// Advance a value set's status
    ///
    /// # Errors
    /// - NotFound if the sheet is not the caller's or the set is not on it
    /// - Conflict if the sheet is frozen, the set is not Draft, or the
    ///   target is not legal for the set's context
    pub async fn transition(
        &self,
        account: AccountId,
        sheet: SheetId,
        id: ValueSetId,
        target: ValueSetStatus,
    ) -> EngineResult<ValueSet> {
        let permit = self.mutation(account, sheet).await?;
        let current = self.value_set(sheet, id).await?;

        let next = match self.machine.plan(current.context, current.status, target) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!(%sheet, value_set = %id, from = %current.status, to = %target, "transition refused");
                return Err(e);
            }
        };

        match self
            .store
            .compare_and_set_status(sheet, id, ValueSetStatus::Draft, next)
            .await?
        {
            CasOutcome::Applied => {}
            CasOutcome::Mismatch(now) => {
                tracing::warn!(%sheet, value_set = %id, current = %now, "lost transition race");
                return Err(EngineError::invalid_transition(now));
            }
            CasOutcome::Missing => return Err(EngineError::value_set_not_found(id)),
        }

        tracing::info!(%sheet, value_set = %id, status = %next, "value set transitioned");
        self.record(
            &permit,
            AuditAction::StatusTransitioned,
            format!("value set {id}: {} -> {next}", current.status),
        );
        Ok(ValueSet {
            status: next,
            ..current
        })
    }

    /// Write one field value; null clears it
    ///
    /// A changed value drops the variance decisions pinned to this field.
    /// Rewriting the stored value changes nothing and is not audited.
    ///
    /// # Errors
    /// - NotFound if the sheet is not the caller's or the set is not on it
    /// - Conflict if the sheet is frozen, or the set left Draft while
    ///   `freeze_locked_value_sets` is on
    pub async fn set_field_value(
        &self,
        account: AccountId,
        sheet: SheetId,
        id: ValueSetId,
        field: InfoTemplateId,
        value: RawValue,
    ) -> EngineResult<FieldValue> {
        let permit = self.mutation(account, sheet).await?;
        let value_set = self.value_set(sheet, id).await?;

        if self.config.freeze_locked_value_sets && value_set.status != ValueSetStatus::Draft {
            tracing::warn!(%sheet, value_set = %id, status = %value_set.status, "field write refused");
            return Err(EngineError::value_set_frozen(id, value_set.status));
        }

        let previous = self
            .store
            .field_values(id)
            .await?
            .into_iter()
            .find(|fv| fv.info_template_id == field)
            .map(|fv| fv.value);

        let written = FieldValue {
            value_set_id: id,
            info_template_id: field,
            value,
        };
        if previous.as_ref() == Some(&written.value) {
            tracing::debug!(%sheet, value_set = %id, %field, "field value unchanged");
            return Ok(written);
        }

        self.store
            .upsert_field_value(id, field, written.value.clone())
            .await?;

        // a requirement edit invalidates decisions on every counterpart
        let scope = value_set.context.is_counterpart().then_some(id);
        let cleared = self
            .store
            .remove_variance_decisions(sheet, field, scope)
            .await?;
        if cleared > 0 {
            tracing::debug!(%sheet, value_set = %id, %field, cleared, "variance decisions cleared");
        }

        tracing::info!(%sheet, value_set = %id, %field, "field value set");
        self.record(
            &permit,
            AuditAction::FieldValueSet,
            format!("value set {id} field {field} set"),
        );
        Ok(written)
    }

    /// Field values of one set
    ///
    /// # Errors
    /// NotFound if the sheet is not the caller's or the set is not on it.
    pub async fn list_field_values(
        &self,
        account: AccountId,
        sheet: SheetId,
        id: ValueSetId,
    ) -> EngineResult<Vec<FieldValue>> {
        let access = self.read(account, sheet).await?;
        let value_set = self.value_set(access.sheet(), id).await?;
        Ok(self.store.field_values(value_set.value_set_id).await?)
    }

    async fn layout(&self, sheet: SheetId) -> EngineResult<SheetLayout> {
        Ok(self.directory.sheet_layout(sheet).await?.unwrap_or_default())
    }

    /// Record a reviewer decision on a deviating field
    ///
    /// Repeating the decision already on record is not audited again.
    ///
    /// # Errors
    /// - NotFound if the sheet is not the caller's, the set is not an Offered
    ///   or AsBuilt set on it, or either side of the pairing has no value
    /// - Conflict if the sheet is frozen or the field does not deviate
    pub async fn patch_variance(
        &self,
        account: AccountId,
        sheet: SheetId,
        id: ValueSetId,
        patch: PatchVariance,
    ) -> EngineResult<VarianceDecision> {
        let permit = self.mutation(account, sheet).await?;
        let field = patch.info_template_id;
        let not_paired = || EngineError::pairing_not_found(id, field);

        let counterpart = self.value_set(sheet, id).await?;
        if !counterpart.context.is_counterpart() {
            return Err(not_paired());
        }

        let sets = self.store.list_value_sets(sheet).await?;
        let requirement = self
            .variance
            .select(&sets, None)
            .requirement
            .ok_or_else(not_paired)?;

        let req_values = index_values(self.store.field_values(requirement.value_set_id).await?);
        let cp_values = index_values(self.store.field_values(id).await?);
        let (Some(req), Some(cp)) = (req_values.get(&field), cp_values.get(&field)) else {
            return Err(not_paired());
        };

        let data_type = self
            .layout(sheet)
            .await?
            .field(field)
            .map_or(FieldDataType::default(), |f| f.data_type);
        let evaluation = self
            .variance
            .evaluate(data_type, req, cp, None)
            .ok_or_else(not_paired)?;
        if evaluation.computed != VarianceStatus::Deviates {
            return Err(EngineError::nothing_to_review(field));
        }

        let decision = evaluation.decision(sheet, id, field, patch.status);
        let recorded = self
            .store
            .variance_decisions(sheet, id)
            .await?
            .into_iter()
            .any(|d| d == decision);
        if recorded {
            tracing::debug!(%sheet, value_set = %id, %field, "variance decision unchanged");
            return Ok(decision);
        }
        self.store.put_variance_decision(decision.clone()).await?;

        tracing::info!(%sheet, value_set = %id, %field, status = %patch.status, "variance decided");
        self.record(
            &permit,
            AuditAction::VarianceDecided,
            format!("value set {id} field {field}: {}", patch.status),
        );
        Ok(decision)
    }

    async fn column(&self, sheet: SheetId, value_set: Option<ValueSet>) -> EngineResult<Option<Column>> {
        let Some(value_set) = value_set else {
            return Ok(None);
        };
        let values = self.store.field_values(value_set.value_set_id).await?;
        let decisions = self
            .store
            .variance_decisions(sheet, value_set.value_set_id)
            .await?;
        Ok(Some(Column::new(value_set, values, decisions)))
    }

    /// Compare requirement values against offered and as-built values
    ///
    /// # Errors
    /// NotFound if the sheet is not the caller's.
    pub async fn compare(
        &self,
        account: AccountId,
        sheet: SheetId,
        party: Option<PartyId>,
    ) -> EngineResult<CompareView> {
        let access = self.read(account, sheet).await?;
        let sheet = access.sheet();

        let sets = self.store.list_value_sets(sheet).await?;
        let selection = self.variance.select(&sets, party);
        let layout = self.layout(sheet).await?;

        let requirement = match &selection.requirement {
            Some(vs) => Some((
                vs,
                index_values(self.store.field_values(vs.value_set_id).await?),
            )),
            None => None,
        };
        let offered = self.column(sheet, selection.offered.clone()).await?;
        let as_built = self.column(sheet, selection.as_built.clone()).await?;

        let view = self.variance.build_view(
            &layout,
            requirement.as_ref().map(|(vs, values)| (*vs, values)),
            offered.as_ref(),
            as_built.as_ref(),
        );
        tracing::debug!(
            %sheet,
            matches = view.summary.matches,
            deviates = view.summary.deviates,
            "compared value sets"
        );
        Ok(view)
    }

    /// Audit records of one sheet
    ///
    /// # Errors
    /// NotFound if the sheet is not the caller's.
    pub async fn audit_trail(
        &self,
        account: AccountId,
        sheet: SheetId,
    ) -> EngineResult<Vec<AuditEvent>> {
        let access = self.read(account, sheet).await?;
        Ok(self.audit.events_for_sheet(access.sheet()))
    }
}
