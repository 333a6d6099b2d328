//! Testing utilities for the sheetflow workspace
//!
//! Shared fixtures: a registered sheet with a small template layout and an
//! engine over in-memory backends.

#![allow(missing_docs)]

use sheetflow_core::{
    AccountId, CreateValueSet, EngineConfig, FieldDataType, FieldLayout, InMemoryDirectory,
    InMemoryStore, InfoTemplateId, PartyId, RawValue, SheetId, SheetLayout, SheetStatus,
    SubsheetLayout, ValueSet, ValueSetContext, ValueSetEngine,
};
use std::sync::Arc;

pub const OWNER: AccountId = AccountId(1);
pub const STRANGER: AccountId = AccountId(2);
pub const SHEET: SheetId = SheetId(1);
pub const FLOW: InfoTemplateId = InfoTemplateId(101);
pub const MATERIAL: InfoTemplateId = InfoTemplateId(102);
pub const VENDOR: PartyId = PartyId(5);

/// Layout with one numeric and one text field
pub fn test_layout() -> SheetLayout {
    SheetLayout::new()
        .with_subsheet(
            SubsheetLayout::new(1, "Process")
                .with_field(FieldLayout::new(FLOW.get(), "Flow", FieldDataType::Number).with_uom("m3/h")),
        )
        .with_subsheet(
            SubsheetLayout::new(2, "Construction")
                .with_field(FieldLayout::new(MATERIAL.get(), "Material", FieldDataType::Text)),
        )
}

/// Directory holding `SHEET`, owned by `OWNER`, in the given status
pub fn setup_directory(status: SheetStatus) -> Arc<InMemoryDirectory> {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.register_sheet(SHEET, OWNER, status);
    directory.set_layout(SHEET, test_layout());
    directory
}

pub fn setup_engine_with(config: EngineConfig) -> (Arc<InMemoryDirectory>, Arc<ValueSetEngine>) {
    let directory = setup_directory(SheetStatus::Draft);
    let engine = ValueSetEngine::new(config, directory.clone(), Arc::new(InMemoryStore::new()));
    (directory, Arc::new(engine))
}

pub fn setup_engine() -> (Arc<InMemoryDirectory>, Arc<ValueSetEngine>) {
    setup_engine_with(EngineConfig::default())
}

pub async fn create(engine: &ValueSetEngine, request: CreateValueSet) -> ValueSet {
    engine
        .create_value_set(OWNER, SHEET, request)
        .await
        .unwrap()
}

pub async fn set_value(engine: &ValueSetEngine, set: &ValueSet, field: InfoTemplateId, value: RawValue) {
    engine
        .set_field_value(OWNER, SHEET, set.value_set_id, field, value)
        .await
        .unwrap();
}

/// Requirement and offered sets where the flow deviates (120 vs 125)
pub struct Scenario {
    pub directory: Arc<InMemoryDirectory>,
    pub engine: Arc<ValueSetEngine>,
    pub requirement: ValueSet,
    pub offered: ValueSet,
}

pub async fn deviating_scenario() -> Scenario {
    let (directory, engine) = setup_engine();
    let requirement = create(&engine, CreateValueSet::new(ValueSetContext::Requirement)).await;
    let offered = create(&engine, CreateValueSet::offered(Some(VENDOR))).await;
    set_value(&engine, &requirement, FLOW, RawValue::text("120")).await;
    set_value(&engine, &offered, FLOW, RawValue::text("125")).await;
    Scenario {
        directory,
        engine,
        requirement,
        offered,
    }
}
