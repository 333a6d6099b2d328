use proptest::prelude::*;
use sheetflow_core::{
    AccountId, CreateValueSet, EngineError, ErrorKind, PatchVariance, RawValue, SheetId,
    ValueSetContext, ValueSetStatus, VarianceStatus,
};
use sheetflow_test_utils::{deviating_scenario, Scenario, FLOW, OWNER, SHEET, STRANGER};

async fn every_operation(s: &Scenario, account: AccountId, sheet: SheetId) -> Vec<EngineError> {
    let e = &s.engine;
    let set = s.offered.value_set_id;
    vec![
        e.list_value_sets(account, sheet).await.unwrap_err(),
        e.get_value_set(account, sheet, set).await.unwrap_err(),
        e.create_value_set(account, sheet, CreateValueSet::new(ValueSetContext::AsBuilt))
            .await
            .unwrap_err(),
        e.transition(account, sheet, set, ValueSetStatus::Locked)
            .await
            .unwrap_err(),
        e.set_field_value(account, sheet, set, FLOW, RawValue::text("1"))
            .await
            .unwrap_err(),
        e.list_field_values(account, sheet, set).await.unwrap_err(),
        e.patch_variance(
            account,
            sheet,
            set,
            PatchVariance {
                info_template_id: FLOW,
                status: VarianceStatus::DeviatesRejected,
            },
        )
        .await
        .unwrap_err(),
        e.compare(account, sheet, None).await.unwrap_err(),
        e.audit_trail(account, sheet).await.unwrap_err(),
    ]
}

#[tokio::test]
async fn test_foreign_and_missing_sheets_look_the_same() {
    let s = deviating_scenario().await;

    let foreign = every_operation(&s, STRANGER, SHEET).await;
    let missing = every_operation(&s, OWNER, SheetId(404)).await;

    for (f, m) in foreign.iter().zip(&missing) {
        assert_eq!(f.kind(), ErrorKind::NotFound);
        assert_eq!(f.kind(), m.kind());
        assert_eq!(f.to_string(), m.to_string());
    }

    // the stranger changed nothing
    let sets = s.engine.list_value_sets(OWNER, SHEET).await.unwrap();
    assert_eq!(sets.len(), 2);
    assert!(sets.iter().all(|vs| vs.status == ValueSetStatus::Draft));
}

#[tokio::test]
async fn test_value_set_of_other_sheet_is_not_found() {
    let s = deviating_scenario().await;
    s.directory
        .register_sheet(SheetId(2), OWNER, sheetflow_core::SheetStatus::Draft);

    let err = s
        .engine
        .get_value_set(OWNER, SheetId(2), s.requirement.value_set_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = s
        .engine
        .transition(OWNER, SheetId(2), s.requirement.value_set_id, ValueSetStatus::Locked)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_only_the_owner_sees_the_sheet(account in 1u64..50, sheet in 1u64..5) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let s = deviating_scenario().await;
            let result = s.engine.list_value_sets(AccountId(account), SheetId(sheet)).await;
            let visible = AccountId(account) == OWNER && SheetId(sheet) == SHEET;
            match result {
                Ok(sets) => prop_assert!(visible && sets.len() == 2),
                Err(e) => {
                    prop_assert!(!visible);
                    prop_assert_eq!(e.kind(), ErrorKind::NotFound);
                }
            }
            Ok(())
        })?;
    }
}
