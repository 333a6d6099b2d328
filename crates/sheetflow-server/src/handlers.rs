//! Request handlers
//!
//! Each handler validates its body, calls the engine, and shapes the reply.

use crate::rejection::reject;
use serde_json::json;
use sheetflow_core::{
    AccountId, CompareQuery, CreateValueSetRequest, InfoTemplateId, PartyId, PatchVarianceRequest,
    SetFieldValueRequest, SheetId, TransitionRequest, ValueSetEngine, ValueSetId,
};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

type Engine = Arc<ValueSetEngine>;

pub async fn health() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "ok",
        "version": sheetflow_core::VERSION,
    })))
}

pub async fn list_value_sets(
    sheet: u64,
    account: AccountId,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let sets = engine
        .list_value_sets(account, SheetId(sheet))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&sets))
}

pub async fn create_value_set(
    sheet: u64,
    account: AccountId,
    body: CreateValueSetRequest,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let request = body.validate().map_err(reject)?;
    let created = engine
        .create_value_set(account, SheetId(sheet), request)
        .await
        .map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({
            "valueSetId": created.value_set_id,
            "context": created.context,
        })),
        StatusCode::CREATED,
    ))
}

pub async fn get_value_set(
    sheet: u64,
    id: u64,
    account: AccountId,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let set = engine
        .get_value_set(account, SheetId(sheet), ValueSetId(id))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&set))
}

pub async fn transition(
    sheet: u64,
    id: u64,
    account: AccountId,
    body: TransitionRequest,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let target = body.validate().map_err(reject)?;
    let updated = engine
        .transition(account, SheetId(sheet), ValueSetId(id), target)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&json!({
        "valueSetId": updated.value_set_id,
        "status": updated.status,
    })))
}

pub async fn list_field_values(
    sheet: u64,
    id: u64,
    account: AccountId,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let values = engine
        .list_field_values(account, SheetId(sheet), ValueSetId(id))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&values))
}

pub async fn set_field_value(
    sheet: u64,
    id: u64,
    field: u64,
    account: AccountId,
    body: SetFieldValueRequest,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let written = engine
        .set_field_value(
            account,
            SheetId(sheet),
            ValueSetId(id),
            InfoTemplateId(field),
            body.value,
        )
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&written))
}

pub async fn patch_variance(
    sheet: u64,
    id: u64,
    account: AccountId,
    body: PatchVarianceRequest,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let patch = body.validate().map_err(reject)?;
    engine
        .patch_variance(account, SheetId(sheet), ValueSetId(id), patch)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&json!({ "ok": true })))
}

pub async fn compare(
    sheet: u64,
    account: AccountId,
    query: CompareQuery,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let view = engine
        .compare(account, SheetId(sheet), query.party_id.map(PartyId))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&view))
}

pub async fn audit_trail(
    sheet: u64,
    account: AccountId,
    engine: Engine,
) -> Result<impl Reply, Rejection> {
    let events = engine
        .audit_trail(account, SheetId(sheet))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&events))
}
