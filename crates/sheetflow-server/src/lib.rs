//! Sheetflow Server - HTTP surface for the value-set engine
//!
//! Routes, all scoped to `/sheets/{sheetId}` and identified by the
//! `x-account-id` header:
//! - `GET|POST /value-sets`
//! - `GET /value-sets/{id}`
//! - `POST /value-sets/{id}/status`
//! - `GET /value-sets/{id}/values`, `PUT /value-sets/{id}/values/{infoTemplateId}`
//! - `PATCH /value-sets/{id}/variances`
//! - `GET /compare?partyId=`
//! - `GET /audit`
//!
//! plus an unauthenticated `GET /healthz`.

#![allow(missing_docs)]

pub mod config;
pub mod handlers;
pub mod rejection;

pub use config::{ServerConfig, SheetSeed};
pub use rejection::{handle_rejection, ApiError};

use serde::de::DeserializeOwned;
use sheetflow_core::{AccountId, CompareQuery, InMemoryStore, ValueSetEngine};
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

/// Header carrying the caller's account id
pub const ACCOUNT_HEADER: &str = "x-account-id";

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Engine over the in-memory backends, seeded from the configuration
#[must_use]
pub fn build_engine(config: &ServerConfig) -> Arc<ValueSetEngine> {
    Arc::new(ValueSetEngine::new(
        config.engine.clone(),
        Arc::new(config.directory()),
        Arc::new(InMemoryStore::new()),
    ))
}

fn with_engine(
    engine: Arc<ValueSetEngine>,
) -> impl Filter<Extract = (Arc<ValueSetEngine>,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

/// Caller identity from the account header; 401 when absent or malformed
pub fn account() -> impl Filter<Extract = (AccountId,), Error = Rejection> + Clone {
    warp::header::optional::<String>(ACCOUNT_HEADER).and_then(|raw: Option<String>| async move {
        raw.as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(AccountId)
            .ok_or_else(|| warp::reject::custom(ApiError::Unauthenticated))
    })
}

/// JSON body; malformed input is a ValidationError rather than warp's default
pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move {
            serde_json::from_slice::<T>(&body).map_err(|e| {
                rejection::reject(sheetflow_core::EngineError::Validation(format!(
                    "invalid JSON body: {e}"
                )))
            })
        })
}

/// All routes with error recovery and request tracing
pub fn routes(
    engine: Arc<ValueSetEngine>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("healthz")
        .and(warp::get())
        .and_then(handlers::health);

    let list = warp::path!("sheets" / u64 / "value-sets")
        .and(warp::get())
        .and(account())
        .and(with_engine(engine.clone()))
        .and_then(handlers::list_value_sets);

    let create = warp::path!("sheets" / u64 / "value-sets")
        .and(warp::post())
        .and(account())
        .and(json_body())
        .and(with_engine(engine.clone()))
        .and_then(handlers::create_value_set);

    let get = warp::path!("sheets" / u64 / "value-sets" / u64)
        .and(warp::get())
        .and(account())
        .and(with_engine(engine.clone()))
        .and_then(handlers::get_value_set);

    let transition = warp::path!("sheets" / u64 / "value-sets" / u64 / "status")
        .and(warp::post())
        .and(account())
        .and(json_body())
        .and(with_engine(engine.clone()))
        .and_then(handlers::transition);

    let values = warp::path!("sheets" / u64 / "value-sets" / u64 / "values")
        .and(warp::get())
        .and(account())
        .and(with_engine(engine.clone()))
        .and_then(handlers::list_field_values);

    let set_value = warp::path!("sheets" / u64 / "value-sets" / u64 / "values" / u64)
        .and(warp::put())
        .and(account())
        .and(json_body())
        .and(with_engine(engine.clone()))
        .and_then(handlers::set_field_value);

    let patch = warp::path!("sheets" / u64 / "value-sets" / u64 / "variances")
        .and(warp::patch())
        .and(account())
        .and(json_body())
        .and(with_engine(engine.clone()))
        .and_then(handlers::patch_variance);

    let compare = warp::path!("sheets" / u64 / "compare")
        .and(warp::get())
        .and(account())
        .and(warp::query::<CompareQuery>())
        .and(with_engine(engine.clone()))
        .and_then(handlers::compare);

    let audit = warp::path!("sheets" / u64 / "audit")
        .and(warp::get())
        .and(account())
        .and(with_engine(engine))
        .and_then(handlers::audit_trail);

    health
        .or(list)
        .or(create)
        .or(get)
        .or(transition)
        .or(values)
        .or(set_value)
        .or(patch)
        .or(compare)
        .or(audit)
        .recover(handle_rejection)
        .with(warp::trace::request())
}
