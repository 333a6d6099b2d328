//! Rejections and their JSON rendering
//!
//! Every failure leaves the server as `{"error": kind, "message": text}`.

use serde::Serialize;
use sheetflow_core::{EngineError, ErrorKind};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

/// Request failure carried through warp's rejection chain
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Domain or store failure from the engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No usable caller identity on the request
    #[error("missing or invalid x-account-id header")]
    Unauthenticated,
}

impl warp::reject::Reject for ApiError {}

/// Wrap an engine failure as a rejection
pub fn reject(err: EngineError) -> Rejection {
    warp::reject::custom(ApiError::Engine(err))
}

/// HTTP status for an error kind
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn classify(err: &Rejection) -> (StatusCode, &'static str, String) {
    if let Some(api) = err.find::<ApiError>() {
        return match api {
            ApiError::Engine(e) => {
                let kind = e.kind();
                if kind == ErrorKind::Internal {
                    tracing::error!(error = %e, "request failed");
                }
                (status_for(kind), kind.as_str(), e.to_string())
            }
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthenticated", api.to_string())
            }
        };
    }
    if err.is_not_found() {
        return (
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound.as_str(),
            "Route not found".to_string(),
        );
    }
    if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        return (
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation.as_str(),
            e.to_string(),
        );
    }
    if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Validation.as_str(),
            e.to_string(),
        );
    }
    if let Some(e) = err.find::<warp::reject::LengthRequired>() {
        return (
            StatusCode::LENGTH_REQUIRED,
            ErrorKind::Validation.as_str(),
            e.to_string(),
        );
    }
    if let Some(e) = err.find::<warp::reject::MethodNotAllowed>() {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            e.to_string(),
        );
    }

    tracing::error!(?err, "unhandled rejection");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Internal.as_str(),
        "Internal server error".to_string(),
    )
}

/// Render any rejection as a JSON error response
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, error, message) = classify(&err);
    let body = warp::reply::json(&ErrorBody { error, message });
    Ok(warp::reply::with_status(body, status))
}
