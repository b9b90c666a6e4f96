//! Shared response plumbing for the route handlers.

use axum::http::StatusCode;
use axum::Json;
use royalty::{RoyaltyError, StoreError};
use serde_json::{json, Value};

pub type ApiError = (StatusCode, Json<Value>);

pub fn error_body(status: StatusCode, msg: impl ToString) -> ApiError {
    (status, Json(json!({ "error": msg.to_string() })))
}

pub fn store_error(e: StoreError) -> ApiError {
    error_body(StatusCode::INTERNAL_SERVER_ERROR, e)
}

pub fn royalty_error(e: RoyaltyError) -> ApiError {
    let status = match e {
        RoyaltyError::Unauthorized(_) => StatusCode::FORBIDDEN,
        RoyaltyError::ContributorNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    error_body(status, e)
}

pub fn not_found(what: &str) -> ApiError {
    error_body(StatusCode::NOT_FOUND, format!("{what} not found"))
}
