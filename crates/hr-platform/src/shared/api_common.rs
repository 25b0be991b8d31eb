//! Response envelopes shared by every endpoint.
//!
//! Success: `{"status": "success", "data": ...}` (lists add `results`).
//! Failure: `{"status": "fail" | "error", "message": ...}` where `fail`
//! marks client errors and `error` marks server errors.

use axum::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            data,
        }
    }
}

impl<T> SuccessEnvelope<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            status: "success",
            results: Some(data.len()),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: if status.is_server_error() { "error" } else { "fail" },
            message: message.into(),
        }
    }
}
