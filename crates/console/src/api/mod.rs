//! Remote resource API consumed by the console.
//!
//! The console only ever talks to the API through [`ConsoleApi`], so the
//! session, list and form controllers can run against the HTTP transport
//! ([`HttpApi`]) or an in-memory stand-in in tests.
//!
//! # Error taxonomy
//!
//! Every failure is classified into an [`ErrorClass`]:
//!
//! - `Auth` (401) - terminal at bootstrap, never retried
//! - `Transient` (network, timeout, 429, 5xx) - retried only at bootstrap
//! - `Validation` - field-scoped, surfaced on the form
//! - `Other` - anything else, surfaced inline

mod http;
#[cfg(test)]
pub mod memory;
mod types;

pub use http::HttpApi;
#[cfg(test)]
pub use memory::{ApiCall, MemoryApi};
pub use types::*;

use std::future::Future;

use thiserror::Error;

use backoffice_core::{Principal, TenantId, TenantRecord, UserId, UserRecord};

use crate::error::FieldErrors;
use crate::list::ListRequest;

/// Classification of a failure, driving retry and display policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Credentials rejected (401).
    Auth,
    /// Network, timeout, rate limit or server failure.
    Transient,
    /// Field-scoped validation failure.
    Validation,
    /// Any other failure.
    Other,
}

/// Errors that can occur when calling the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The API rejected the credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Network failure, timeout, rate limit or 5xx response.
    #[error("Service unavailable: {0}")]
    Transient(String),

    /// The API rejected the payload field by field.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded or a request could not be built.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Classify the error for retry and display decisions.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized => ErrorClass::Auth,
            Self::Transient(_) => ErrorClass::Transient,
            Self::Validation(_) => ErrorClass::Validation,
            Self::NotFound(_) | Self::Rejected { .. } | Self::Parse(_) => ErrorClass::Other,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else if err.is_builder() {
            Self::Parse(format!("invalid request: {err}"))
        } else {
            Self::Transient(err.to_string())
        }
    }
}

/// Operations the console needs from the remote resource API.
///
/// All futures are `Send` so controllers can drive them from spawned tasks.
pub trait ConsoleApi: Send + Sync + 'static {
    /// Identity probe for the current credentials.
    fn who_am_i(&self) -> impl Future<Output = Result<Principal, ApiError>> + Send;

    /// Exchange email and password for a session.
    fn login(&self, credentials: &Credentials)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    /// End the session. Idempotent.
    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_users(
        &self,
        request: &ListRequest,
    ) -> impl Future<Output = Result<ListPage<UserRecord>, ApiError>> + Send;

    fn list_tenants(
        &self,
        request: &ListRequest,
    ) -> impl Future<Output = Result<ListPage<TenantRecord>, ApiError>> + Send;

    fn create_user(
        &self,
        payload: &UserPayload,
    ) -> impl Future<Output = Result<UserRecord, ApiError>> + Send;

    fn update_user(
        &self,
        id: UserId,
        payload: &UserPayload,
    ) -> impl Future<Output = Result<UserRecord, ApiError>> + Send;

    fn create_tenant(
        &self,
        payload: &TenantPayload,
    ) -> impl Future<Output = Result<TenantRecord, ApiError>> + Send;

    fn update_tenant(
        &self,
        id: TenantId,
        payload: &TenantPayload,
    ) -> impl Future<Output = Result<TenantRecord, ApiError>> + Send;
}
