//! HTTP transport for the remote resource API.
//!
//! # API Reference
//!
//! - Authentication: session cookie set by `POST auth/login`, or a bearer
//!   token from `CONSOLE_API_TOKEN`
//! - Lists: `GET users?page=1&perPage=6&q=..&role=..&status=..` returning
//!   `{"data": [...], "total": n}`
//! - Errors: `{"errors": [{"msg": "...", "path": "field"}]}`

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use backoffice_core::{Principal, TenantId, TenantRecord, UserId, UserRecord};

use super::{ApiError, ConsoleApi, Credentials, ListPage, TenantPayload, UserPayload};
use crate::config::ConsoleConfig;
use crate::error::FieldErrors;
use crate::list::ListRequest;

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    msg: String,
    #[serde(default)]
    path: Option<String>,
}

/// reqwest-backed [`ConsoleApi`].
///
/// Keeps a cookie store so a login in this process authenticates every
/// later call.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    /// Create a new HTTP client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client,
                base_url: config.api_url.clone(),
            }),
        })
    }

    /// Base URL every path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Parse(format!("Invalid API path '{path}': {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let response = self.inner.client.get(url).send().await?;
        handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn patch<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .patch(self.url(path)?)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// POST where the response body is irrelevant.
    async fn post_no_content<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }
}

/// Decode a success body or turn the response into an [`ApiError`].
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
    }
    Err(parse_error(response).await)
}

/// Map a non-success response onto the error taxonomy.
async fn parse_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    classify_error(status, &text)
}

fn classify_error(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return ApiError::Transient(format!("HTTP {}", status.as_u16()));
    }

    let entries = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.errors)
        .unwrap_or_default();

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
    ) && entries.iter().any(|e| e.path.is_some())
    {
        let mut fields = FieldErrors::new();
        for entry in entries {
            fields.add(entry.path.unwrap_or_else(|| "form".to_string()), entry.msg);
        }
        return ApiError::Validation(fields);
    }

    let message = entries
        .into_iter()
        .next()
        .map(|e| e.msg)
        .or_else(|| status.canonical_reason().map(ToString::to_string))
        .unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(message);
    }
    ApiError::Rejected {
        status: status.as_u16(),
        message,
    }
}

impl ConsoleApi for HttpApi {
    #[instrument(skip(self))]
    async fn who_am_i(&self) -> Result<Principal, ApiError> {
        self.get("auth/self", &[]).await
    }

    #[instrument(skip(self, credentials))]
    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.post_no_content("auth/login", &credentials.to_body())
            .await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        self.post_no_content("auth/logout", &serde_json::json!({}))
            .await
    }

    #[instrument(skip(self, request), fields(query = %request))]
    async fn list_users(&self, request: &ListRequest) -> Result<ListPage<UserRecord>, ApiError> {
        self.get("users", request.pairs()).await
    }

    #[instrument(skip(self, request), fields(query = %request))]
    async fn list_tenants(
        &self,
        request: &ListRequest,
    ) -> Result<ListPage<TenantRecord>, ApiError> {
        self.get("tenants", request.pairs()).await
    }

    #[instrument(skip(self, payload))]
    async fn create_user(&self, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.post("users", payload).await
    }

    #[instrument(skip(self, payload))]
    async fn update_user(&self, id: UserId, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.patch(&format!("users/{id}"), payload).await
    }

    #[instrument(skip(self, payload))]
    async fn create_tenant(&self, payload: &TenantPayload) -> Result<TenantRecord, ApiError> {
        self.post("tenants", payload).await
    }

    #[instrument(skip(self, payload))]
    async fn update_tenant(
        &self,
        id: TenantId,
        payload: &TenantPayload,
    ) -> Result<TenantRecord, ApiError> {
        self.patch(&format!("tenants/{id}"), payload).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_relative_paths() {
        let config = ConsoleConfig::new(Url::parse("https://api.example.com/v1").unwrap());
        let api = HttpApi::new(&config).unwrap();
        assert_eq!(
            api.url("users/5").unwrap().as_str(),
            "https://api.example.com/v1/users/5"
        );
    }

    #[test]
    fn test_classify_unauthorized() {
        assert_eq!(
            classify_error(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        );
    }

    #[test]
    fn test_classify_server_errors_as_transient() {
        assert!(matches!(
            classify_error(StatusCode::BAD_GATEWAY, "<html>"),
            ApiError::Transient(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::Transient(_)
        ));
    }

    #[test]
    fn test_classify_field_errors() {
        let body = r#"{"errors":[
            {"type":"field","msg":"Email is required!","path":"email","location":"body"},
            {"type":"field","msg":"Role is required!","path":"role","location":"body"}
        ]}"#;
        match classify_error(StatusCode::BAD_REQUEST, body) {
            ApiError::Validation(fields) => {
                assert_eq!(fields.get("email"), ["Email is required!".to_string()]);
                assert_eq!(fields.get("role").len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_bad_request_without_fields() {
        let body = r#"{"errors":[{"msg":"Email is already exists in database"}]}"#;
        assert_eq!(
            classify_error(StatusCode::BAD_REQUEST, body),
            ApiError::Rejected {
                status: 400,
                message: "Email is already exists in database".to_string()
            }
        );
    }

    #[test]
    fn test_classify_not_found_uses_reason_when_body_is_empty() {
        assert_eq!(
            classify_error(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound("Not Found".to_string())
        );
    }
}
