//! Integration tests for the backoffice console.
//!
//! The tests drive the console's HTTP transport against [`FakeApi`], an
//! in-process axum server that speaks the remote API's wire format:
//! cookie sessions, `{"data": [...], "total": n}` pages and
//! `{"errors": [{"msg", "path"}]}` failures.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p backoffice-integration-tests
//! ```
//!
//! # Routes
//!
//! ```text
//! GET   /api/auth/self      - Identity probe (401 without a session)
//! POST  /api/auth/login     - Sets the `sid` cookie
//! POST  /api/auth/logout    - Clears the `sid` cookie
//! GET   /api/users          - ?page&perPage&q&role
//! POST  /api/users
//! PATCH /api/users/{id}
//! GET   /api/tenants        - ?page&perPage&q
//! POST  /api/tenants
//! PATCH /api/tenants/{id}
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use secrecy::SecretString;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use backoffice_console::{ConsoleApi, ConsoleConfig, Credentials, HttpApi};
use backoffice_core::{Email, Principal, Role, TenantId, TenantRecord, TenantRef, UserId, UserRecord};

const SESSION_COOKIE: &str = "sid";
const DEFAULT_PER_PAGE: usize = 10;

/// One request received by the fake API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub method: &'static str,
    /// Path below `/api/`, e.g. `users/5`.
    pub path: String,
    pub query: Option<String>,
}

struct Account {
    email: String,
    password: String,
    principal: Principal,
}

#[derive(Default)]
struct Backend {
    accounts: Vec<Account>,
    users: Vec<UserRecord>,
    tenants: Vec<TenantRecord>,
    /// Session token to account id.
    sessions: HashMap<String, UserId>,
    next_session: u64,
    api_token: Option<(String, Principal)>,
    /// Statuses to answer with before handling, per path.
    failures: HashMap<String, VecDeque<StatusCode>>,
    hits: Vec<Hit>,
}

type Shared = Arc<Mutex<Backend>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Backend> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Backend {
    /// Record the request and answer with a queued failure if one is due.
    fn enter(&mut self, method: &'static str, path: String, query: Option<String>) -> Result<(), Response> {
        let failure = self
            .failures
            .get_mut(&path)
            .and_then(VecDeque::pop_front);
        self.hits.push(Hit { method, path, query });
        match failure {
            Some(status) => Err(error(status, "Injected failure", None)),
            None => Ok(()),
        }
    }

    fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        if let (Some((token, principal)), Some(value)) =
            (&self.api_token, headers.get(header::AUTHORIZATION))
        {
            if value.to_str().ok() == Some(format!("Bearer {token}").as_str()) {
                return Some(principal.clone());
            }
        }

        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = cookies
            .split(';')
            .find_map(|c| c.trim().strip_prefix(&format!("{SESSION_COOKIE}=")).map(str::to_string))?;
        let id = self.sessions.get(&token)?;
        self.accounts
            .iter()
            .find(|a| a.principal.id == *id)
            .map(|a| a.principal.clone())
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<Principal, Response> {
        self.principal(headers)
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Unauthorized", None))
    }

    fn tenant_ref(&self, id: TenantId) -> Option<TenantRef> {
        self.tenants.iter().find(|t| t.id == id).map(|t| TenantRef {
            id: t.id,
            name: t.name.clone(),
        })
    }

    fn check_user(&self, body: &UserBody, editing: Option<UserId>) -> Result<Option<TenantRef>, Response> {
        if self
            .users
            .iter()
            .any(|u| u.email == body.email.as_str() && Some(u.id) != editing)
        {
            return Err(error(
                StatusCode::BAD_REQUEST,
                "Email is already exists in database",
                Some("email"),
            ));
        }
        match (body.role, body.tenant_id) {
            (Role::Manager, None) => Err(error(
                StatusCode::BAD_REQUEST,
                "Restaurant is required for managers!",
                Some("tenantId"),
            )),
            (_, Some(id)) => self.tenant_ref(id).map(Some).ok_or_else(|| {
                error(StatusCode::BAD_REQUEST, "Restaurant not found", Some("tenantId"))
            }),
            (_, None) => Ok(None),
        }
    }
}

/// `{"errors": [{"msg": ..., "path": ...}]}` with the given status.
fn error(status: StatusCode, msg: &str, path: Option<&str>) -> Response {
    (status, Json(json!({ "errors": [{ "msg": msg, "path": path }] }))).into_response()
}

fn params(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn page_of<T: Serialize>(items: Vec<T>, params: &HashMap<String, String>) -> Response {
    let number = |key: &str, default: usize| {
        params
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default)
            .max(1)
    };
    let page = number("page", 1);
    let per_page = number("perPage", DEFAULT_PER_PAGE);
    let total = items.len();
    let data: Vec<T> = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    Json(json!({ "data": data, "total": total })).into_response()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    first_name: String,
    last_name: String,
    email: Email,
    #[serde(default)]
    password: Option<String>,
    role: Role,
    #[serde(default)]
    tenant_id: Option<TenantId>,
}

#[derive(Deserialize)]
struct TenantBody {
    name: String,
    address: String,
}

async fn who_am_i(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend.enter("GET", "auth/self".to_string(), None) {
        return response;
    }
    match backend.authorize(&headers) {
        Ok(principal) => Json(principal).into_response(),
        Err(response) => response,
    }
}

async fn login(State(shared): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend.enter("POST", "auth/login".to_string(), None) {
        return response;
    }
    let Some(id) = backend
        .accounts
        .iter()
        .find(|a| a.email.eq_ignore_ascii_case(&body.email) && a.password == body.password)
        .map(|a| a.principal.id)
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password", None);
    };

    backend.next_session += 1;
    let token = format!("session-{}", backend.next_session);
    backend.sessions.insert(token.clone(), id);
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly"))],
        Json(json!({ "message": "Logged in" })),
    )
        .into_response()
}

async fn logout(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend.enter("POST", "auth/logout".to_string(), None) {
        return response;
    }
    if let Some(principal) = backend.principal(&headers) {
        backend.sessions.retain(|_, id| *id != principal.id);
    }
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn list_users(
    State(shared): State<Shared>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let mut backend = lock(&shared);
    let params = params(query.as_deref());
    if let Err(response) = backend
        .enter("GET", "users".to_string(), query)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }

    let search = params.get("q");
    let role = params.get("role");
    let users: Vec<UserRecord> = backend
        .users
        .iter()
        .filter(|u| {
            search.is_none_or(|q| contains_ci(&u.full_name(), q) || contains_ci(u.email.as_str(), q))
        })
        .filter(|u| role.is_none_or(|r| u.role.as_str() == r))
        .cloned()
        .collect();
    page_of(users, &params)
}

async fn create_user(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<UserBody>,
) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend
        .enter("POST", "users".to_string(), None)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }
    if body.password.as_deref().is_none_or(str::is_empty) {
        return error(StatusCode::BAD_REQUEST, "Password is required!", Some("password"));
    }
    let tenant = match backend.check_user(&body, None) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    let id = backend.users.iter().map(|u| u.id.as_i32()).max().unwrap_or(0) + 1;
    let record = UserRecord {
        id: UserId::new(id),
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email.into(),
        role: body.role,
        tenant,
        created_at: None,
    };
    backend.users.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update_user(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<UserBody>,
) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend
        .enter("PATCH", format!("users/{id}"), None)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }
    let id = UserId::new(id);
    let tenant = match backend.check_user(&body, Some(id)) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let Some(user) = backend.users.iter_mut().find(|u| u.id == id) else {
        return error(StatusCode::NOT_FOUND, "User not found", None);
    };

    user.first_name = body.first_name;
    user.last_name = body.last_name;
    user.email = body.email.into();
    user.role = body.role;
    user.tenant = tenant;
    Json(user.clone()).into_response()
}

async fn list_tenants(
    State(shared): State<Shared>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let mut backend = lock(&shared);
    let params = params(query.as_deref());
    if let Err(response) = backend
        .enter("GET", "tenants".to_string(), query)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }

    let search = params.get("q");
    let tenants: Vec<TenantRecord> = backend
        .tenants
        .iter()
        .filter(|t| search.is_none_or(|q| contains_ci(&t.name, q) || contains_ci(&t.address, q)))
        .cloned()
        .collect();
    page_of(tenants, &params)
}

async fn create_tenant(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<TenantBody>,
) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend
        .enter("POST", "tenants".to_string(), None)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }
    if backend.tenants.iter().any(|t| t.name == body.name) {
        return error(
            StatusCode::BAD_REQUEST,
            "Restaurant name already exists",
            Some("name"),
        );
    }

    let id = backend.tenants.iter().map(|t| t.id.as_i32()).max().unwrap_or(0) + 1;
    let record = tenant(id, &body.name, &body.address);
    backend.tenants.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update_tenant(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<TenantBody>,
) -> Response {
    let mut backend = lock(&shared);
    if let Err(response) = backend
        .enter("PATCH", format!("tenants/{id}"), None)
        .and_then(|()| backend.authorize(&headers).map(drop))
    {
        return response;
    }
    let id = TenantId::new(id);
    let Some(record) = backend.tenants.iter_mut().find(|t| t.id == id) else {
        return error(StatusCode::NOT_FOUND, "Restaurant not found", None);
    };

    record.name = body.name;
    record.address = body.address;
    let record = record.clone();
    for user in &mut backend.users {
        if let Some(tenant) = user.tenant.as_mut().filter(|t| t.id == id) {
            tenant.name.clone_from(&record.name);
        }
    }
    Json(record).into_response()
}

fn router(shared: Shared) -> Router {
    let api = Router::new()
        .route("/auth/self", get(who_am_i))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", patch(update_user))
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/{id}", patch(update_tenant))
        .with_state(shared);
    Router::new().nest("/api", api)
}

/// In-process remote API bound to an ephemeral local port.
///
/// The server task is aborted when the value is dropped.
pub struct FakeApi {
    addr: SocketAddr,
    backend: Shared,
    server: JoinHandle<()>,
}

impl FakeApi {
    /// Bind to `127.0.0.1:0` and start serving, with the [`ADMIN_EMAIL`]
    /// account registered.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let backend = Shared::default();
        lock(&backend).accounts.push(Account {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            principal: admin(),
        });
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake API address");

        let app = router(Arc::clone(&backend));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            backend,
            server,
        }
    }

    /// Base URL of the API, below the `/api` prefix.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("Invalid fake API URL")
    }

    /// Console configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ConsoleConfig {
        ConsoleConfig::new(self.url())
    }

    /// HTTP transport already signed in as the admin account.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built or the login fails.
    pub async fn admin_api(&self) -> HttpApi {
        let api = HttpApi::new(&self.config()).expect("Failed to build HTTP client");
        let credentials = Credentials::new(ADMIN_EMAIL, SecretString::from(ADMIN_PASSWORD));
        api.login(&credentials).await.expect("Admin login failed");
        api
    }

    /// Register an account that can log in.
    pub fn add_account(&self, email: &str, password: &str, principal: Principal) {
        lock(&self.backend).accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
            principal,
        });
    }

    /// Accept `Authorization: Bearer {token}` as `principal`.
    pub fn accept_token(&self, token: &str, principal: Principal) {
        lock(&self.backend).api_token = Some((token.to_string(), principal));
    }

    pub fn add_users(&self, users: impl IntoIterator<Item = UserRecord>) {
        lock(&self.backend).users.extend(users);
    }

    pub fn add_tenants(&self, tenants: impl IntoIterator<Item = TenantRecord>) {
        lock(&self.backend).tenants.extend(tenants);
    }

    /// Answer the next request to `path` with `status`, before any other
    /// handling. Calls queue up.
    pub fn fail_next(&self, path: &str, status: StatusCode) {
        lock(&self.backend)
            .failures
            .entry(path.to_string())
            .or_default()
            .push_back(status);
    }

    #[must_use]
    pub fn hits(&self) -> Vec<Hit> {
        lock(&self.backend).hits.clone()
    }

    /// Number of requests to `path` with `method`.
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.backend)
            .hits
            .iter()
            .filter(|h| h.method == method && h.path == path)
            .count()
    }

    /// Query strings of every `GET {path}`, oldest first.
    #[must_use]
    pub fn queries(&self, path: &str) -> Vec<String> {
        lock(&self.backend)
            .hits
            .iter()
            .filter(|h| h.method == "GET" && h.path == path)
            .map(|h| h.query.clone().unwrap_or_default())
            .collect()
    }

    pub fn clear_hits(&self) {
        lock(&self.backend).hits.clear();
    }

    /// Current server-side copy of a tenant.
    #[must_use]
    pub fn tenant(&self, id: i32) -> Option<TenantRecord> {
        lock(&self.backend)
            .tenants
            .iter()
            .find(|t| t.id.as_i32() == id)
            .cloned()
    }

    /// Current server-side copy of an account.
    #[must_use]
    pub fn user(&self, id: i32) -> Option<UserRecord> {
        lock(&self.backend)
            .users
            .iter()
            .find(|u| u.id.as_i32() == id)
            .cloned()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Tenant record fixture.
#[must_use]
pub fn tenant(id: i32, name: &str, address: &str) -> TenantRecord {
    TenantRecord {
        id: TenantId::new(id),
        name: name.to_string(),
        address: address.to_string(),
        created_at: None,
    }
}

/// Restaurants `1..=count` named `Restaurant {n}`.
#[must_use]
pub fn restaurants(count: i32) -> Vec<TenantRecord> {
    (1..=count)
        .map(|n| tenant(n, &format!("Restaurant {n}"), &format!("{n} Main St")))
        .collect()
}

/// Account record fixture.
#[must_use]
pub fn user(id: i32, name: (&str, &str), email: &str, role: Role, tenant: Option<&TenantRecord>) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        first_name: name.0.to_string(),
        last_name: name.1.to_string(),
        email: email.to_string(),
        role,
        tenant: tenant.map(|t| TenantRef {
            id: t.id,
            name: t.name.clone(),
        }),
        created_at: None,
    }
}

/// The admin account every test signs in with.
pub const ADMIN_EMAIL: &str = "admin@pizza.example";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// Principal of [`ADMIN_EMAIL`].
#[must_use]
pub fn admin() -> Principal {
    Principal::new(UserId::new(1), Role::Admin)
}
