//! In-memory [`ConsoleApi`] for tests.
//!
//! Keeps accounts and tenants in a mutex-guarded store, records every call
//! in order, and can be scripted with identity-probe outcomes, list
//! response delays, and list or mutation failures.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use secrecy::ExposeSecret;

use backoffice_core::{
    Principal, TenantId, TenantRecord, TenantRef, UserId, UserRecord,
};

use super::{ApiError, ConsoleApi, Credentials, ListPage, TenantPayload, UserPayload};
use crate::list::{ListRequest, SEARCH_KEY};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    WhoAmI,
    Login { email: String },
    Logout,
    ListUsers(ListRequest),
    ListTenants(ListRequest),
    CreateUser(UserPayload),
    UpdateUser(UserId, UserPayload),
    CreateTenant(TenantPayload),
    UpdateTenant(TenantId, TenantPayload),
}

impl ApiCall {
    /// List request carried by a list call.
    #[must_use]
    pub const fn list_request(&self) -> Option<&ListRequest> {
        match self {
            Self::ListUsers(request) | Self::ListTenants(request) => Some(request),
            _ => None,
        }
    }
}

struct Account {
    email: String,
    password: String,
    principal: Principal,
}

#[derive(Default)]
struct Store {
    calls: Vec<ApiCall>,
    signed_in: Option<Principal>,
    accounts: Vec<Account>,
    who_am_i_script: VecDeque<Result<Principal, ApiError>>,
    list_delays: VecDeque<Duration>,
    list_failures: VecDeque<ApiError>,
    mutation_failures: VecDeque<ApiError>,
    users: Vec<UserRecord>,
    tenants: Vec<TenantRecord>,
}

/// Scriptable in-memory API.
#[derive(Default)]
pub struct MemoryApi {
    store: Mutex<Store>,
}

impl MemoryApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register credentials that `login` accepts for `principal`.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, principal: Principal) -> Self {
        self.lock().accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
            principal,
        });
        self
    }

    #[must_use]
    pub fn with_users(self, users: Vec<UserRecord>) -> Self {
        self.lock().users = users;
        self
    }

    #[must_use]
    pub fn with_tenants(self, tenants: Vec<TenantRecord>) -> Self {
        self.lock().tenants = tenants;
        self
    }

    /// Start with an established session for `principal`.
    #[must_use]
    pub fn signed_in(self, principal: Principal) -> Self {
        self.lock().signed_in = Some(principal);
        self
    }

    /// Queue the outcome of the next `who_am_i` call. Unscripted calls answer
    /// from the current session (401 when nobody is signed in).
    pub fn script_who_am_i(&self, outcome: Result<Principal, ApiError>) {
        self.lock().who_am_i_script.push_back(outcome);
    }

    /// Delay the response of the next list call.
    pub fn push_list_delay(&self, delay: Duration) {
        self.lock().list_delays.push_back(delay);
    }

    /// Fail the next list call with `error`.
    pub fn fail_next_list(&self, error: ApiError) {
        self.lock().list_failures.push_back(error);
    }

    /// Fail the next create or update call with `error`.
    pub fn fail_next_mutation(&self, error: ApiError) {
        self.lock().mutation_failures.push_back(error);
    }

    /// Every call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Requests of every list call so far.
    #[must_use]
    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(ApiCall::list_request)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ApiCall) {
        self.lock().calls.push(call);
    }

    /// Apply the scripted delay and failure of a list call.
    async fn list_script(&self) -> Result<(), ApiError> {
        let delay = self.lock().list_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock().list_failures.pop_front().map_or(Ok(()), Err)
    }

    fn take_mutation_failure(&self) -> Result<(), ApiError> {
        self.lock().mutation_failures.pop_front().map_or(Ok(()), Err)
    }

    fn tenant_ref(&self, id: Option<TenantId>) -> Option<TenantRef> {
        let id = id?;
        self.lock()
            .tenants
            .iter()
            .find(|t| t.id == id)
            .map(|t| TenantRef {
                id: t.id,
                name: t.name.clone(),
            })
    }
}

fn paginate<T: Clone>(rows: &[T], request: &ListRequest) -> ListPage<T> {
    let per_page = request.per_page().max(1) as usize;
    let skip = (request.page().max(1) as usize - 1) * per_page;
    ListPage {
        data: rows.iter().skip(skip).take(per_page).cloned().collect(),
        total: rows.len() as u64,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ConsoleApi for MemoryApi {
    async fn who_am_i(&self) -> Result<Principal, ApiError> {
        self.record(ApiCall::WhoAmI);
        let mut store = self.lock();
        match store.who_am_i_script.pop_front() {
            Some(outcome) => outcome,
            None => store.signed_in.clone().ok_or(ApiError::Unauthorized),
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.record(ApiCall::Login {
            email: credentials.email.clone(),
        });
        let mut store = self.lock();
        let principal = store
            .accounts
            .iter()
            .find(|a| {
                a.email == credentials.email
                    && a.password == credentials.password.expose_secret()
            })
            .map(|a| a.principal.clone())
            .ok_or(ApiError::Unauthorized)?;
        store.signed_in = Some(principal);
        Ok(())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record(ApiCall::Logout);
        self.lock().signed_in = None;
        Ok(())
    }

    async fn list_users(&self, request: &ListRequest) -> Result<ListPage<UserRecord>, ApiError> {
        self.record(ApiCall::ListUsers(request.clone()));
        self.list_script().await?;

        let store = self.lock();
        let search = request.get(SEARCH_KEY);
        let role = request.get("role");
        // Records carry no status, so the status filter matches everything.
        let rows: Vec<UserRecord> = store
            .users
            .iter()
            .filter(|u| {
                search.is_none_or(|q| {
                    contains_ignore_case(&u.full_name(), q)
                        || contains_ignore_case(u.email.as_str(), q)
                })
            })
            .filter(|u| role.is_none_or(|r| u.role.as_str() == r))
            .cloned()
            .collect();
        Ok(paginate(&rows, request))
    }

    async fn list_tenants(
        &self,
        request: &ListRequest,
    ) -> Result<ListPage<TenantRecord>, ApiError> {
        self.record(ApiCall::ListTenants(request.clone()));
        self.list_script().await?;

        let store = self.lock();
        let search = request.get(SEARCH_KEY);
        let rows: Vec<TenantRecord> = store
            .tenants
            .iter()
            .filter(|t| {
                search.is_none_or(|q| {
                    contains_ignore_case(&t.name, q) || contains_ignore_case(&t.address, q)
                })
            })
            .cloned()
            .collect();
        Ok(paginate(&rows, request))
    }

    async fn create_user(&self, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.record(ApiCall::CreateUser(payload.clone()));
        self.take_mutation_failure()?;

        let tenant = self.tenant_ref(payload.tenant_id);
        let mut store = self.lock();
        let next_id = store.users.iter().map(|u| u.id.as_i32()).max().unwrap_or(0) + 1;
        let record = UserRecord {
            id: UserId::new(next_id),
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            email: payload.email.to_string(),
            role: payload.role,
            tenant,
            created_at: None,
        };
        store.users.push(record.clone());
        Ok(record)
    }

    async fn update_user(&self, id: UserId, payload: &UserPayload) -> Result<UserRecord, ApiError> {
        self.record(ApiCall::UpdateUser(id, payload.clone()));
        self.take_mutation_failure()?;

        let tenant = self.tenant_ref(payload.tenant_id);
        let mut store = self.lock();
        let record = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("user {id}")))?;
        record.first_name.clone_from(&payload.first_name);
        record.last_name.clone_from(&payload.last_name);
        record.email = payload.email.to_string();
        record.role = payload.role;
        record.tenant = tenant;
        Ok(record.clone())
    }

    async fn create_tenant(&self, payload: &TenantPayload) -> Result<TenantRecord, ApiError> {
        self.record(ApiCall::CreateTenant(payload.clone()));
        self.take_mutation_failure()?;

        let mut store = self.lock();
        let next_id = store
            .tenants
            .iter()
            .map(|t| t.id.as_i32())
            .max()
            .unwrap_or(0)
            + 1;
        let record = TenantRecord {
            id: TenantId::new(next_id),
            name: payload.name.clone(),
            address: payload.address.clone(),
            created_at: None,
        };
        store.tenants.push(record.clone());
        Ok(record)
    }

    async fn update_tenant(
        &self,
        id: TenantId,
        payload: &TenantPayload,
    ) -> Result<TenantRecord, ApiError> {
        self.record(ApiCall::UpdateTenant(id, payload.clone()));
        self.take_mutation_failure()?;

        let mut store = self.lock();
        let record = store
            .tenants
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("tenant {id}")))?;
        record.name.clone_from(&payload.name);
        record.address.clone_from(&payload.address);
        Ok(record.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use backoffice_core::Role;

    use super::*;
    use crate::list::ListQuery;

    fn tenant(id: i32, name: &str) -> TenantRecord {
        TenantRecord {
            id: TenantId::new(id),
            name: name.to_string(),
            address: format!("{id} Main St"),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_who_am_i_follows_login_and_logout() {
        let admin = Principal::new(UserId::new(1), Role::Admin);
        let api = MemoryApi::new().with_account("root@pizza.example", "correct-horse", admin.clone());

        assert_eq!(api.who_am_i().await, Err(ApiError::Unauthorized));

        let wrong = Credentials::new("root@pizza.example", SecretString::from("nope"));
        assert_eq!(api.login(&wrong).await, Err(ApiError::Unauthorized));

        let right = Credentials::new("root@pizza.example", SecretString::from("correct-horse"));
        api.login(&right).await.unwrap();
        assert_eq!(api.who_am_i().await.unwrap(), admin);

        api.logout().await.unwrap();
        assert_eq!(api.who_am_i().await, Err(ApiError::Unauthorized));
        assert_eq!(api.count(|c| matches!(c, ApiCall::WhoAmI)), 3);
    }

    #[tokio::test]
    async fn test_list_tenants_searches_and_paginates() {
        let tenants = (1..=7).map(|i| tenant(i, &format!("Pizza {i}"))).collect();
        let api = MemoryApi::new().with_tenants(tenants);

        let request = ListQuery::new(3).with_page(3).to_request();
        let page = api.list_tenants(&request).await.unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, TenantId::new(7));

        let request = ListQuery::new(3).with_search(Some("pizza 2".to_string())).to_request();
        let page = api.list_tenants(&request).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_scripted_mutation_failure_is_consumed_once() {
        let api = MemoryApi::new();
        api.fail_next_mutation(ApiError::Transient("503".to_string()));
        let payload = TenantPayload {
            name: "Pizza Hut".to_string(),
            address: "X".to_string(),
        };

        assert!(api.create_tenant(&payload).await.is_err());
        let created = api.create_tenant(&payload).await.unwrap();
        assert_eq!(created.id, TenantId::new(1));
    }
}
