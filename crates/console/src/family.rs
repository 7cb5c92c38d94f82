//! Resource families: the glue between a record type, its API calls, its
//! table definition and its form.
//!
//! The list controller, mutation coordinator and form lifecycle are generic
//! over [`Family`], so accounts and tenants share one implementation.

use std::fmt;
use std::future::Future;

use backoffice_core::{ResourceFamily, TenantId, TenantRecord, UserId, UserRecord};

use crate::api::{ApiError, ConsoleApi, ListPage, TenantPayload, UserPayload};
use crate::components::DataTableConfig;
use crate::components::data_table::{tenants_table_config, users_table_config};
use crate::form::{FormValues, TenantForm, UserForm};
use crate::list::ListRequest;

/// A managed resource family.
pub trait Family: Send + Sync + 'static {
    /// Identity used to scope list invalidation.
    const FAMILY: ResourceFamily;

    type Id: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Record: Clone + fmt::Debug + Send + Sync + 'static;
    type Payload: fmt::Debug + Send + Sync + 'static;
    type Form: FormValues<Record = Self::Record, Payload = Self::Payload>;

    /// Table definition for the family's list page.
    fn table() -> DataTableConfig;

    fn record_id(record: &Self::Record) -> Self::Id;

    fn list<A: ConsoleApi>(
        api: &A,
        request: &ListRequest,
    ) -> impl Future<Output = Result<ListPage<Self::Record>, ApiError>> + Send;

    fn create<A: ConsoleApi>(
        api: &A,
        payload: &Self::Payload,
    ) -> impl Future<Output = Result<Self::Record, ApiError>> + Send;

    fn update<A: ConsoleApi>(
        api: &A,
        id: Self::Id,
        payload: &Self::Payload,
    ) -> impl Future<Output = Result<Self::Record, ApiError>> + Send;
}

/// Accounts.
#[derive(Debug, Clone, Copy)]
pub struct Users;

/// Tenant organizations (restaurants).
#[derive(Debug, Clone, Copy)]
pub struct Tenants;

impl Family for Users {
    const FAMILY: ResourceFamily = ResourceFamily::Users;

    type Id = UserId;
    type Record = UserRecord;
    type Payload = UserPayload;
    type Form = UserForm;

    fn table() -> DataTableConfig {
        users_table_config()
    }

    fn record_id(record: &UserRecord) -> UserId {
        record.id
    }

    fn list<A: ConsoleApi>(
        api: &A,
        request: &ListRequest,
    ) -> impl Future<Output = Result<ListPage<UserRecord>, ApiError>> + Send {
        api.list_users(request)
    }

    fn create<A: ConsoleApi>(
        api: &A,
        payload: &UserPayload,
    ) -> impl Future<Output = Result<UserRecord, ApiError>> + Send {
        api.create_user(payload)
    }

    fn update<A: ConsoleApi>(
        api: &A,
        id: UserId,
        payload: &UserPayload,
    ) -> impl Future<Output = Result<UserRecord, ApiError>> + Send {
        api.update_user(id, payload)
    }
}

impl Family for Tenants {
    const FAMILY: ResourceFamily = ResourceFamily::Tenants;

    type Id = TenantId;
    type Record = TenantRecord;
    type Payload = TenantPayload;
    type Form = TenantForm;

    fn table() -> DataTableConfig {
        tenants_table_config()
    }

    fn record_id(record: &TenantRecord) -> TenantId {
        record.id
    }

    fn list<A: ConsoleApi>(
        api: &A,
        request: &ListRequest,
    ) -> impl Future<Output = Result<ListPage<TenantRecord>, ApiError>> + Send {
        api.list_tenants(request)
    }

    fn create<A: ConsoleApi>(
        api: &A,
        payload: &TenantPayload,
    ) -> impl Future<Output = Result<TenantRecord, ApiError>> + Send {
        api.create_tenant(payload)
    }

    fn update<A: ConsoleApi>(
        api: &A,
        id: TenantId,
        payload: &TenantPayload,
    ) -> impl Future<Output = Result<TenantRecord, ApiError>> + Send {
        api.update_tenant(id, payload)
    }
}
