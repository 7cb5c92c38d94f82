//! Backoffice Console library.
//!
//! Client-side logic of the backoffice admin console, independent of any
//! rendering layer:
//!
//! - [`session`] - one-time identity probe with retry, login and logout
//! - [`guard`] - route guards over the session
//! - [`list`] - paginated, filterable, searchable resource lists
//! - [`mutation`] - create/update with list invalidation
//! - [`form`] - create-vs-edit side-panel forms
//!
//! Everything talks to the remote API through [`api::ConsoleApi`].
//!
//! # Flow
//!
//! Bootstrap resolves the session once at startup. Guards consult it on
//! every navigation. A mounted [`list::ListController`] fetches pages for
//! its [`list::ListQuery`]; a [`form::FormLifecycle`] submits through a
//! [`mutation::MutationCoordinator`], whose invalidation makes the list
//! refetch with its current query.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod family;
pub mod form;
pub mod guard;
pub mod list;
pub mod mutation;
pub mod session;
pub mod telemetry;

pub use api::{ApiError, ConsoleApi, Credentials, HttpApi};
pub use config::{ConfigError, ConsoleConfig};
pub use error::{ConsoleError, FieldErrors};
pub use family::{Family, Tenants, Users};
pub use form::{FormLifecycle, FormMode, TenantForm, UserForm};
pub use guard::{Navigation, Route, resolve};
pub use list::{ListController, ListQuery, ListState, ShowingRange};
pub use mutation::{InvalidationBus, MutationCoordinator};
pub use session::{RetryPolicy, SessionContext, SessionStatus};
