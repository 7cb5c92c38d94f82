//! Core types for the backoffice console.
//!
//! This module provides type-safe wrappers for the console's domain concepts.

pub mod email;
pub mod id;
pub mod principal;
pub mod resource;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use principal::Principal;
pub use resource::{Resource, ResourceFamily, TenantRecord, TenantRef, UserRecord};
pub use role::{Role, UserStatus};
