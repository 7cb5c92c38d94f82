//! Records of the two managed resource families.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{TenantId, UserId};
use super::role::Role;

/// The two managed entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    /// Accounts (`/users`).
    Users,
    /// Tenant organizations (`/tenants`).
    Tenants,
}

impl ResourceFamily {
    /// Collection path segment on the remote API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tenants => "tenants",
        }
    }
}

impl std::fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant reference embedded in an account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    pub id: TenantId,
    pub name: String,
}

/// An account as listed by `GET /users`.
///
/// `email` is kept as sent. Address rules apply to form input, not to
/// records the API already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub tenant: Option<TenantRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// First and last name joined for the list's name column.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A tenant organization (restaurant) as listed by `GET /tenants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Either kind of managed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    User(UserRecord),
    Tenant(TenantRecord),
}

impl Resource {
    /// Family the record belongs to.
    #[must_use]
    pub const fn family(&self) -> ResourceFamily {
        match self {
            Self::User(_) => ResourceFamily::Users,
            Self::Tenant(_) => ResourceFamily::Tenants,
        }
    }
}

impl From<UserRecord> for Resource {
    fn from(record: UserRecord) -> Self {
        Self::User(record)
    }
}

impl From<TenantRecord> for Resource {
    fn from(record: TenantRecord) -> Self {
        Self::Tenant(record)
    }
}
