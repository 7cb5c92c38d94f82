//! The authenticated identity returned by the identity probe.

use serde::{Deserialize, Serialize};

use super::id::{TenantId, UserId};
use super::role::Role;

/// Authenticated identity with a role and an optional tenant affiliation.
///
/// Immutable once fetched; a re-login replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Principal {
    /// Principal with only the fields the guards need.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            tenant_id: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Attach a tenant affiliation.
    #[must_use]
    pub const fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Display name, falling back to the id when the API sent no names.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => format!("user #{}", self.id),
        }
    }
}
