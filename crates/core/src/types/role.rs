//! Role and account status enums.

use serde::{Deserialize, Serialize};

/// Role of an account, as assigned by the remote API.
///
/// Only `Admin` and `Manager` may sign in to the console; `Admin` is the
/// only role allowed on the account and tenant management pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including account and tenant management.
    Admin,
    /// Operates a single tenant.
    Manager,
    /// Storefront customer; never allowed into the console.
    Customer,
}

impl Role {
    /// All roles, in the order the role filter lists them.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Manager, Self::Customer];

    /// Wire value of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Customer => "customer",
        }
    }

    /// Whether principals with this role may use the console at all.
    #[must_use]
    pub const fn can_use_console(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Account status used by the account list's status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Ban,
}

impl UserStatus {
    /// All statuses, in the order the status filter lists them.
    pub const ALL: [Self; 2] = [Self::Ban, Self::Active];

    /// Wire value of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ban => "ban",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "ban" => Ok(Self::Ban),
            _ => Err(format!("invalid status: {s}")),
        }
    }
}
