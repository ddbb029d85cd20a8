//! Canonical roles and account kinds
//!
//! Stored role strings drifted between subsystems over time; they are mapped
//! to [`Role`] here and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role strings accepted as a coffee grower
pub const GROWER_ROLE_SYNONYMS: [&str; 5] =
    ["coffee_grower", "coffee-grower", "farmer", "user", "caficultor"];

/// Closed set of roles known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    CoffeeGrower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::CoffeeGrower => "coffee_grower",
        }
    }

    /// Position in the back-office hierarchy
    pub fn level(&self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::Moderator => 1,
            Role::CoffeeGrower => 0,
        }
    }

    pub fn is_grower(&self) -> bool {
        matches!(self, Role::CoffeeGrower)
    }

    /// Roles stored in the admin table
    pub fn is_back_office(&self) -> bool {
        !self.is_grower()
    }

    /// The account kind a role belongs to
    pub fn account_kind(&self) -> AccountKind {
        if self.is_grower() {
            AccountKind::Grower
        } else {
            AccountKind::Admin
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            s if GROWER_ROLE_SYNONYMS.contains(&s) => Ok(Role::CoffeeGrower),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Which family of accounts a credential belongs to; carried as the `kind` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Grower,
    Admin,
    Service,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Grower => "grower",
            AccountKind::Admin => "admin",
            AccountKind::Service => "service",
        }
    }

    /// Admin and service accounts both live in the admin table
    pub fn uses_admin_table(&self) -> bool {
        matches!(self, AccountKind::Admin | AccountKind::Service)
    }
}
