use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use portal_core::ValueError;

/// Administrative role held by a user.
///
/// Stored as independent rows keyed by user id; a user may hold none, one or
/// both. There is no implied hierarchy between the two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Moderator,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            other => Err(ValueError::UnknownRole(other.to_string())),
        }
    }
}

/// The set of roles held by one user: the union of its role rows.
///
/// An empty set is a valid answer ("no roles"), not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(HashSet<Role>);

impl RoleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Role::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        self.contains(Role::Moderator)
    }

    /// Holds at least one recognized administrative role.
    pub fn has_admin_access(&self) -> bool {
        self.is_admin() || self.is_moderator()
    }

    /// Role names in a stable order, for logs and JSON bodies.
    pub fn names(&self) -> Vec<&'static str> {
        Role::ALL
            .iter()
            .filter(|r| self.contains(**r))
            .map(|r| r.as_str())
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}
