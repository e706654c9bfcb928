//! Prefix-based route classification.
//!
//! Classification is derived per request and never stored. The table is
//! built once at startup and is immutable afterwards.

use serde::Serialize;

/// Sensitivity tier of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTier {
    Public,
    /// Requires an authenticated session.
    Private,
    /// Administrative surface restricted to the `admin` role.
    AdminOnly,
    /// Administrative surface shared by `admin` and `moderator`.
    AdminShared,
}

impl RouteTier {
    pub fn is_admin(&self) -> bool {
        matches!(self, RouteTier::AdminOnly | RouteTier::AdminShared)
    }
}

/// Ordered `(prefix, tier)` table plus the auth-form paths.
///
/// The first matching prefix wins; unmatched paths are `Public`. Matching is a
/// plain string prefix test, so `/private` also covers `/privateer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<(String, RouteTier)>,
    auth_pages: Vec<String>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn classify(&self, path: &str) -> RouteTier {
        self.entries
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, tier)| *tier)
            .unwrap_or(RouteTier::Public)
    }

    /// Login/registration forms, matched exactly.
    pub fn is_auth_page(&self, path: &str) -> bool {
        self.auth_pages.iter().any(|p| p == path)
    }

    pub fn entries(&self) -> &[(String, RouteTier)] {
        &self.entries
    }
}

impl Default for RouteTable {
    /// The portal's route table.
    fn default() -> Self {
        RouteTable::builder()
            .route("/private", RouteTier::Private)
            .route("/admin/models", RouteTier::AdminOnly)
            .route("/admin/users", RouteTier::AdminOnly)
            .route("/admin", RouteTier::AdminShared)
            .auth_page("/login")
            .auth_page("/register")
            .build()
    }
}

#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<(String, RouteTier)>,
    auth_pages: Vec<String>,
}

impl RouteTableBuilder {
    /// Append a prefix rule. Put more specific prefixes first.
    pub fn route(mut self, prefix: impl Into<String>, tier: RouteTier) -> Self {
        self.entries.push((prefix.into(), tier));
        self
    }

    pub fn auth_page(mut self, path: impl Into<String>) -> Self {
        self.auth_pages.push(path.into());
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            entries: self.entries,
            auth_pages: self.auth_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_table_classifies_known_areas() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/"), RouteTier::Public);
        assert_eq!(table.classify("/login"), RouteTier::Public);
        assert_eq!(table.classify("/private/dashboard"), RouteTier::Private);
        assert_eq!(table.classify("/admin"), RouteTier::AdminShared);
        assert_eq!(table.classify("/admin/new-order"), RouteTier::AdminShared);
        assert_eq!(table.classify("/admin/models"), RouteTier::AdminOnly);
        assert_eq!(table.classify("/admin/models/42/options"), RouteTier::AdminOnly);
        assert_eq!(table.classify("/admin/users"), RouteTier::AdminOnly);
    }

    #[test]
    fn auth_pages_match_exactly() {
        let table = RouteTable::default();
        assert!(table.is_auth_page("/login"));
        assert!(table.is_auth_page("/register"));
        assert!(!table.is_auth_page("/login/"));
        assert!(!table.is_auth_page("/loginx"));
    }

    #[test]
    fn first_matching_prefix_wins() {
        let table = RouteTable::builder()
            .route("/admin", RouteTier::AdminShared)
            .route("/admin/models", RouteTier::AdminOnly)
            .build();
        assert_eq!(table.classify("/admin/models"), RouteTier::AdminShared);
    }

    proptest! {
        #[test]
        fn everything_under_private_is_private(rest in "[a-z0-9/_-]{0,40}") {
            let table = RouteTable::default();
            let path = format!("/private{rest}");
            prop_assert_eq!(table.classify(&path), RouteTier::Private);
        }

        #[test]
        fn paths_outside_private_and_admin_are_public(rest in "[a-z0-9/_-]{0,40}") {
            prop_assume!(!rest.starts_with("private") && !rest.starts_with("admin"));
            let table = RouteTable::default();
            let path = format!("/{rest}");
            prop_assert_eq!(table.classify(&path), RouteTier::Public);
        }
    }
}
