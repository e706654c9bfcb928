use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use portal_auth::{Role, RoleSet, RoleStore, RoleStoreError};
use portal_core::UserId;

/// In-memory role rows for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    inner: RwLock<HashMap<UserId, HashSet<Role>>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role row. Returns `false` if the user already held the role.
    pub fn assign(&self, user_id: UserId, role: Role) -> Result<bool, RoleStoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| RoleStoreError::Unavailable("role map poisoned".into()))?;
        Ok(map.entry(user_id).or_default().insert(role))
    }

    /// Remove a role row. Returns `false` if the user did not hold the role.
    pub fn revoke(&self, user_id: UserId, role: Role) -> Result<bool, RoleStoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| RoleStoreError::Unavailable("role map poisoned".into()))?;
        let removed = map.get_mut(&user_id).is_some_and(|roles| roles.remove(&role));
        if map.get(&user_id).is_some_and(HashSet::is_empty) {
            map.remove(&user_id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get_roles(&self, user_id: UserId) -> Result<RoleSet, RoleStoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| RoleStoreError::Unavailable("role map poisoned".into()))?;
        Ok(map
            .get(&user_id)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_has_no_roles() {
        let store = InMemoryRoleStore::new();
        assert!(store.get_roles(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn roles_are_the_union_of_rows() {
        let store = InMemoryRoleStore::new();
        let user = UserId::new();

        assert!(store.assign(user, Role::Moderator).unwrap());
        assert!(store.assign(user, Role::Admin).unwrap());
        assert!(!store.assign(user, Role::Admin).unwrap());

        let roles = store.get_roles(user).await.unwrap();
        assert!(roles.is_admin() && roles.is_moderator());
        assert_eq!(roles.len(), 2);
    }

    #[tokio::test]
    async fn revoke_removes_a_single_row() {
        let store = InMemoryRoleStore::new();
        let user = UserId::new();
        store.assign(user, Role::Admin).unwrap();
        store.assign(user, Role::Moderator).unwrap();

        assert!(store.revoke(user, Role::Admin).unwrap());
        assert!(!store.revoke(user, Role::Admin).unwrap());

        let roles = store.get_roles(user).await.unwrap();
        assert_eq!(roles.names(), vec!["moderator"]);
    }
}
