//! Collaborator wiring: which identity backend and role store back the
//! pipeline.

use std::sync::Arc;

use anyhow::Context;

use portal_auth::{IdentityBackend, Role, RoleStore, RouteTable};
use portal_infra::{
    GoTrueIdentityBackend, InMemoryRoleStore, LocalIdentityBackend, PostgresRoleStore,
};

use crate::config::{DevAdmin, IdentityConfig, PortalConfig};
use crate::cookies::CookieSettings;

const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

pub struct PortalServices {
    pub identity: Arc<dyn IdentityBackend>,
    pub roles: Arc<dyn RoleStore>,
    pub routes: RouteTable,
    pub cookies: CookieSettings,
    /// Origin used to build the OAuth callback URL.
    pub public_url: String,
}

impl PortalServices {
    /// Default route table and cookie settings around the given collaborators.
    pub fn new(identity: Arc<dyn IdentityBackend>, roles: Arc<dyn RoleStore>) -> Self {
        Self {
            identity,
            roles,
            routes: RouteTable::default(),
            cookies: CookieSettings::default(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
        }
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into();
        self
    }

    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }
}

pub async fn build_services(config: &PortalConfig) -> anyhow::Result<PortalServices> {
    let memory_roles = Arc::new(InMemoryRoleStore::new());
    let roles: Arc<dyn RoleStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresRoleStore::connect(url)
                .await
                .context("failed to connect role store")?;
            tracing::info!("role store: postgres");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory role store");
            memory_roles.clone()
        }
    };

    let identity: Arc<dyn IdentityBackend> = match &config.identity {
        IdentityConfig::GoTrue { url, api_key } => {
            tracing::info!(url = %url, "identity backend: gotrue");
            if config.dev_admin.is_some() {
                tracing::warn!("dev admin is only seeded with the local identity backend");
            }
            Arc::new(
                GoTrueIdentityBackend::new(url, api_key.clone())
                    .context("invalid identity backend url")?,
            )
        }
        IdentityConfig::Local { jwt_secret } => {
            tracing::info!("identity backend: local");
            if config.identity.uses_insecure_secret() {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
            }
            let backend = LocalIdentityBackend::new(jwt_secret.as_bytes());
            if let Some(admin) = &config.dev_admin {
                if config.database_url.is_some() {
                    tracing::warn!("dev admin role is only seeded into the in-memory role store");
                } else {
                    seed_dev_admin(&backend, &memory_roles, admin)?;
                }
            }
            Arc::new(backend)
        }
    };

    Ok(PortalServices {
        identity,
        roles,
        routes: RouteTable::default(),
        cookies: CookieSettings {
            secure: config.secure_cookies,
        },
        public_url: config.public_url.clone(),
    })
}

fn seed_dev_admin(
    identity: &LocalIdentityBackend,
    roles: &InMemoryRoleStore,
    admin: &DevAdmin,
) -> anyhow::Result<()> {
    let user = identity
        .create_user(
            &admin.email,
            &admin.password,
            serde_json::json!({ "name": "Administrator" }),
        )
        .context("failed to create dev admin")?;
    roles
        .assign(user.id, Role::Admin)
        .context("failed to grant dev admin role")?;
    tracing::info!(user_id = %user.id, email = %admin.email, "seeded dev admin");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> PortalConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn local_setup_seeds_dev_admin_with_admin_role() {
        let cfg = config(&[
            ("PORTAL_DEV_ADMIN_EMAIL", "root@example.com"),
            ("PORTAL_DEV_ADMIN_PASSWORD", "correct horse"),
        ]);
        let services = build_services(&cfg).await.unwrap();

        let (_, user) = services
            .identity
            .sign_in_with_password("root@example.com", "correct horse")
            .await
            .unwrap();
        let roles = services.roles.get_roles(user.id).await.unwrap();
        assert!(roles.is_admin());
    }

    #[tokio::test]
    async fn callback_url_is_built_from_public_url() {
        let cfg = config(&[("PORTAL_PUBLIC_URL", "https://portal.example.com/")]);
        let services = build_services(&cfg).await.unwrap();
        assert_eq!(
            services.callback_url(),
            "https://portal.example.com/auth/callback"
        );
    }
}
