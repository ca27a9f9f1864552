//! Effective permission resolution.
//!
//! The effective set is the union of role-level and user-level grants that
//! are active right now, joined against enabled catalog rows, plus whatever
//! the admin policy implies from role codes. Two entry points serve two
//! failure postures: display surfaces degrade to a fallback set, permission
//! checks fail closed.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use service_core::clock::Clock;
use tracing::warn;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::services::error::ServiceError;
use crate::services::policy::AdminPolicy;
use crate::store::IdentityStore;

#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    policy: AdminPolicy,
    fallback: BTreeSet<String>,
}

impl PermissionResolver {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        policy: AdminPolicy,
        fallback_permissions: Vec<String>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            fallback: fallback_permissions.into_iter().collect(),
        }
    }

    /// Permission set for display surfaces (login payloads, profile pages).
    /// Never errors: resolution failure serves the minimal fallback set so a
    /// grant-table hiccup cannot lock users out of the shell.
    pub async fn resolve(&self, user_id: Uuid) -> BTreeSet<String> {
        match self.try_resolve(user_id).await {
            Ok(codes) => codes,
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    error = %err,
                    "permission resolution failed, serving fallback set"
                );
                self.fallback.clone()
            }
        }
    }

    /// Permission set for enforcement. Errors propagate so checks fail
    /// closed instead of silently widening access.
    pub async fn try_resolve(&self, user_id: Uuid) -> Result<BTreeSet<String>, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let roles = self.active_roles(&user).await?;
        let now = self.clock.now();

        let role_ids: Vec<Uuid> = roles.iter().map(|r| r.role_id).collect();
        let mut permission_ids: HashSet<Uuid> = HashSet::new();
        for grant in self.store.find_role_permission_grants(&role_ids).await? {
            if grant.is_active_at(now) {
                permission_ids.insert(grant.permission_id);
            }
        }
        for grant in self.store.find_user_permission_grants(user_id).await? {
            if grant.is_active_at(now) {
                permission_ids.insert(grant.permission_id);
            }
        }

        let ids: Vec<Uuid> = permission_ids.into_iter().collect();
        let rows = self.store.find_permissions_by_ids(user.tenant_id, &ids).await?;
        let mut codes: BTreeSet<String> = rows
            .into_iter()
            .filter(|p| p.status.is_enabled())
            .map(|p| p.perm_code)
            .collect();

        for role in &roles {
            if let Some(implied) = self.policy.implied_permission(&role.role_code) {
                codes.insert(implied.to_string());
            }
        }

        Ok(codes)
    }

    /// Does the user hold this permission? Fails closed.
    pub async fn check(&self, user_id: Uuid, permission: &str) -> bool {
        match self.try_resolve(user_id).await {
            Ok(codes) => Self::satisfies(&codes, permission),
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    permission,
                    error = %err,
                    "permission check failed closed"
                );
                false
            }
        }
    }

    /// Does the user hold at least one of these? Empty input is false.
    pub async fn check_any(&self, user_id: Uuid, permissions: &[&str]) -> bool {
        match self.try_resolve(user_id).await {
            Ok(codes) => permissions.iter().any(|p| Self::satisfies(&codes, p)),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "permission check failed closed");
                false
            }
        }
    }

    /// Does the user hold all of these? Empty input is vacuously true.
    pub async fn check_all(&self, user_id: Uuid, permissions: &[&str]) -> bool {
        match self.try_resolve(user_id).await {
            Ok(codes) => permissions.iter().all(|p| Self::satisfies(&codes, p)),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "permission check failed closed");
                false
            }
        }
    }

    fn satisfies(codes: &BTreeSet<String>, permission: &str) -> bool {
        codes.contains("*") || codes.contains(permission)
    }

    /// The set served when resolution degrades.
    pub(crate) fn fallback_set(&self) -> BTreeSet<String> {
        self.fallback.clone()
    }

    /// Roles behind the user's active membership rows, loaded tenant-scoped.
    pub(crate) async fn active_roles(&self, user: &User) -> Result<Vec<Role>, ServiceError> {
        let assignments = self.store.find_user_roles(user.user_id).await?;
        let role_ids: Vec<Uuid> = assignments
            .iter()
            .filter(|a| a.is_active())
            .map(|a| a.role_id)
            .collect();
        Ok(self.store.find_roles_by_ids(user.tenant_id, &role_ids).await?)
    }
}
