//! In-memory store for development and tests.
//!
//! One `RwLock` over the whole dataset gives `replace_*` and
//! `rotate_refresh_token` their atomicity. [`MemoryStore::set_unavailable`]
//! simulates an outage so degraded-path behavior is testable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Menu, Permission, RefreshToken, Role, RoleMenu, RolePermission, Tenant, User, UserMenu,
    UserPermission, UserRole,
};
use crate::store::{IdentityStore, Page, StoreError};

#[derive(Default)]
struct Inner {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    user_roles: Vec<UserRole>,
    permissions: HashMap<Uuid, Permission>,
    menus: HashMap<Uuid, Menu>,
    role_permissions: Vec<RolePermission>,
    user_permissions: Vec<UserPermission>,
    role_menus: Vec<RoleMenu>,
    user_menus: Vec<UserMenu>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`]
    /// until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_tenant_by_code(&self, tenant_code: &str) -> Result<Option<Tenant>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .tenants
            .values()
            .find(|t| t.tenant_code == tenant_code)
            .cloned())
    }

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, StoreError> {
        self.guard()?;
        Ok(self.read().tenants.get(&tenant_id).cloned())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.tenants.contains_key(&tenant.tenant_id)
            || inner
                .tenants
                .values()
                .any(|t| t.tenant_code == tenant.tenant_code)
        {
            return Err(StoreError::DuplicateKey(format!(
                "tenant {}",
                tenant.tenant_code
            )));
        }
        inner.tenants.insert(tenant.tenant_id, tenant.clone());
        Ok(())
    }

    async fn set_tenant_enabled(
        &self,
        tenant_id: Uuid,
        enabled: bool,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.tenants.get_mut(&tenant_id) {
            Some(tenant) => {
                tenant.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        self.guard()?;
        Ok(self.read().users.get(&user_id).cloned())
    }

    async fn find_user_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.users.contains_key(&user.user_id)
            || inner
                .users
                .values()
                .any(|u| u.tenant_id == user.tenant_id && u.username == user.username)
        {
            return Err(StoreError::DuplicateKey(format!("user {}", user.username)));
        }
        inner.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update_last_login(
        &self,
        user_id: Uuid,
        when: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.last_login_utc = Some(when);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_user_enabled(&self, user_id: Uuid, enabled: bool) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_role_by_id(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Role>, StoreError> {
        self.guard()?;
        Ok(self
            .read()
            .roles
            .get(&role_id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_roles_by_ids(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<Vec<Role>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(role_ids
            .iter()
            .filter_map(|id| inner.roles.get(id))
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.roles.contains_key(&role.role_id)
            || inner
                .roles
                .values()
                .any(|r| r.tenant_id == role.tenant_id && r.role_code == role.role_code)
        {
            return Err(StoreError::DuplicateKey(format!("role {}", role.role_code)));
        }
        inner.roles.insert(role.role_id, role.clone());
        Ok(())
    }

    async fn find_user_roles(&self, user_id: Uuid) -> Result<Vec<UserRole>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .user_roles
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_user_roles(
        &self,
        user_id: Uuid,
        assignments: Vec<UserRole>,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        inner.user_roles.retain(|a| a.user_id != user_id);
        inner.user_roles.extend(assignments);
        Ok(())
    }

    async fn find_permission_by_id(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<Option<Permission>, StoreError> {
        self.guard()?;
        Ok(self
            .read()
            .permissions
            .get(&permission_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_permission_by_code(
        &self,
        tenant_id: Uuid,
        perm_code: &str,
    ) -> Result<Option<Permission>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .permissions
            .values()
            .find(|p| p.tenant_id == tenant_id && p.perm_code == perm_code)
            .cloned())
    }

    async fn find_permissions_by_ids(
        &self,
        tenant_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<Vec<Permission>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(permission_ids
            .iter()
            .filter_map(|id| inner.permissions.get(id))
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_permissions_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Permission>, StoreError> {
        self.guard()?;
        let inner = self.read();
        let mut rows: Vec<Permission> = inner
            .permissions
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        // tree_path ordering puts parents directly before their subtrees
        rows.sort_by(|a, b| a.tree_path.cmp(&b.tree_path));
        Ok(rows)
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.permissions.contains_key(&permission.permission_id)
            || inner
                .permissions
                .values()
                .any(|p| p.tenant_id == permission.tenant_id && p.perm_code == permission.perm_code)
        {
            return Err(StoreError::DuplicateKey(format!(
                "permission {}",
                permission.perm_code
            )));
        }
        inner
            .permissions
            .insert(permission.permission_id, permission.clone());
        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.permissions.get_mut(&permission.permission_id) {
            Some(row) if row.tenant_id == permission.tenant_id => {
                *row = permission.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let exists = inner
            .permissions
            .get(&permission_id)
            .is_some_and(|p| p.tenant_id == tenant_id);
        if exists {
            inner.permissions.remove(&permission_id);
        }
        Ok(exists)
    }

    async fn count_permission_children(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<usize, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .permissions
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.parent_id == Some(permission_id))
            .count())
    }

    async fn move_permission_subtree(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
        new_parent_id: Option<Uuid>,
        level_delta: i32,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let exists = inner
            .permissions
            .get(&permission_id)
            .is_some_and(|p| p.tenant_id == tenant_id);
        if !exists {
            return Ok(false);
        }
        for row in inner.permissions.values_mut() {
            if row.tenant_id != tenant_id || !row.tree_path.starts_with(old_path) {
                continue;
            }
            row.tree_path = format!("{}{}", new_path, &row.tree_path[old_path.len()..]);
            row.level += level_delta;
        }
        if let Some(node) = inner.permissions.get_mut(&permission_id) {
            node.parent_id = new_parent_id;
        }
        Ok(true)
    }

    async fn find_menu_by_id(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
    ) -> Result<Option<Menu>, StoreError> {
        self.guard()?;
        Ok(self
            .read()
            .menus
            .get(&menu_id)
            .filter(|m| m.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_menus_by_ids(
        &self,
        tenant_id: Uuid,
        menu_ids: &[Uuid],
    ) -> Result<Vec<Menu>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(menu_ids
            .iter()
            .filter_map(|id| inner.menus.get(id))
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_menus_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Menu>, StoreError> {
        self.guard()?;
        let inner = self.read();
        let mut rows: Vec<Menu> = inner
            .menus
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.tree_path.cmp(&b.tree_path));
        Ok(rows)
    }

    async fn insert_menu(&self, menu: &Menu) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.menus.contains_key(&menu.menu_id) {
            return Err(StoreError::DuplicateKey(format!("menu {}", menu.menu_id)));
        }
        inner.menus.insert(menu.menu_id, menu.clone());
        Ok(())
    }

    async fn update_menu(&self, menu: &Menu) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.menus.get_mut(&menu.menu_id) {
            Some(row) if row.tenant_id == menu.tenant_id => {
                *row = menu.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_menu(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let exists = inner
            .menus
            .get(&menu_id)
            .is_some_and(|m| m.tenant_id == tenant_id);
        if exists {
            inner.menus.remove(&menu_id);
        }
        Ok(exists)
    }

    async fn count_menu_children(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
    ) -> Result<usize, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .menus
            .values()
            .filter(|m| m.tenant_id == tenant_id && m.parent_id == Some(menu_id))
            .count())
    }

    async fn move_menu_subtree(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
        new_parent_id: Option<Uuid>,
        level_delta: i32,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let exists = inner
            .menus
            .get(&menu_id)
            .is_some_and(|m| m.tenant_id == tenant_id);
        if !exists {
            return Ok(false);
        }
        for row in inner.menus.values_mut() {
            if row.tenant_id != tenant_id || !row.tree_path.starts_with(old_path) {
                continue;
            }
            row.tree_path = format!("{}{}", new_path, &row.tree_path[old_path.len()..]);
            row.level += level_delta;
        }
        if let Some(node) = inner.menus.get_mut(&menu_id) {
            node.parent_id = new_parent_id;
        }
        Ok(true)
    }

    async fn find_role_permission_grants(
        &self,
        role_ids: &[Uuid],
    ) -> Result<Vec<RolePermission>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .role_permissions
            .iter()
            .filter(|g| role_ids.contains(&g.role_id))
            .cloned()
            .collect())
    }

    async fn find_user_permission_grants(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserPermission>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .user_permissions
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        grants: Vec<RolePermission>,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        inner.role_permissions.retain(|g| g.role_id != role_id);
        inner.role_permissions.extend(grants);
        Ok(())
    }

    async fn replace_user_permissions(
        &self,
        user_id: Uuid,
        grants: Vec<UserPermission>,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        inner.user_permissions.retain(|g| g.user_id != user_id);
        inner.user_permissions.extend(grants);
        Ok(())
    }

    async fn find_role_menu_grants(
        &self,
        role_ids: &[Uuid],
    ) -> Result<Vec<RoleMenu>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .role_menus
            .iter()
            .filter(|g| role_ids.contains(&g.role_id))
            .cloned()
            .collect())
    }

    async fn find_user_menu_grants(&self, user_id: Uuid) -> Result<Vec<UserMenu>, StoreError> {
        self.guard()?;
        let inner = self.read();
        Ok(inner
            .user_menus
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_role_menus(
        &self,
        role_id: Uuid,
        grants: Vec<RoleMenu>,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        inner.role_menus.retain(|g| g.role_id != role_id);
        inner.role_menus.extend(grants);
        Ok(())
    }

    async fn replace_user_menus(
        &self,
        user_id: Uuid,
        grants: Vec<UserMenu>,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        inner.user_menus.retain(|g| g.user_id != user_id);
        inner.user_menus.extend(grants);
        Ok(())
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), StoreError> {
        self.guard()?;
        let mut inner = self.write();
        if inner.refresh_tokens.contains_key(&token.token_hash) {
            return Err(StoreError::DuplicateKey("refresh token".to_string()));
        }
        inner
            .refresh_tokens
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        self.guard()?;
        Ok(self.read().refresh_tokens.get(token_hash).cloned())
    }

    async fn rotate_refresh_token(
        &self,
        old_hash: &str,
        successor: RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let Some(old) = inner.refresh_tokens.get_mut(old_hash) else {
            return Ok(false);
        };
        if !old.is_active_at(now) {
            return Ok(false);
        }
        old.revoked_utc = Some(now);
        old.replaced_by_hash = Some(successor.token_hash.clone());
        inner
            .refresh_tokens
            .insert(successor.token_hash.clone(), successor);
        Ok(true)
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        replaced_by_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        match inner.refresh_tokens.get_mut(token_hash) {
            Some(row) if row.revoked_utc.is_none() => {
                row.revoked_utc = Some(now);
                if row.replaced_by_hash.is_none() {
                    row.replaced_by_hash = replaced_by_hash;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_refresh_tokens_for_user(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.guard()?;
        let mut inner = self.write();
        let mut revoked = 0;
        for row in inner.refresh_tokens.values_mut() {
            if row.user_id != user_id || row.revoked_utc.is_some() {
                continue;
            }
            if let Some(device) = device_id {
                if row.device_id.as_deref() != Some(device) {
                    continue;
                }
            }
            row.revoked_utc = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn list_refresh_tokens_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<RefreshToken>, StoreError> {
        self.guard()?;
        let inner = self.read();
        let mut rows: Vec<RefreshToken> = inner
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.issued_utc
                .cmp(&a.issued_utc)
                .then_with(|| a.token_hash.cmp(&b.token_hash))
        });
        Ok(rows.into_iter().skip(page.offset).take(page.limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_row(user_id: Uuid, raw: &str, now: DateTime<Utc>) -> RefreshToken {
        RefreshToken::new(
            raw,
            user_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            None,
            now,
            30,
        )
    }

    #[tokio::test]
    async fn rotation_retires_old_and_links_successor() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let old = token_row(user_id, "old", now);
        let old_hash = old.token_hash.clone();
        store.insert_refresh_token(&old).await.unwrap();

        let successor = token_row(user_id, "new", now);
        let successor_hash = successor.token_hash.clone();
        assert!(store
            .rotate_refresh_token(&old_hash, successor, now)
            .await
            .unwrap());

        let retired = store
            .find_refresh_token_by_hash(&old_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retired.revoked_utc, Some(now));
        assert_eq!(retired.replaced_by_hash, Some(successor_hash.clone()));

        let live = store
            .find_refresh_token_by_hash(&successor_hash)
            .await
            .unwrap()
            .unwrap();
        assert!(live.is_active_at(now));
    }

    #[tokio::test]
    async fn only_one_concurrent_rotation_wins() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let old = token_row(user_id, "contested", now);
        let old_hash = old.token_hash.clone();
        store.insert_refresh_token(&old).await.unwrap();

        let first = store.rotate_refresh_token(&old_hash, token_row(user_id, "winner", now), now);
        let second = store.rotate_refresh_token(&old_hash, token_row(user_id, "loser", now), now);
        let (first, second) = tokio::join!(first, second);

        assert_ne!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn expired_token_cannot_rotate() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let old = token_row(user_id, "stale", now - Duration::days(31));
        let old_hash = old.token_hash.clone();
        store.insert_refresh_token(&old).await.unwrap();

        assert!(!store
            .rotate_refresh_token(&old_hash, token_row(user_id, "new", now), now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_preserves_links() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let row = token_row(user_id, "session", now);
        let hash = row.token_hash.clone();
        store.insert_refresh_token(&row).await.unwrap();

        assert!(store.revoke_refresh_token(&hash, None, now).await.unwrap());
        // second revocation changes nothing
        assert!(!store
            .revoke_refresh_token(&hash, Some("late-link".to_string()), now + Duration::hours(1))
            .await
            .unwrap());

        let stored = store
            .find_refresh_token_by_hash(&hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.revoked_utc, Some(now));
        assert_eq!(stored.replaced_by_hash, None);
    }

    #[tokio::test]
    async fn device_scoped_revocation_spares_other_devices() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let mut phone = token_row(user_id, "phone", now);
        phone.device_id = Some("phone-1".to_string());
        let mut laptop = token_row(user_id, "laptop", now);
        laptop.device_id = Some("laptop-1".to_string());
        store.insert_refresh_token(&phone).await.unwrap();
        store.insert_refresh_token(&laptop).await.unwrap();

        let revoked = store
            .revoke_refresh_tokens_for_user(user_id, Some("phone-1"), now)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        let laptop_row = store
            .find_refresh_token_by_hash(&laptop.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert!(laptop_row.is_active_at(now));
    }

    #[tokio::test]
    async fn replace_role_permissions_is_total() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let role_id = Uuid::new_v4();
        let keep_role = Uuid::new_v4();

        store
            .replace_role_permissions(
                role_id,
                vec![
                    RolePermission::new(role_id, Uuid::new_v4(), None, now),
                    RolePermission::new(role_id, Uuid::new_v4(), None, now),
                ],
            )
            .await
            .unwrap();
        store
            .replace_role_permissions(
                keep_role,
                vec![RolePermission::new(keep_role, Uuid::new_v4(), None, now)],
            )
            .await
            .unwrap();

        let replacement = RolePermission::new(role_id, Uuid::new_v4(), None, now);
        store
            .replace_role_permissions(role_id, vec![replacement.clone()])
            .await
            .unwrap();

        let grants = store.find_role_permission_grants(&[role_id]).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].permission_id, replacement.permission_id);

        // other roles untouched
        let others = store
            .find_role_permission_grants(&[keep_role])
            .await
            .unwrap();
        assert_eq!(others.len(), 1);
    }

    #[tokio::test]
    async fn subtree_move_rewrites_paths_and_levels() {
        use crate::models::{Permission, PermissionType};

        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();

        let make = |parent: Option<&Permission>, code: &str| {
            Permission::new(
                tenant_id,
                parent,
                code.to_string(),
                code.to_string(),
                PermissionType::Directory,
                0,
                now,
            )
        };
        let old_root = make(None, "projects");
        let child = make(Some(&old_root), "projects.tasks");
        let grandchild = make(Some(&child), "projects.tasks.close");
        let new_root = make(None, "operations");
        for row in [&old_root, &child, &grandchild, &new_root] {
            store.insert_permission(row).await.unwrap();
        }

        // move `child` (and its subtree) under `new_root`
        let new_path = format!("{}{}/", new_root.tree_path, child.permission_id);
        assert!(store
            .move_permission_subtree(
                tenant_id,
                child.permission_id,
                Some(new_root.permission_id),
                0,
                &child.tree_path,
                &new_path,
            )
            .await
            .unwrap());

        let moved = store
            .find_permission_by_id(tenant_id, child.permission_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.parent_id, Some(new_root.permission_id));
        assert_eq!(moved.tree_path, new_path);

        let descendant = store
            .find_permission_by_id(tenant_id, grandchild.permission_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            descendant.tree_path,
            format!("{}{}/", new_path, grandchild.permission_id)
        );
        // untouched sibling keeps its path
        let untouched = store
            .find_permission_by_id(tenant_id, old_root.permission_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.tree_path, old_root.tree_path);

        // unknown node moves nothing
        assert!(!store
            .move_permission_subtree(tenant_id, Uuid::new_v4(), None, 0, "/x/", "/y/")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn role_lookups_are_tenant_scoped() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let role = Role::new(
            tenant_a,
            "FOREMAN".to_string(),
            "Site foreman".to_string(),
            crate::models::DataScope::Department,
            now,
        );
        store.insert_role(&role).await.unwrap();

        assert!(store
            .find_role_by_id(tenant_b, role.role_id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_roles_by_ids(tenant_b, &[role.role_id])
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .find_roles_by_ids(tenant_a, &[role.role_id])
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_user_by_id(Uuid::new_v4()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.find_user_by_id(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_username_in_tenant_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();

        let first = User::new(
            tenant_id,
            "alice".to_string(),
            "Alice".to_string(),
            "hash".to_string(),
            now,
        );
        store.insert_user(&first).await.unwrap();

        let twin = User::new(
            tenant_id,
            "alice".to_string(),
            "Other Alice".to_string(),
            "hash".to_string(),
            now,
        );
        assert!(matches!(
            store.insert_user(&twin).await,
            Err(StoreError::DuplicateKey(_))
        ));

        // same username under another tenant is fine
        let other_tenant = User::new(
            Uuid::new_v4(),
            "alice".to_string(),
            "Unrelated Alice".to_string(),
            "hash".to_string(),
            now,
        );
        assert!(store.insert_user(&other_tenant).await.is_ok());
    }
}
