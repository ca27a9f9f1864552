//! Storage abstraction for the identity subsystem.
//!
//! [`IdentityStore`] is the only seam the services see; backends decide how
//! rows persist. Multi-row mutations (`replace_*`, `rotate_refresh_token`)
//! are atomic: concurrent readers observe the old set or the new set, never
//! a mix. Reads of tenant-owned rows always take the tenant id; rows keyed
//! by user or role lean on the subject being bound to one tenant already.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Menu, Permission, RefreshToken, Role, RoleMenu, RolePermission, Tenant, User, UserMenu,
    UserPermission, UserRole,
};

pub mod memory;

pub use memory::MemoryStore;

/// Failure surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Offset/limit window for history listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    // --- tenants ---

    async fn find_tenant_by_code(&self, tenant_code: &str) -> Result<Option<Tenant>, StoreError>;

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, StoreError>;

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), StoreError>;

    async fn set_tenant_enabled(&self, tenant_id: Uuid, enabled: bool)
        -> Result<bool, StoreError>;

    // --- users ---

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Stamp the user's last successful login. Returns false when the user
    /// no longer exists.
    async fn update_last_login(
        &self,
        user_id: Uuid,
        when: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    async fn set_user_enabled(&self, user_id: Uuid, enabled: bool) -> Result<bool, StoreError>;

    // --- roles and role membership ---

    async fn find_role_by_id(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Role>, StoreError>;

    /// Roles matching both the tenant and the id list. Ids from other
    /// tenants simply do not come back.
    async fn find_roles_by_ids(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<Vec<Role>, StoreError>;

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError>;

    async fn find_user_roles(&self, user_id: Uuid) -> Result<Vec<UserRole>, StoreError>;

    /// Atomically replace the user's role memberships with exactly this set.
    async fn replace_user_roles(
        &self,
        user_id: Uuid,
        assignments: Vec<UserRole>,
    ) -> Result<(), StoreError>;

    // --- permission catalog ---

    async fn find_permission_by_id(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<Option<Permission>, StoreError>;

    async fn find_permission_by_code(
        &self,
        tenant_id: Uuid,
        perm_code: &str,
    ) -> Result<Option<Permission>, StoreError>;

    async fn find_permissions_by_ids(
        &self,
        tenant_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<Vec<Permission>, StoreError>;

    async fn find_permissions_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Permission>, StoreError>;

    async fn insert_permission(&self, permission: &Permission) -> Result<(), StoreError>;

    async fn update_permission(&self, permission: &Permission) -> Result<bool, StoreError>;

    async fn delete_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, StoreError>;

    async fn count_permission_children(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<usize, StoreError>;

    /// Reparent a node and shift its whole subtree in one atomic step: the
    /// node takes `new_parent_id`, and every row whose `tree_path` starts
    /// with `old_path` has that prefix swapped for `new_path` and its level
    /// adjusted by `level_delta`. Returns false when the node is missing.
    async fn move_permission_subtree(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
        new_parent_id: Option<Uuid>,
        level_delta: i32,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, StoreError>;

    // --- menu catalog ---

    async fn find_menu_by_id(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
    ) -> Result<Option<Menu>, StoreError>;

    async fn find_menus_by_ids(
        &self,
        tenant_id: Uuid,
        menu_ids: &[Uuid],
    ) -> Result<Vec<Menu>, StoreError>;

    async fn find_menus_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Menu>, StoreError>;

    async fn insert_menu(&self, menu: &Menu) -> Result<(), StoreError>;

    async fn update_menu(&self, menu: &Menu) -> Result<bool, StoreError>;

    async fn delete_menu(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<bool, StoreError>;

    async fn count_menu_children(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
    ) -> Result<usize, StoreError>;

    /// Menu counterpart of [`IdentityStore::move_permission_subtree`].
    async fn move_menu_subtree(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
        new_parent_id: Option<Uuid>,
        level_delta: i32,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, StoreError>;

    // --- grants ---

    /// All permission grant rows for the given roles, regardless of status
    /// or window. Services filter for activity.
    async fn find_role_permission_grants(
        &self,
        role_ids: &[Uuid],
    ) -> Result<Vec<RolePermission>, StoreError>;

    async fn find_user_permission_grants(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserPermission>, StoreError>;

    /// Atomically replace the role's permission grants with exactly this set.
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        grants: Vec<RolePermission>,
    ) -> Result<(), StoreError>;

    async fn replace_user_permissions(
        &self,
        user_id: Uuid,
        grants: Vec<UserPermission>,
    ) -> Result<(), StoreError>;

    async fn find_role_menu_grants(&self, role_ids: &[Uuid])
        -> Result<Vec<RoleMenu>, StoreError>;

    async fn find_user_menu_grants(&self, user_id: Uuid) -> Result<Vec<UserMenu>, StoreError>;

    async fn replace_role_menus(
        &self,
        role_id: Uuid,
        grants: Vec<RoleMenu>,
    ) -> Result<(), StoreError>;

    async fn replace_user_menus(
        &self,
        user_id: Uuid,
        grants: Vec<UserMenu>,
    ) -> Result<(), StoreError>;

    // --- refresh tokens ---

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), StoreError>;

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError>;

    /// Single-use exchange: if the old row is live at `now`, mark it revoked,
    /// link it to the successor, and insert the successor, all in one step.
    /// Returns false when the old row is missing, already revoked, or
    /// expired; exactly one of two concurrent callers can see true.
    async fn rotate_refresh_token(
        &self,
        old_hash: &str,
        successor: RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Mark one token revoked. Idempotent: returns false when the row is
    /// unknown or already revoked, and never overwrites an existing
    /// revocation or successor link.
    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        replaced_by_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Revoke every live token for the user, optionally narrowed to one
    /// device. Returns how many rows changed.
    async fn revoke_refresh_tokens_for_user(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Session history for the user, newest first.
    async fn list_refresh_tokens_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<RefreshToken>, StoreError>;
}
