//! Catalog service - administration of permission and menu definitions.
//!
//! Catalog rows are what grants point at. Deleting a row does not touch
//! grant rows that reference it; resolution joins grants back to the
//! catalog by id, so orphaned grants simply stop contributing.

use std::sync::Arc;

use service_core::clock::Clock;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    CreateMenuRequest, CreatePermissionRequest, Menu, Permission, UpdateMenuRequest,
    UpdatePermissionRequest,
};
use crate::services::error::ServiceError;
use crate::store::{IdentityStore, StoreError};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn IdentityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // --- permissions ---

    pub async fn create_permission(
        &self,
        request: CreatePermissionRequest,
    ) -> Result<Permission, ServiceError> {
        request.validate()?;

        if self
            .store
            .find_permission_by_code(request.tenant_id, &request.perm_code)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Permission code '{}' already exists",
                request.perm_code
            )));
        }

        let parent = match request.parent_id {
            Some(parent_id) => Some(
                self.store
                    .find_permission_by_id(request.tenant_id, parent_id)
                    .await?
                    .ok_or(ServiceError::PermissionNotFound)?,
            ),
            None => None,
        };

        let mut permission = Permission::new(
            request.tenant_id,
            parent.as_ref(),
            request.perm_code,
            request.perm_label,
            request.perm_type,
            request.sort_order,
            self.clock.now(),
        );
        if let Some(status) = request.status {
            permission.status = status;
        }

        self.store
            .insert_permission(&permission)
            .await
            .map_err(conflict_on_duplicate)?;

        tracing::info!(
            permission_id = %permission.permission_id,
            perm_code = %permission.perm_code,
            tenant_id = %permission.tenant_id,
            "permission created"
        );
        Ok(permission)
    }

    /// Update label, ordering, or status. The code is immutable once
    /// created; the parent link changes through [`Self::move_permission`].
    pub async fn update_permission(
        &self,
        request: UpdatePermissionRequest,
    ) -> Result<Permission, ServiceError> {
        request.validate()?;

        let mut permission = self
            .store
            .find_permission_by_id(request.tenant_id, request.permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)?;

        if let Some(perm_label) = request.perm_label {
            permission.perm_label = perm_label;
        }
        if let Some(sort_order) = request.sort_order {
            permission.sort_order = sort_order;
        }
        if let Some(status) = request.status {
            permission.status = status;
        }

        let updated = self.store.update_permission(&permission).await?;
        if !updated {
            return Err(ServiceError::PermissionNotFound);
        }

        tracing::info!(
            permission_id = %permission.permission_id,
            perm_code = %permission.perm_code,
            "permission updated"
        );
        Ok(permission)
    }

    /// Move a node, subtree and all, under a new parent (or to the root
    /// when `new_parent_id` is None). Every descendant's level and tree
    /// path are recomputed in the same atomic step.
    pub async fn move_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<Permission, ServiceError> {
        let node = self
            .store
            .find_permission_by_id(tenant_id, permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)?;
        if node.parent_id == new_parent_id {
            return Ok(node);
        }

        let new_parent = match new_parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_permission_by_id(tenant_id, parent_id)
                    .await?
                    .ok_or(ServiceError::PermissionNotFound)?;
                if parent.permission_id == node.permission_id || parent.is_descendant_of(&node) {
                    return Err(ServiceError::Validation(
                        "Cannot move a permission into its own subtree".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let (level, tree_path) = match &new_parent {
            Some(p) => (
                p.level + 1,
                format!("{}{}/", p.tree_path, node.permission_id),
            ),
            None => (1, format!("/{}/", node.permission_id)),
        };
        let moved = self
            .store
            .move_permission_subtree(
                tenant_id,
                node.permission_id,
                new_parent_id,
                level - node.level,
                &node.tree_path,
                &tree_path,
            )
            .await?;
        if !moved {
            return Err(ServiceError::PermissionNotFound);
        }

        tracing::info!(
            permission_id = %node.permission_id,
            perm_code = %node.perm_code,
            "permission moved"
        );
        self.store
            .find_permission_by_id(tenant_id, node.permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)
    }

    pub async fn delete_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), ServiceError> {
        let permission = self
            .store
            .find_permission_by_id(tenant_id, permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)?;

        if permission.is_system {
            return Err(ServiceError::Validation(
                "System permissions cannot be deleted".to_string(),
            ));
        }

        let children = self
            .store
            .count_permission_children(tenant_id, permission_id)
            .await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Permission '{}' has {} child nodes; delete them first",
                permission.perm_code, children
            )));
        }

        let deleted = self.store.delete_permission(tenant_id, permission_id).await?;
        if !deleted {
            return Err(ServiceError::PermissionNotFound);
        }

        tracing::info!(
            permission_id = %permission_id,
            perm_code = %permission.perm_code,
            "permission deleted"
        );
        Ok(())
    }

    /// Full catalog for the tenant, in tree order (parents before their
    /// subtrees).
    pub async fn list_permission_catalog(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Permission>, ServiceError> {
        self.store
            .find_permissions_by_tenant(tenant_id)
            .await
            .map_err(Into::into)
    }

    // --- menus ---

    pub async fn create_menu(&self, request: CreateMenuRequest) -> Result<Menu, ServiceError> {
        request.validate()?;

        let parent = match request.parent_id {
            Some(parent_id) => Some(
                self.store
                    .find_menu_by_id(request.tenant_id, parent_id)
                    .await?
                    .ok_or(ServiceError::MenuNotFound)?,
            ),
            None => None,
        };

        let mut menu = Menu::new(
            request.tenant_id,
            parent.as_ref(),
            request.menu_label,
            request.route_path,
            request.sort_order,
            self.clock.now(),
        );
        menu.component = request.component;
        menu.icon = request.icon;
        menu.perm_code = request.perm_code;
        menu.visible = request.visible;
        if let Some(status) = request.status {
            menu.status = status;
        }

        self.store
            .insert_menu(&menu)
            .await
            .map_err(conflict_on_duplicate)?;

        tracing::info!(
            menu_id = %menu.menu_id,
            menu_label = %menu.menu_label,
            tenant_id = %menu.tenant_id,
            "menu created"
        );
        Ok(menu)
    }

    /// Update presentation fields or status. The parent link changes
    /// through [`Self::move_menu`].
    pub async fn update_menu(&self, request: UpdateMenuRequest) -> Result<Menu, ServiceError> {
        request.validate()?;

        let mut menu = self
            .store
            .find_menu_by_id(request.tenant_id, request.menu_id)
            .await?
            .ok_or(ServiceError::MenuNotFound)?;

        if let Some(menu_label) = request.menu_label {
            menu.menu_label = menu_label;
        }
        if let Some(route_path) = request.route_path {
            menu.route_path = route_path;
        }
        if let Some(component) = request.component {
            menu.component = Some(component);
        }
        if let Some(icon) = request.icon {
            menu.icon = Some(icon);
        }
        if let Some(perm_code) = request.perm_code {
            menu.perm_code = Some(perm_code);
        }
        if let Some(sort_order) = request.sort_order {
            menu.sort_order = sort_order;
        }
        if let Some(visible) = request.visible {
            menu.visible = visible;
        }
        if let Some(status) = request.status {
            menu.status = status;
        }

        let updated = self.store.update_menu(&menu).await?;
        if !updated {
            return Err(ServiceError::MenuNotFound);
        }

        tracing::info!(menu_id = %menu.menu_id, menu_label = %menu.menu_label, "menu updated");
        Ok(menu)
    }

    /// Menu counterpart of [`Self::move_permission`].
    pub async fn move_menu(
        &self,
        tenant_id: Uuid,
        menu_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<Menu, ServiceError> {
        let node = self
            .store
            .find_menu_by_id(tenant_id, menu_id)
            .await?
            .ok_or(ServiceError::MenuNotFound)?;
        if node.parent_id == new_parent_id {
            return Ok(node);
        }

        let new_parent = match new_parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_menu_by_id(tenant_id, parent_id)
                    .await?
                    .ok_or(ServiceError::MenuNotFound)?;
                if parent.menu_id == node.menu_id || parent.is_descendant_of(&node) {
                    return Err(ServiceError::Validation(
                        "Cannot move a menu into its own subtree".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let (level, tree_path) = match &new_parent {
            Some(p) => (p.level + 1, format!("{}{}/", p.tree_path, node.menu_id)),
            None => (1, format!("/{}/", node.menu_id)),
        };
        let moved = self
            .store
            .move_menu_subtree(
                tenant_id,
                node.menu_id,
                new_parent_id,
                level - node.level,
                &node.tree_path,
                &tree_path,
            )
            .await?;
        if !moved {
            return Err(ServiceError::MenuNotFound);
        }

        tracing::info!(menu_id = %node.menu_id, menu_label = %node.menu_label, "menu moved");
        self.store
            .find_menu_by_id(tenant_id, node.menu_id)
            .await?
            .ok_or(ServiceError::MenuNotFound)
    }

    pub async fn delete_menu(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<(), ServiceError> {
        let menu = self
            .store
            .find_menu_by_id(tenant_id, menu_id)
            .await?
            .ok_or(ServiceError::MenuNotFound)?;

        if menu.is_system {
            return Err(ServiceError::Validation(
                "System menus cannot be deleted".to_string(),
            ));
        }

        let children = self.store.count_menu_children(tenant_id, menu_id).await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Menu '{}' has {} child nodes; delete them first",
                menu.menu_label, children
            )));
        }

        let deleted = self.store.delete_menu(tenant_id, menu_id).await?;
        if !deleted {
            return Err(ServiceError::MenuNotFound);
        }

        tracing::info!(menu_id = %menu_id, menu_label = %menu.menu_label, "menu deleted");
        Ok(())
    }

    pub async fn list_menu_catalog(&self, tenant_id: Uuid) -> Result<Vec<Menu>, ServiceError> {
        self.store
            .find_menus_by_tenant(tenant_id)
            .await
            .map_err(Into::into)
    }
}

/// Insert races lose to the unique index, not to the pre-check.
fn conflict_on_duplicate(err: StoreError) -> ServiceError {
    match err {
        StoreError::DuplicateKey(detail) => ServiceError::Conflict(detail),
        other => other.into(),
    }
}
