//! Permission model - tenant-scoped catalog of permission codes.
//!
//! Catalog rows form a tree. `tree_path` is the slash-delimited chain of
//! ancestor ids ending with the row's own id, and `level` is the depth with
//! roots at 1. Both are derived at creation, recomputed on moves, and never
//! drift from `parent_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::grant::GrantStatus;

/// What a permission code gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// Grouping node for the admin tree; grants nothing by itself.
    Directory,
    /// Page-level or button-level action.
    Action,
    /// Backend endpoint.
    Api,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Directory => "directory",
            PermissionType::Action => "action",
            PermissionType::Api => "api",
        }
    }
}

/// Permission catalog entity. `perm_code` is unique per tenant and is the
/// string grants and checks refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub permission_id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub perm_code: String,
    pub perm_label: String,
    pub perm_type: PermissionType,
    pub sort_order: i32,
    pub level: i32,
    pub tree_path: String,
    pub status: GrantStatus,
    pub is_system: bool,
    pub created_utc: DateTime<Utc>,
}

impl Permission {
    /// Create a new enabled permission under the given parent (or as a root).
    /// Level and tree path are derived here so they cannot disagree with the
    /// parent link.
    pub fn new(
        tenant_id: Uuid,
        parent: Option<&Permission>,
        perm_code: String,
        perm_label: String,
        perm_type: PermissionType,
        sort_order: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let permission_id = Uuid::new_v4();
        let (parent_id, level, tree_path) = match parent {
            Some(p) => (
                Some(p.permission_id),
                p.level + 1,
                format!("{}{}/", p.tree_path, permission_id),
            ),
            None => (None, 1, format!("/{}/", permission_id)),
        };
        Self {
            permission_id,
            tenant_id,
            parent_id,
            perm_code,
            perm_label,
            perm_type,
            sort_order,
            level,
            tree_path,
            status: GrantStatus::Enabled,
            is_system: false,
            created_utc: now,
        }
    }

    /// True when `self` sits somewhere under `other` in the tree.
    pub fn is_descendant_of(&self, other: &Permission) -> bool {
        self.permission_id != other.permission_id && self.tree_path.starts_with(&other.tree_path)
    }
}

/// Request to create a permission.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 128, message = "Permission code is required"))]
    pub perm_code: String,
    #[validate(length(min = 1, max = 128, message = "Permission label is required"))]
    pub perm_label: String,
    pub perm_type: PermissionType,
    #[serde(default)]
    pub sort_order: i32,
    pub status: Option<GrantStatus>,
}

/// Request to update a permission. The parent link is not part of an update;
/// reparenting is its own operation.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    pub tenant_id: Uuid,
    pub permission_id: Uuid,
    #[validate(length(min = 1, max = 128, message = "Permission label cannot be empty"))]
    pub perm_label: Option<String>,
    pub sort_order: Option<i32>,
    pub status: Option<GrantStatus>,
}
