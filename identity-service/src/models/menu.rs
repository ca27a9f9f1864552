//! Menu model - tenant-scoped navigation catalog.
//!
//! Menus share the tree discipline of the permission catalog: `tree_path`
//! and `level` are derived from the parent at creation. `route_path` holds
//! this node's segment only; resolvers concatenate ancestor segments into a
//! full frontend route when assembling a tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::grant::GrantStatus;

/// Menu catalog entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub menu_id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub menu_label: String,
    pub route_path: String,
    pub component: Option<String>,
    pub icon: Option<String>,
    /// Permission code the frontend checks before rendering this entry.
    pub perm_code: Option<String>,
    pub sort_order: i32,
    pub level: i32,
    pub tree_path: String,
    /// Hidden menus keep their route registered without a navigation entry.
    pub visible: bool,
    pub status: GrantStatus,
    pub is_system: bool,
    pub created_utc: DateTime<Utc>,
}

impl Menu {
    /// Create a new enabled, visible menu under the given parent (or as a
    /// root). Level and tree path are derived here.
    pub fn new(
        tenant_id: Uuid,
        parent: Option<&Menu>,
        menu_label: String,
        route_path: String,
        sort_order: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let menu_id = Uuid::new_v4();
        let (parent_id, level, tree_path) = match parent {
            Some(p) => (
                Some(p.menu_id),
                p.level + 1,
                format!("{}{}/", p.tree_path, menu_id),
            ),
            None => (None, 1, format!("/{}/", menu_id)),
        };
        Self {
            menu_id,
            tenant_id,
            parent_id,
            menu_label,
            route_path,
            component: None,
            icon: None,
            perm_code: None,
            sort_order,
            level,
            tree_path,
            visible: true,
            status: GrantStatus::Enabled,
            is_system: false,
            created_utc: now,
        }
    }

    /// True when `self` sits somewhere under `other` in the tree.
    pub fn is_descendant_of(&self, other: &Menu) -> bool {
        self.menu_id != other.menu_id && self.tree_path.starts_with(&other.tree_path)
    }
}

/// Menu subtree rendered for navigation responses.
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,
    /// Route assembled from ancestor segments, e.g. `/projects/safety/audits`.
    pub full_path: String,
    pub children: Vec<MenuTreeNode>,
}

/// Request to create a menu.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuRequest {
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 128, message = "Menu label is required"))]
    pub menu_label: String,
    #[validate(length(min = 1, max = 256, message = "Route path is required"))]
    pub route_path: String,
    pub component: Option<String>,
    pub icon: Option<String>,
    pub perm_code: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub status: Option<GrantStatus>,
}

fn default_visible() -> bool {
    true
}

/// Request to update a menu. The parent link is not part of an update;
/// reparenting is its own operation.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMenuRequest {
    pub tenant_id: Uuid,
    pub menu_id: Uuid,
    #[validate(length(min = 1, max = 128, message = "Menu label cannot be empty"))]
    pub menu_label: Option<String>,
    #[validate(length(min = 1, max = 256, message = "Route path cannot be empty"))]
    pub route_path: Option<String>,
    pub component: Option<String>,
    pub icon: Option<String>,
    pub perm_code: Option<String>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
    pub status: Option<GrantStatus>,
}
