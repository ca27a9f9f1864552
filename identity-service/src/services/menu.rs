//! Menu resolution - the navigation tree a user may see.
//!
//! Grant collection mirrors the permission resolver; the extra work here is
//! assembling subtrees with concatenated routes. A node whose parent is not
//! in the resolved set surfaces as a root instead of disappearing, so a
//! half-granted tree still renders every entry the user holds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::DateTime;
use service_core::clock::Clock;
use tracing::warn;
use uuid::Uuid;

use crate::models::{Menu, MenuTreeNode};
use crate::services::error::ServiceError;
use crate::store::IdentityStore;

#[derive(Clone)]
pub struct MenuResolver {
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
}

impl MenuResolver {
    pub fn new(store: Arc<dyn IdentityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Menu tree for display. Store failures degrade to the default
    /// navigation instead of erroring.
    pub async fn resolve(&self, user_id: Uuid) -> Vec<MenuTreeNode> {
        match self.try_resolve(user_id).await {
            Ok(tree) => tree,
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    error = %err,
                    "menu resolution failed, serving default navigation"
                );
                default_navigation()
            }
        }
    }

    pub async fn try_resolve(&self, user_id: Uuid) -> Result<Vec<MenuTreeNode>, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let now = self.clock.now();

        let assignments = self.store.find_user_roles(user_id).await?;
        let role_ids: Vec<Uuid> = assignments
            .iter()
            .filter(|a| a.is_active())
            .map(|a| a.role_id)
            .collect();

        let mut menu_ids: HashSet<Uuid> = HashSet::new();
        for grant in self.store.find_role_menu_grants(&role_ids).await? {
            if grant.is_active_at(now) {
                menu_ids.insert(grant.menu_id);
            }
        }
        for grant in self.store.find_user_menu_grants(user_id).await? {
            if grant.is_active_at(now) {
                menu_ids.insert(grant.menu_id);
            }
        }

        let ids: Vec<Uuid> = menu_ids.into_iter().collect();
        let rows = self.store.find_menus_by_ids(user.tenant_id, &ids).await?;
        let granted: Vec<Menu> = rows.into_iter().filter(|m| m.status.is_enabled()).collect();
        Ok(build_menu_tree(granted))
    }
}

/// Assemble sorted subtrees from a flat set of menu rows.
pub fn build_menu_tree(nodes: Vec<Menu>) -> Vec<MenuTreeNode> {
    let ids: HashSet<Uuid> = nodes.iter().map(|m| m.menu_id).collect();
    let mut children: HashMap<Uuid, Vec<Menu>> = HashMap::new();
    let mut roots: Vec<Menu> = Vec::new();

    for node in nodes {
        match node.parent_id {
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(node)
            }
            // no parent, or parent not granted: surface as a root
            _ => roots.push(node),
        }
    }

    sort_siblings(&mut roots);
    roots
        .into_iter()
        .map(|root| build_subtree(root, "", &mut children))
        .collect()
}

fn build_subtree(
    node: Menu,
    parent_path: &str,
    children: &mut HashMap<Uuid, Vec<Menu>>,
) -> MenuTreeNode {
    let full_path = join_route(parent_path, &node.route_path);
    let mut direct = children.remove(&node.menu_id).unwrap_or_default();
    sort_siblings(&mut direct);
    let built = direct
        .into_iter()
        .map(|child| build_subtree(child, &full_path, children))
        .collect();
    MenuTreeNode {
        menu: node,
        full_path,
        children: built,
    }
}

fn sort_siblings(nodes: &mut [Menu]) {
    nodes.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.menu_id.cmp(&b.menu_id))
    });
}

fn join_route(parent: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches('/');
    if parent.is_empty() {
        format!("/{}", segment)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), segment)
    }
}

/// Minimal navigation served when menu grants cannot be read: dashboard and
/// personal workspace only, never tenant data.
pub fn default_navigation() -> Vec<MenuTreeNode> {
    let epoch = DateTime::UNIX_EPOCH;
    let mut dashboard = Menu::new(
        Uuid::nil(),
        None,
        "Dashboard".to_string(),
        "dashboard".to_string(),
        1,
        epoch,
    );
    dashboard.component = Some("Dashboard".to_string());
    dashboard.icon = Some("dashboard".to_string());
    dashboard.is_system = true;

    let mut workspace = Menu::new(
        Uuid::nil(),
        None,
        "My Workspace".to_string(),
        "profile".to_string(),
        2,
        epoch,
    );
    workspace.component = Some("Profile".to_string());
    workspace.icon = Some("user".to_string());
    workspace.is_system = true;

    build_menu_tree(vec![dashboard, workspace])
}
