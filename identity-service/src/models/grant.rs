//! Grant models - link rows joining users and roles to permissions and menus.
//!
//! Permission and menu grants carry an optional validity window. A grant is
//! active at instant `t` when its status is enabled, `effective_from_utc` is
//! unset or `<= t`, and `effective_to_utc` is unset or `> t` (half-open:
//! the start is inclusive, the end exclusive).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle switch shared by grant rows and catalog rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Enabled,
    Disabled,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Enabled => "enabled",
            GrantStatus::Disabled => "disabled",
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, GrantStatus::Enabled)
    }
}

fn window_active(
    status: GrantStatus,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status.is_enabled() && from.is_none_or(|f| f <= now) && to.is_none_or(|t| t > now)
}

/// Role membership for a user. Carries status only; no validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub status: GrantStatus,
    pub granted_by: Option<Uuid>,
    pub granted_utc: DateTime<Utc>,
}

impl UserRole {
    pub fn new(user_id: Uuid, role_id: Uuid, granted_by: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role_id,
            status: GrantStatus::Enabled,
            granted_by,
            granted_utc: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_enabled()
    }
}

/// Permission grant to a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub status: GrantStatus,
    pub effective_from_utc: Option<DateTime<Utc>>,
    pub effective_to_utc: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub granted_utc: DateTime<Utc>,
}

impl RolePermission {
    /// Create an enabled grant with an open validity window.
    pub fn new(
        role_id: Uuid,
        permission_id: Uuid,
        granted_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role_id,
            permission_id,
            status: GrantStatus::Enabled,
            effective_from_utc: None,
            effective_to_utc: None,
            granted_by,
            granted_utc: now,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        window_active(
            self.status,
            self.effective_from_utc,
            self.effective_to_utc,
            now,
        )
    }
}

/// Permission grant directly to a user, on top of whatever roles confer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub status: GrantStatus,
    pub effective_from_utc: Option<DateTime<Utc>>,
    pub effective_to_utc: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub granted_utc: DateTime<Utc>,
}

impl UserPermission {
    /// Create an enabled grant with an open validity window.
    pub fn new(
        user_id: Uuid,
        permission_id: Uuid,
        granted_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            permission_id,
            status: GrantStatus::Enabled,
            effective_from_utc: None,
            effective_to_utc: None,
            granted_by,
            granted_utc: now,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        window_active(
            self.status,
            self.effective_from_utc,
            self.effective_to_utc,
            now,
        )
    }
}

/// Menu grant to a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMenu {
    pub role_id: Uuid,
    pub menu_id: Uuid,
    pub status: GrantStatus,
    pub effective_from_utc: Option<DateTime<Utc>>,
    pub effective_to_utc: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub granted_utc: DateTime<Utc>,
}

impl RoleMenu {
    /// Create an enabled grant with an open validity window.
    pub fn new(role_id: Uuid, menu_id: Uuid, granted_by: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            role_id,
            menu_id,
            status: GrantStatus::Enabled,
            effective_from_utc: None,
            effective_to_utc: None,
            granted_by,
            granted_utc: now,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        window_active(
            self.status,
            self.effective_from_utc,
            self.effective_to_utc,
            now,
        )
    }
}

/// Menu grant directly to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMenu {
    pub user_id: Uuid,
    pub menu_id: Uuid,
    pub status: GrantStatus,
    pub effective_from_utc: Option<DateTime<Utc>>,
    pub effective_to_utc: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub granted_utc: DateTime<Utc>,
}

impl UserMenu {
    /// Create an enabled grant with an open validity window.
    pub fn new(user_id: Uuid, menu_id: Uuid, granted_by: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            menu_id,
            status: GrantStatus::Enabled,
            effective_from_utc: None,
            effective_to_utc: None,
            granted_by,
            granted_utc: now,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        window_active(
            self.status,
            self.effective_from_utc,
            self.effective_to_utc,
            now,
        )
    }
}
