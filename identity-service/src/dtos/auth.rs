//! Auth DTO - login, refresh, and session payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{DataScope, MenuTreeNode, Role, Tenant, User};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Tenant code is required"))]
    pub tenant_code: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub device_id: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
    /// Overrides the device recorded on the spent token when present.
    pub device_id: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Access/refresh pair handed out by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub expires_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_code: String,
    pub tenant_label: String,
    pub username: String,
    pub display_name: String,
    pub org_node_id: Option<Uuid>,
    pub last_login_utc: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_parts(user: &User, tenant: &Tenant) -> Self {
        Self {
            user_id: user.user_id,
            tenant_id: user.tenant_id,
            tenant_code: tenant.tenant_code.clone(),
            tenant_label: tenant.tenant_label.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            org_node_id: user.org_node_id,
            last_login_utc: user.last_login_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub role_id: Uuid,
    pub role_code: String,
    pub role_label: String,
    pub data_scope: DataScope,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            role_id: role.role_id,
            role_code: role.role_code.clone(),
            role_label: role.role_label.clone(),
            data_scope: role.data_scope,
        }
    }
}

/// Everything the frontend needs after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub profile: UserProfile,
    pub roles: Vec<RoleSummary>,
    pub permissions: Vec<String>,
    pub menus: Vec<MenuTreeNode>,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub profile: UserProfile,
    pub roles: Vec<RoleSummary>,
    pub permissions: Vec<String>,
}

/// Navigation payload: the visible menu tree plus the permission codes the
/// shell uses to guard routes client-side.
#[derive(Debug, Serialize)]
pub struct UserMenusResponse {
    pub menus: Vec<MenuTreeNode>,
    pub permissions: Vec<String>,
}
