//! User model - tenant-scoped worker and office accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity. `username` is unique per tenant, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub org_node_id: Option<Uuid>,
    pub enabled: bool,
    pub last_login_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new enabled user with a pre-hashed password.
    pub fn new(
        tenant_id: Uuid,
        username: String,
        display_name: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            tenant_id,
            username,
            display_name,
            password_hash,
            org_node_id: None,
            enabled: true,
            last_login_utc: None,
            created_utc: now,
        }
    }
}
