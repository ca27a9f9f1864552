//! Role model - named permission bundles within a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row-visibility scope a role confers on data queries elsewhere in the
/// backend. Carried through claims; never interpreted by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    Own,
    Department,
    Organization,
    All,
}

impl DataScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataScope::Own => "own",
            DataScope::Department => "department",
            DataScope::Organization => "organization",
            DataScope::All => "all",
        }
    }
}

/// Role entity (tenant-scoped). `role_code` feeds the admin policy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub role_id: Uuid,
    pub tenant_id: Uuid,
    pub role_code: String,
    pub role_label: String,
    pub data_scope: DataScope,
    pub sort_order: i32,
    pub is_system: bool,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    /// Create a new role.
    pub fn new(
        tenant_id: Uuid,
        role_code: String,
        role_label: String,
        data_scope: DataScope,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            tenant_id,
            role_code,
            role_label,
            data_scope,
            sort_order: 0,
            is_system: false,
            created_utc: now,
        }
    }
}
