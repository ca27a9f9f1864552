//! Tenant model - root of the multi-tenancy hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Construction company that owns users, roles, and both catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub tenant_code: String,
    pub tenant_label: String,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    /// Create a new enabled tenant.
    pub fn new(tenant_code: String, tenant_label: String, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            tenant_code,
            tenant_label,
            enabled: true,
            created_utc: now,
        }
    }
}
