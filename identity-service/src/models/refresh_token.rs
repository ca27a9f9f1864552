//! Refresh token model - server-side session records, stored hashed.
//!
//! The cleartext value leaves the service exactly once, in the login or
//! refresh response. Rows keep a revocation chain: a rotated token points at
//! its successor through `replaced_by_hash`, and `revoked_utc` is terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Persisted record of one opaque refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// SHA-256 hex digest of the cleartext value; primary key.
    pub token_hash: String,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    /// `jti` of the access token minted alongside this refresh token.
    pub jwt_id: Uuid,
    pub device_id: Option<String>,
    pub device_type: Option<String>,
    pub issued_utc: DateTime<Utc>,
    pub expires_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
    pub replaced_by_hash: Option<String>,
}

impl RefreshToken {
    /// Create a live row for a freshly minted cleartext value.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        raw_token: &str,
        user_id: Uuid,
        tenant_id: Uuid,
        jwt_id: Uuid,
        device_id: Option<String>,
        device_type: Option<String>,
        issued_utc: DateTime<Utc>,
        ttl_days: i64,
    ) -> Self {
        Self {
            token_hash: Self::hash_token(raw_token),
            user_id,
            tenant_id,
            jwt_id,
            device_id,
            device_type,
            issued_utc,
            expires_utc: issued_utc + Duration::days(ttl_days),
            revoked_utc: None,
            replaced_by_hash: None,
        }
    }

    /// SHA-256 hex digest. Raw values never touch the store.
    pub fn hash_token(raw_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_utc <= now
    }

    /// Live means never revoked and not yet expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_utc.is_none() && !self.is_expired_at(now)
    }
}
