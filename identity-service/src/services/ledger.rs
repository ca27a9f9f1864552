//! Refresh token ledger - persisted session history with rotation.
//!
//! Every refresh token is single use. Spending one retires it and links the
//! row to its successor, so the store holds an auditable chain per session.
//! Expiry is judged lazily against the clock at use time; nothing sweeps
//! old rows.

use std::sync::Arc;

use service_core::clock::Clock;
use uuid::Uuid;

use crate::models::RefreshToken;
use crate::services::error::ServiceError;
use crate::services::token::new_refresh_token_value;
use crate::store::{IdentityStore, Page};

#[derive(Clone)]
pub struct RefreshTokenLedger {
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    refresh_token_ttl_days: i64,
}

impl RefreshTokenLedger {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            store,
            clock,
            refresh_token_ttl_days,
        }
    }

    /// Mint and persist a token for a new session. Returns the cleartext.
    pub async fn issue(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        jwt_id: Uuid,
        device_id: Option<String>,
        device_type: Option<String>,
    ) -> Result<String, ServiceError> {
        let raw = new_refresh_token_value();
        let row = RefreshToken::new(
            &raw,
            user_id,
            tenant_id,
            jwt_id,
            device_id,
            device_type,
            self.clock.now(),
            self.refresh_token_ttl_days,
        );
        self.store.insert_refresh_token(&row).await?;
        Ok(raw)
    }

    /// Look up a presented token. Returns the row only while it is live.
    pub async fn validate(&self, raw_token: &str) -> Result<Option<RefreshToken>, ServiceError> {
        let hash = RefreshToken::hash_token(raw_token);
        let Some(row) = self.store.find_refresh_token_by_hash(&hash).await? else {
            return Ok(None);
        };
        Ok(row.is_active_at(self.clock.now()).then_some(row))
    }

    /// Spend `old_raw` and persist its successor in one atomic step.
    /// Returns the successor cleartext, or None when the old token was
    /// already spent, revoked, or expired - including when a concurrent
    /// caller won the exchange first.
    pub async fn rotate(
        &self,
        old_raw: &str,
        user_id: Uuid,
        tenant_id: Uuid,
        jwt_id: Uuid,
        device_id: Option<String>,
        device_type: Option<String>,
    ) -> Result<Option<String>, ServiceError> {
        let now = self.clock.now();
        let raw = new_refresh_token_value();
        let successor = RefreshToken::new(
            &raw,
            user_id,
            tenant_id,
            jwt_id,
            device_id,
            device_type,
            now,
            self.refresh_token_ttl_days,
        );
        let rotated = self
            .store
            .rotate_refresh_token(&RefreshToken::hash_token(old_raw), successor, now)
            .await?;
        Ok(rotated.then_some(raw))
    }

    /// Revoke one token. Idempotent.
    pub async fn revoke(&self, raw_token: &str) -> Result<bool, ServiceError> {
        self.store
            .revoke_refresh_token(&RefreshToken::hash_token(raw_token), None, self.clock.now())
            .await
            .map_err(Into::into)
    }

    /// Revoke every live token for a user, optionally narrowed to one device.
    pub async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
    ) -> Result<usize, ServiceError> {
        self.store
            .revoke_refresh_tokens_for_user(user_id, device_id, self.clock.now())
            .await
            .map_err(Into::into)
    }

    /// Session history for audit surfaces, newest first.
    pub async fn history_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<RefreshToken>, ServiceError> {
        self.store
            .list_refresh_tokens_for_user(user_id, page)
            .await
            .map_err(Into::into)
    }
}
