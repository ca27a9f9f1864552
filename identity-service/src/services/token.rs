//! Access token issuing and validation (HS256), plus refresh token minting.
//!
//! Access tokens are self-contained: tenant, display name, role summaries,
//! and the resolved permission codes ride along as claims so sibling
//! services can authorize without a callback. Refresh tokens are opaque
//! random values; their persistence lives in the ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::clock::Clock;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::models::{DataScope, Role, Tenant, User};
use crate::services::error::ServiceError;

/// Claims embedded in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id.
    pub sub: String,
    /// Tenant id.
    pub tid: String,
    /// Tenant code, for log lines and display.
    pub tcode: String,
    /// Display name.
    pub name: String,
    pub roles: Vec<RoleClaim>,
    /// Permission codes resolved at issue time.
    pub perms: Vec<String>,
    /// Token id; the paired refresh token records it.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.tid).ok()
    }
}

/// Role summary carried in claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleClaim {
    pub code: String,
    pub label: String,
    pub data_scope: DataScope,
}

impl From<&Role> for RoleClaim {
    fn from(role: &Role) -> Self {
        Self {
            code: role.role_code.clone(),
            label: role.role_label.clone(),
            data_scope: role.data_scope,
        }
    }
}

/// Signs and validates access tokens with a symmetric secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_ttl_minutes: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.signing_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl_minutes: config.access_token_ttl_minutes,
            clock,
        }
    }

    /// Mint an access token. Returns the encoded token and its `jti`.
    pub fn generate_access_token(
        &self,
        user: &User,
        tenant: &Tenant,
        roles: &[Role],
        permissions: &BTreeSet<String>,
    ) -> Result<(String, Uuid), ServiceError> {
        let now = self.clock.now();
        let expiry = now + Duration::minutes(self.access_token_ttl_minutes);
        let jwt_id = Uuid::new_v4();

        let claims = AccessTokenClaims {
            sub: user.user_id.to_string(),
            tid: user.tenant_id.to_string(),
            tcode: tenant.tenant_code.clone(),
            name: user.display_name.clone(),
            roles: roles.iter().map(RoleClaim::from).collect(),
            perms: permissions.iter().cloned().collect(),
            jti: jwt_id.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, jwt_id))
    }

    /// Verify signature, issuer, audience, and lifetime. Lifetime is judged
    /// against the injected clock, not wall time.
    pub fn validate_access_token(&self, token: &str) -> Option<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.validate_exp = false;

        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()?;

        if claims.exp <= self.clock.now().timestamp() {
            return None;
        }
        Some(claims)
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_minutes * 60
    }
}

/// 32 random bytes from the OS CSPRNG, hex encoded. The cleartext goes to
/// the caller exactly once; stores only ever see its hash.
pub fn new_refresh_token_value() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
