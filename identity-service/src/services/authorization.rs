//! Authorization facade - the single entry point callers hold.
//!
//! Composes the token issuer, the refresh token ledger, and the permission
//! and menu resolvers over one store and one clock. Every store-backed
//! operation runs under a deadline, so a stalled backend becomes a timeout
//! error (or a closed check) instead of a hung caller.
//!
//! Assignment operations are anchored to the operator: targets are looked
//! up in the operator's tenant, and anything outside it reads as not found.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use service_core::clock::Clock;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::IdentityConfig;
use crate::dtos::{
    ChangePasswordRequest, CurrentUserResponse, LoginRequest, LoginResponse, RefreshRequest,
    RoleSummary, TokenPair, UserMenusResponse, UserProfile,
};
use crate::models::{
    RefreshToken, RoleMenu, RolePermission, User, UserMenu, UserPermission, UserRole,
};
use crate::services::error::ServiceError;
use crate::services::ledger::RefreshTokenLedger;
use crate::services::menu::{default_navigation, MenuResolver};
use crate::services::policy::AdminPolicy;
use crate::services::resolver::PermissionResolver;
use crate::services::token::TokenIssuer;
use crate::store::{IdentityStore, Page};
use crate::utils::password::{hash_password, verify_password, Password, PasswordHashString};

#[derive(Clone)]
pub struct AuthorizationFacade {
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
    ledger: RefreshTokenLedger,
    permissions: PermissionResolver,
    menus: MenuResolver,
    op_timeout: Duration,
}

impl AuthorizationFacade {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        config: &IdentityConfig,
    ) -> Self {
        Self::with_policy(store, clock, config, AdminPolicy::standard())
    }

    pub fn with_policy(
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        config: &IdentityConfig,
        policy: AdminPolicy,
    ) -> Self {
        let issuer = TokenIssuer::new(&config.token, clock.clone());
        let ledger = RefreshTokenLedger::new(
            store.clone(),
            clock.clone(),
            config.token.refresh_token_ttl_days,
        );
        let permissions = PermissionResolver::new(
            store.clone(),
            clock.clone(),
            policy,
            config.resolver.fallback_permissions.clone(),
        );
        let menus = MenuResolver::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            issuer,
            ledger,
            permissions,
            menus,
            op_timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }

    /// Run a store-backed operation under the configured deadline.
    async fn bounded<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| ServiceError::StoreTimeout)?
    }

    // --- sessions ---

    /// Authenticate within a tenant and open a session.
    ///
    /// Unknown tenant, unknown user, wrong password, and disabled rows all
    /// surface as the same [`ServiceError::InvalidCredentials`].
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        self.bounded(self.login_inner(request)).await
    }

    async fn login_inner(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let tenant = self
            .store
            .find_tenant_by_code(&request.tenant_code)
            .await?
            .filter(|t| t.enabled)
            .ok_or(ServiceError::InvalidCredentials)?;
        let user = self
            .store
            .find_user_by_username(tenant.tenant_id, &request.username)
            .await?
            .filter(|u| u.enabled)
            .ok_or(ServiceError::InvalidCredentials)?;

        let password = Password::new(request.password);
        let stored = PasswordHashString::new(user.password_hash.clone());
        if verify_password(&password, &stored).is_err() {
            return Err(ServiceError::InvalidCredentials);
        }

        let roles = self.permissions.active_roles(&user).await?;
        let permission_set = self.permissions.resolve(user.user_id).await;
        let menus = self.menus.resolve(user.user_id).await;

        let (access_token, jwt_id) =
            self.issuer
                .generate_access_token(&user, &tenant, &roles, &permission_set)?;
        let refresh_token = self
            .ledger
            .issue(
                user.user_id,
                tenant.tenant_id,
                jwt_id,
                request.device_id,
                request.device_type,
            )
            .await?;

        // The session is already established; a failed stamp is not worth
        // failing the login over.
        if let Err(err) = self
            .store
            .update_last_login(user.user_id, self.clock.now())
            .await
        {
            warn!(user_id = %user.user_id, error = %err, "failed to stamp last login");
        }

        info!(
            user_id = %user.user_id,
            tenant_code = %tenant.tenant_code,
            roles = roles.len(),
            "user logged in"
        );

        Ok(LoginResponse {
            tokens: self.token_pair(access_token, refresh_token),
            profile: UserProfile::from_parts(&user, &tenant),
            roles: roles.iter().map(RoleSummary::from).collect(),
            permissions: permission_set.into_iter().collect(),
            menus,
        })
    }

    /// Exchange a live refresh token for a fresh pair.
    ///
    /// Unknown, expired, revoked, and already-spent tokens, and subjects
    /// that can no longer refresh, all surface as the same
    /// [`ServiceError::InvalidRefreshToken`].
    pub async fn refresh_token(&self, request: RefreshRequest) -> Result<TokenPair, ServiceError> {
        request.validate()?;
        self.bounded(self.refresh_inner(request)).await
    }

    async fn refresh_inner(&self, request: RefreshRequest) -> Result<TokenPair, ServiceError> {
        let old = self
            .ledger
            .validate(&request.refresh_token)
            .await?
            .ok_or(ServiceError::InvalidRefreshToken)?;

        let user = self
            .store
            .find_user_by_id(old.user_id)
            .await?
            .filter(|u| u.enabled)
            .ok_or(ServiceError::InvalidRefreshToken)?;
        let tenant = self
            .store
            .find_tenant_by_id(user.tenant_id)
            .await?
            .filter(|t| t.enabled)
            .ok_or(ServiceError::InvalidRefreshToken)?;

        // Claims are recomputed, not copied, so grant and role changes since
        // the last issue take effect on rotation.
        let roles = self.permissions.active_roles(&user).await?;
        let permission_set = self.permissions.resolve(user.user_id).await;
        let (access_token, jwt_id) =
            self.issuer
                .generate_access_token(&user, &tenant, &roles, &permission_set)?;

        let device_id = request.device_id.or_else(|| old.device_id.clone());
        let device_type = request.device_type.or_else(|| old.device_type.clone());
        let refresh_token = self
            .ledger
            .rotate(
                &request.refresh_token,
                user.user_id,
                tenant.tenant_id,
                jwt_id,
                device_id,
                device_type,
            )
            .await?
            .ok_or(ServiceError::InvalidRefreshToken)?;

        info!(user_id = %user.user_id, "refresh token rotated");
        Ok(self.token_pair(access_token, refresh_token))
    }

    /// Revoke the user's refresh tokens; `device_id` narrows to one device.
    /// Returns how many tokens were revoked.
    pub async fn logout(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
    ) -> Result<usize, ServiceError> {
        let revoked = self
            .bounded(self.ledger.revoke_all_for_user(user_id, device_id))
            .await?;
        info!(user_id = %user_id, revoked, "user logged out");
        Ok(revoked)
    }

    /// Is this access token good right now? Signature, issuer, audience,
    /// and lifetime come from the token itself; on top of that the user
    /// must still exist and be enabled. Store trouble fails closed.
    pub async fn validate_token(&self, token: &str) -> bool {
        let Some(claims) = self.issuer.validate_access_token(token) else {
            return false;
        };
        let Some(user_id) = claims.user_id() else {
            return false;
        };

        let lookup = async {
            self.store
                .find_user_by_id(user_id)
                .await
                .map_err(ServiceError::from)
        };
        match self.bounded(lookup).await {
            Ok(Some(user)) => user.enabled,
            Ok(None) => false,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "token validation failed closed");
                false
            }
        }
    }

    /// Session history for the user, newest first.
    pub async fn session_history(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<RefreshToken>, ServiceError> {
        self.bounded(self.ledger.history_for_user(user_id, page))
            .await
    }

    // --- profile and display ---

    pub async fn get_current_user(
        &self,
        user_id: Uuid,
    ) -> Result<CurrentUserResponse, ServiceError> {
        self.bounded(self.current_user_inner(user_id)).await
    }

    async fn current_user_inner(
        &self,
        user_id: Uuid,
    ) -> Result<CurrentUserResponse, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let tenant = self
            .store
            .find_tenant_by_id(user.tenant_id)
            .await?
            .ok_or(ServiceError::TenantNotFound)?;
        let roles = self.permissions.active_roles(&user).await?;
        let permissions = self.permissions.resolve(user_id).await;

        Ok(CurrentUserResponse {
            profile: UserProfile::from_parts(&user, &tenant),
            roles: roles.iter().map(RoleSummary::from).collect(),
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Navigation payload for the user: the menu tree plus the permission
    /// codes the shell guards routes with. Degrades to the default
    /// navigation and the fallback set on failure or timeout; never errors.
    pub async fn get_user_menus(&self, user_id: Uuid) -> UserMenusResponse {
        let resolve = async {
            let menus = self.menus.resolve(user_id).await;
            let permissions = self.permissions.resolve(user_id).await;
            (menus, permissions)
        };
        match tokio::time::timeout(self.op_timeout, resolve).await {
            Ok((menus, permissions)) => UserMenusResponse {
                menus,
                permissions: permissions.into_iter().collect(),
            },
            Err(_) => {
                warn!(user_id = %user_id, "menu resolution timed out, serving default navigation");
                UserMenusResponse {
                    menus: default_navigation(),
                    permissions: self.permissions.fallback_set().into_iter().collect(),
                }
            }
        }
    }

    // --- permission checks ---

    /// Does the user hold this permission? Fails closed on any trouble.
    pub async fn check_permission(&self, user_id: Uuid, permission: &str) -> bool {
        match tokio::time::timeout(self.op_timeout, self.permissions.check(user_id, permission))
            .await
        {
            Ok(allowed) => allowed,
            Err(_) => {
                warn!(user_id = %user_id, permission, "permission check timed out, failing closed");
                false
            }
        }
    }

    /// At least one of these permissions. Empty input is false.
    pub async fn check_any_permission(&self, user_id: Uuid, permissions: &[&str]) -> bool {
        match tokio::time::timeout(self.op_timeout, self.permissions.check_any(user_id, permissions))
            .await
        {
            Ok(allowed) => allowed,
            Err(_) => {
                warn!(user_id = %user_id, "permission check timed out, failing closed");
                false
            }
        }
    }

    /// All of these permissions. Empty input is vacuously true.
    pub async fn check_all_permissions(&self, user_id: Uuid, permissions: &[&str]) -> bool {
        match tokio::time::timeout(self.op_timeout, self.permissions.check_all(user_id, permissions))
            .await
        {
            Ok(allowed) => allowed,
            Err(_) => {
                warn!(user_id = %user_id, "permission check timed out, failing closed");
                false
            }
        }
    }

    // --- grant administration ---

    /// Replace a role's permission grants with exactly this set.
    pub async fn assign_permissions_to_role(
        &self,
        operator_id: Uuid,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let role = self
                .store
                .find_role_by_id(operator.tenant_id, role_id)
                .await?
                .ok_or(ServiceError::RoleNotFound)?;

            let ids = self
                .verified_permission_ids(operator.tenant_id, permission_ids)
                .await?;
            let now = self.clock.now();
            let grants = ids
                .iter()
                .map(|&id| RolePermission::new(role.role_id, id, Some(operator_id), now))
                .collect();
            self.store
                .replace_role_permissions(role.role_id, grants)
                .await?;

            info!(
                role_id = %role.role_id,
                count = ids.len(),
                granted_by = %operator_id,
                "role permission grants replaced"
            );
            Ok(())
        })
        .await
    }

    /// Replace a user's direct permission grants with exactly this set.
    pub async fn assign_permissions_to_user(
        &self,
        operator_id: Uuid,
        user_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let target = self.target_user(&operator, user_id).await?;

            let ids = self
                .verified_permission_ids(operator.tenant_id, permission_ids)
                .await?;
            let now = self.clock.now();
            let grants = ids
                .iter()
                .map(|&id| UserPermission::new(target.user_id, id, Some(operator_id), now))
                .collect();
            self.store
                .replace_user_permissions(target.user_id, grants)
                .await?;

            info!(
                user_id = %target.user_id,
                count = ids.len(),
                granted_by = %operator_id,
                "user permission grants replaced"
            );
            Ok(())
        })
        .await
    }

    /// Replace a role's menu grants with exactly this set.
    pub async fn assign_menus_to_role(
        &self,
        operator_id: Uuid,
        role_id: Uuid,
        menu_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let role = self
                .store
                .find_role_by_id(operator.tenant_id, role_id)
                .await?
                .ok_or(ServiceError::RoleNotFound)?;

            let ids = self.verified_menu_ids(operator.tenant_id, menu_ids).await?;
            let now = self.clock.now();
            let grants = ids
                .iter()
                .map(|&id| RoleMenu::new(role.role_id, id, Some(operator_id), now))
                .collect();
            self.store.replace_role_menus(role.role_id, grants).await?;

            info!(
                role_id = %role.role_id,
                count = ids.len(),
                granted_by = %operator_id,
                "role menu grants replaced"
            );
            Ok(())
        })
        .await
    }

    /// Replace a user's direct menu grants with exactly this set.
    pub async fn assign_menus_to_user(
        &self,
        operator_id: Uuid,
        user_id: Uuid,
        menu_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let target = self.target_user(&operator, user_id).await?;

            let ids = self.verified_menu_ids(operator.tenant_id, menu_ids).await?;
            let now = self.clock.now();
            let grants = ids
                .iter()
                .map(|&id| UserMenu::new(target.user_id, id, Some(operator_id), now))
                .collect();
            self.store.replace_user_menus(target.user_id, grants).await?;

            info!(
                user_id = %target.user_id,
                count = ids.len(),
                granted_by = %operator_id,
                "user menu grants replaced"
            );
            Ok(())
        })
        .await
    }

    /// Replace a user's role memberships with exactly this set.
    pub async fn assign_roles_to_user(
        &self,
        operator_id: Uuid,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let target = self.target_user(&operator, user_id).await?;

            let unique: BTreeSet<Uuid> = role_ids.into_iter().collect();
            let ids: Vec<Uuid> = unique.into_iter().collect();
            let found = self.store.find_roles_by_ids(operator.tenant_id, &ids).await?;
            if found.len() != ids.len() {
                return Err(ServiceError::RoleNotFound);
            }

            let now = self.clock.now();
            let assignments = ids
                .iter()
                .map(|&id| UserRole::new(target.user_id, id, Some(operator_id), now))
                .collect();
            self.store
                .replace_user_roles(target.user_id, assignments)
                .await?;

            info!(
                user_id = %target.user_id,
                count = ids.len(),
                granted_by = %operator_id,
                "user role memberships replaced"
            );
            Ok(())
        })
        .await
    }

    /// Permission ids currently granted to a role, active or not. This is
    /// the set a subsequent assign call would overwrite.
    pub async fn get_role_permissions(
        &self,
        operator_id: Uuid,
        role_id: Uuid,
    ) -> Result<Vec<Uuid>, ServiceError> {
        self.bounded(async {
            let operator = self.operator(operator_id).await?;
            let role = self
                .store
                .find_role_by_id(operator.tenant_id, role_id)
                .await?
                .ok_or(ServiceError::RoleNotFound)?;

            let grants = self
                .store
                .find_role_permission_grants(&[role.role_id])
                .await?;
            let mut ids: Vec<Uuid> = grants.into_iter().map(|g| g.permission_id).collect();
            ids.sort();
            ids.dedup();
            Ok(ids)
        })
        .await
    }

    // --- account ---

    /// Verify the current password, store a fresh Argon2 hash, and revoke
    /// every refresh token the user holds.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        self.bounded(self.change_password_inner(user_id, request))
            .await
    }

    async fn change_password_inner(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let current = Password::new(request.current_password);
        let stored = PasswordHashString::new(user.password_hash.clone());
        if verify_password(&current, &stored).is_err() {
            return Err(ServiceError::InvalidCredentials);
        }

        let new_hash = hash_password(&Password::new(request.new_password))?;
        let updated = self
            .store
            .update_user_password(user_id, new_hash.as_str())
            .await?;
        if !updated {
            return Err(ServiceError::UserNotFound);
        }

        let revoked = self.ledger.revoke_all_for_user(user_id, None).await?;
        info!(user_id = %user_id, revoked, "password changed, sessions revoked");
        Ok(())
    }

    // --- helpers ---

    fn token_pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        let expires_in = self.issuer.access_token_ttl_seconds();
        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_utc: self.clock.now() + chrono::Duration::seconds(expires_in),
        }
    }

    async fn operator(&self, operator_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user_by_id(operator_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Target of an assignment, resolved inside the operator's tenant.
    async fn target_user(&self, operator: &User, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .filter(|u| u.tenant_id == operator.tenant_id)
            .ok_or(ServiceError::UserNotFound)
    }

    /// Dedupe and confirm every id exists in the tenant's catalog.
    async fn verified_permission_ids(
        &self,
        tenant_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let unique: BTreeSet<Uuid> = permission_ids.into_iter().collect();
        let ids: Vec<Uuid> = unique.into_iter().collect();
        let found = self.store.find_permissions_by_ids(tenant_id, &ids).await?;
        if found.len() != ids.len() {
            return Err(ServiceError::PermissionNotFound);
        }
        Ok(ids)
    }

    async fn verified_menu_ids(
        &self,
        tenant_id: Uuid,
        menu_ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let unique: BTreeSet<Uuid> = menu_ids.into_iter().collect();
        let ids: Vec<Uuid> = unique.into_iter().collect();
        let found = self.store.find_menus_by_ids(tenant_id, &ids).await?;
        if found.len() != ids.len() {
            return Err(ServiceError::MenuNotFound);
        }
        Ok(ids)
    }
}
