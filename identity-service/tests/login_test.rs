mod common;

use common::*;
use identity_service::services::{ServiceError, TokenIssuer};
use identity_service::store::IdentityStore;

#[tokio::test]
async fn test_login_returns_tokens_profile_and_permissions() {
    let env = TestEnv::new();
    let (tenant, user, role) = seed_login_ready_user(&env).await;
    let now = env.now();
    let permission = seed_permission(&env.store, &tenant, "project.view", now).await;
    grant_permission_to_role(&env.store, &role, &permission, now).await;

    let response = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .expect("login should succeed");

    assert_eq!(response.tokens.token_type, "Bearer");
    assert_eq!(response.tokens.expires_in, 3600);
    assert!(!response.tokens.access_token.is_empty());
    assert!(!response.tokens.refresh_token.is_empty());

    assert_eq!(response.profile.user_id, user.user_id);
    assert_eq!(response.profile.tenant_code, "ACME");
    assert_eq!(response.roles.len(), 1);
    assert_eq!(response.roles[0].role_code, "FOREMAN");
    assert_eq!(response.permissions, vec!["project.view".to_string()]);

    // claims carry the same picture the response body does
    let issuer = TokenIssuer::new(&env.config.token, env.clock.clone());
    let claims = issuer
        .validate_access_token(&response.tokens.access_token)
        .expect("access token should validate");
    assert_eq!(claims.user_id(), Some(user.user_id));
    assert_eq!(claims.tcode, "ACME");
    assert_eq!(claims.perms, vec!["project.view".to_string()]);

    assert!(env.facade.validate_token(&response.tokens.access_token).await);
}

#[tokio::test]
async fn test_login_failures_share_one_generic_message() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;

    let wrong_password = env
        .facade
        .login(login_request("ACME", "alice", "not-the-password"))
        .await
        .unwrap_err();
    let unknown_user = env
        .facade
        .login(login_request("ACME", "mallory", TEST_PASSWORD))
        .await
        .unwrap_err();
    let unknown_tenant = env
        .facade
        .login(login_request("GLOBEX", "alice", TEST_PASSWORD))
        .await
        .unwrap_err();

    env.store
        .set_user_enabled(user.user_id, false)
        .await
        .expect("Failed to disable user");
    let disabled_user = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .unwrap_err();

    for err in [wrong_password, unknown_user, unknown_tenant, disabled_user] {
        assert!(matches!(err, ServiceError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}

#[tokio::test]
async fn test_disabled_tenant_cannot_login() {
    let env = TestEnv::new();
    let (tenant, _user, _role) = seed_login_ready_user(&env).await;
    env.store
        .set_tenant_enabled(tenant.tenant_id, false)
        .await
        .expect("Failed to disable tenant");

    let err = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_stamps_last_login_in_the_store() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;
    let login_time = env.now();

    let response = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .expect("login should succeed");

    // the response reports the previous login; the store now has this one
    assert_eq!(response.profile.last_login_utc, None);
    let stored = env
        .store
        .find_user_by_id(user.user_id)
        .await
        .expect("Failed to read user")
        .expect("user should exist");
    assert_eq!(stored.last_login_utc, Some(login_time));
}

#[tokio::test]
async fn test_same_username_in_sibling_tenants_stays_scoped() {
    let env = TestEnv::new();
    let now = env.now();
    let acme = seed_tenant(&env.store, "ACME", now).await;
    let globex = seed_tenant(&env.store, "GLOBEX", now).await;
    seed_user(&env.store, &acme, "sam", "acme-password-1", now).await;
    seed_user(&env.store, &globex, "sam", "globex-password-2", now).await;

    let cross = env
        .facade
        .login(login_request("GLOBEX", "sam", "acme-password-1"))
        .await;
    assert!(matches!(cross, Err(ServiceError::InvalidCredentials)));

    let own = env
        .facade
        .login(login_request("GLOBEX", "sam", "globex-password-2"))
        .await
        .expect("login with the right tenant's password should succeed");
    assert_eq!(own.profile.tenant_code, "GLOBEX");
}

#[tokio::test]
async fn test_blank_fields_fail_validation_before_lookup() {
    let env = TestEnv::new();
    let err = env
        .facade
        .login(login_request("ACME", "alice", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_user_without_roles_still_logs_in() {
    let env = TestEnv::new();
    let now = env.now();
    let tenant = seed_tenant(&env.store, "ACME", now).await;
    seed_user(&env.store, &tenant, "bob", TEST_PASSWORD, now).await;

    let response = env
        .facade
        .login(login_request("ACME", "bob", TEST_PASSWORD))
        .await
        .expect("login should succeed");
    assert!(response.roles.is_empty());
    assert!(response.permissions.is_empty());
    assert!(response.menus.is_empty());
}
