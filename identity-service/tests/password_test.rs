mod common;

use common::*;
use identity_service::dtos::{ChangePasswordRequest, RefreshRequest};
use identity_service::services::ServiceError;
use identity_service::store::IdentityStore;

const NEW_PASSWORD: &str = "girder-Bolt-99-torque";

fn change(current: &str, new: &str) -> ChangePasswordRequest {
    ChangePasswordRequest {
        current_password: current.to_string(),
        new_password: new.to_string(),
    }
}

fn refresh_request(token: &str) -> RefreshRequest {
    RefreshRequest {
        refresh_token: token.to_string(),
        device_id: None,
        device_type: None,
    }
}

#[tokio::test]
async fn test_change_password_rotates_credentials_and_revokes_sessions() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;
    let login = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .expect("login should succeed");

    env.facade
        .change_password(user.user_id, change(TEST_PASSWORD, NEW_PASSWORD))
        .await
        .expect("password change should succeed");

    // every outstanding session dies with the old password
    let dead = env
        .facade
        .refresh_token(refresh_request(&login.tokens.refresh_token))
        .await;
    assert!(matches!(dead, Err(ServiceError::InvalidRefreshToken)));

    let old = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await;
    assert!(matches!(old, Err(ServiceError::InvalidCredentials)));

    env.facade
        .login(login_request("ACME", "alice", NEW_PASSWORD))
        .await
        .expect("login with the new password should succeed");
}

#[tokio::test]
async fn test_change_password_requires_the_current_password() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;
    let login = env
        .facade
        .login(login_request("ACME", "alice", TEST_PASSWORD))
        .await
        .expect("login should succeed");

    let err = env
        .facade
        .change_password(user.user_id, change("guessed-wrong", NEW_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));

    // the failed attempt must not have revoked anything
    env.facade
        .refresh_token(refresh_request(&login.tokens.refresh_token))
        .await
        .expect("session should survive a failed change attempt");
}

#[tokio::test]
async fn test_short_new_password_is_rejected() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;

    let err = env
        .facade
        .change_password(user.user_id, change(TEST_PASSWORD, "short"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_password_hashes_are_argon2_at_rest() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;

    let before = env
        .store
        .find_user_by_id(user.user_id)
        .await
        .expect("Failed to read user")
        .expect("user should exist");
    assert!(before.password_hash.starts_with("$argon2"));
    assert!(!before.password_hash.contains(TEST_PASSWORD));

    env.facade
        .change_password(user.user_id, change(TEST_PASSWORD, NEW_PASSWORD))
        .await
        .expect("password change should succeed");

    let after = env
        .store
        .find_user_by_id(user.user_id)
        .await
        .expect("Failed to read user")
        .expect("user should exist");
    assert!(after.password_hash.starts_with("$argon2"));
    assert_ne!(after.password_hash, before.password_hash);
    assert!(!after.password_hash.contains(NEW_PASSWORD));
}
