mod common;

use chrono::Duration;
use common::*;
use identity_service::models::{GrantStatus, RolePermission};
use identity_service::services::{AdminPolicy, PermissionResolver, ServiceError};
use identity_service::store::IdentityStore;

#[tokio::test]
async fn test_effective_set_unions_role_and_user_grants() {
    let env = TestEnv::new();
    let (tenant, user, role) = seed_login_ready_user(&env).await;
    let now = env.now();

    let view = seed_permission(&env.store, &tenant, "project.view", now).await;
    let create = seed_permission(&env.store, &tenant, "task.create", now).await;
    grant_permission_to_role(&env.store, &role, &view, now).await;
    // overlapping grant on both paths must not duplicate
    grant_permission_to_user(&env.store, &user, &view, now).await;
    grant_permission_to_user(&env.store, &user, &create, now).await;

    let me = env
        .facade
        .get_current_user(user.user_id)
        .await
        .expect("current user should load");
    assert_eq!(
        me.permissions,
        vec!["project.view".to_string(), "task.create".to_string()]
    );
    assert!(env.facade.check_permission(user.user_id, "project.view").await);
    assert!(env.facade.check_permission(user.user_id, "task.create").await);
    assert!(!env.facade.check_permission(user.user_id, "task.delete").await);
}

#[tokio::test]
async fn test_validity_window_start_is_inclusive_and_end_exclusive() {
    let env = TestEnv::new();
    let (tenant, user, role) = seed_login_ready_user(&env).await;
    let now = env.now();
    let permission = seed_permission(&env.store, &tenant, "night.shift", now).await;

    let from = now + Duration::days(1);
    let to = now + Duration::days(3);
    let mut grant = RolePermission::new(role.role_id, permission.permission_id, None, now);
    grant.effective_from_utc = Some(from);
    grant.effective_to_utc = Some(to);
    push_role_permission(&env.store, role.role_id, grant).await;

    assert!(
        !env.facade.check_permission(user.user_id, "night.shift").await,
        "future-dated grant must not be active yet"
    );

    env.clock.set(from);
    assert!(
        env.facade.check_permission(user.user_id, "night.shift").await,
        "grant starts exactly at its start instant"
    );

    env.clock.set(to - Duration::seconds(1));
    assert!(env.facade.check_permission(user.user_id, "night.shift").await);

    env.clock.set(to);
    assert!(
        !env.facade.check_permission(user.user_id, "night.shift").await,
        "grant ends exactly at its end instant"
    );
}

#[tokio::test]
async fn test_disabled_grants_and_disabled_catalog_rows_contribute_nothing() {
    let env = TestEnv::new();
    let (tenant, user, role) = seed_login_ready_user(&env).await;
    let now = env.now();

    // enabled catalog row, disabled grant
    let inspect = seed_permission(&env.store, &tenant, "site.inspect", now).await;
    let mut grant = RolePermission::new(role.role_id, inspect.permission_id, None, now);
    grant.status = GrantStatus::Disabled;
    push_role_permission(&env.store, role.role_id, grant).await;

    // enabled grant, disabled catalog row
    let mut retired = seed_permission(&env.store, &tenant, "site.retired", now).await;
    retired.status = GrantStatus::Disabled;
    env.store
        .update_permission(&retired)
        .await
        .expect("Failed to update permission");
    grant_permission_to_user(&env.store, &user, &retired, now).await;

    let me = env
        .facade
        .get_current_user(user.user_id)
        .await
        .expect("current user should load");
    assert!(me.permissions.is_empty());
    assert!(!env.facade.check_permission(user.user_id, "site.inspect").await);
    assert!(!env.facade.check_permission(user.user_id, "site.retired").await);
}

#[tokio::test]
async fn test_grants_pointing_outside_the_tenant_resolve_to_nothing() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;
    let now = env.now();

    let globex = seed_tenant(&env.store, "GLOBEX", now).await;
    let foreign = seed_permission(&env.store, &globex, "secret.export", now).await;
    grant_permission_to_user(&env.store, &user, &foreign, now).await;

    assert!(!env.facade.check_permission(user.user_id, "secret.export").await);
}

#[tokio::test]
async fn test_admin_role_implies_the_wildcard() {
    let env = TestEnv::new();
    let (tenant, user, _role) = seed_login_ready_user(&env).await;
    let now = env.now();

    let admin = seed_role(&env.store, &tenant, "SYSTEM_ADMIN", now).await;
    grant_role_to_user(&env.store, &user, &admin, now).await;

    assert!(env.facade.check_permission(user.user_id, "anything.at.all").await);
    let me = env
        .facade
        .get_current_user(user.user_id)
        .await
        .expect("current user should load");
    assert!(me.permissions.contains(&"*".to_string()));
}

#[tokio::test]
async fn test_check_any_and_check_all_quantify_correctly() {
    let env = TestEnv::new();
    let (tenant, user, role) = seed_login_ready_user(&env).await;
    let now = env.now();
    let view = seed_permission(&env.store, &tenant, "project.view", now).await;
    grant_permission_to_role(&env.store, &role, &view, now).await;

    assert!(
        env.facade
            .check_any_permission(user.user_id, &["project.view", "project.delete"])
            .await
    );
    assert!(
        !env.facade
            .check_all_permissions(user.user_id, &["project.view", "project.delete"])
            .await
    );
    assert!(
        env.facade
            .check_all_permissions(user.user_id, &["project.view"])
            .await
    );

    // empty lists: any is false, all is vacuously true
    assert!(!env.facade.check_any_permission(user.user_id, &[]).await);
    assert!(env.facade.check_all_permissions(user.user_id, &[]).await);
}

#[tokio::test]
async fn test_checks_fail_closed_when_the_store_is_down() {
    let env = TestEnv::new();
    let (tenant, user, _role) = seed_login_ready_user(&env).await;
    let now = env.now();
    let admin = seed_role(&env.store, &tenant, "SYSTEM_ADMIN", now).await;
    grant_role_to_user(&env.store, &user, &admin, now).await;

    env.store.set_unavailable(true);

    assert!(!env.facade.check_permission(user.user_id, "project.view").await);
    assert!(
        !env.facade
            .check_any_permission(user.user_id, &["project.view"])
            .await
    );
    assert!(
        !env.facade
            .check_all_permissions(user.user_id, &["project.view"])
            .await
    );
}

#[tokio::test]
async fn test_display_resolution_degrades_to_the_fallback_set() {
    let env = TestEnv::new();
    let (_tenant, user, _role) = seed_login_ready_user(&env).await;

    let resolver = PermissionResolver::new(
        env.store.clone(),
        env.clock.clone(),
        AdminPolicy::standard(),
        vec!["user.view".to_string()],
    );
    env.store.set_unavailable(true);

    let err = resolver.try_resolve(user.user_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));

    let served = resolver.resolve(user.user_id).await;
    assert_eq!(
        served.into_iter().collect::<Vec<_>>(),
        vec!["user.view".to_string()]
    );
}
