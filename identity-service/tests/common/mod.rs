//! Shared fixtures for facade-level integration tests.
//!
//! Everything runs against [`MemoryStore`] with a [`ManualClock`], so tests
//! steer domain time (validity windows, token expiry) without sleeping.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use identity_service::config::{Environment, IdentityConfig, ResolverConfig, TokenConfig};
use identity_service::dtos::LoginRequest;
use identity_service::models::{
    DataScope, Menu, Permission, PermissionType, Role, RoleMenu, RolePermission, Tenant, User,
    UserMenu, UserPermission, UserRole,
};
use identity_service::services::AuthorizationFacade;
use identity_service::store::{IdentityStore, MemoryStore};
use identity_service::utils::password::{hash_password, Password};
use secrecy::Secret;
use service_core::clock::{Clock, ManualClock};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "crane-Tower-7-operator";

/// Deterministic base instant every test starts from.
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "debug".to_string(),
        store_timeout_ms: 5_000,
        token: TokenConfig {
            signing_secret: Secret::new("integration-test-signing-secret-0123".to_string()),
            issuer: "siteworks-identity".to_string(),
            audience: "siteworks-api".to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 30,
        },
        resolver: ResolverConfig {
            fallback_permissions: vec!["user.view".to_string()],
        },
    }
}

/// One facade over a fresh in-memory store and a manual clock.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub facade: AuthorizationFacade,
    pub config: IdentityConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_instant()));
        let config = test_config();
        let facade = AuthorizationFacade::new(store.clone(), clock.clone(), &config);
        Self {
            store,
            clock,
            facade,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub fn login_request(tenant_code: &str, username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        tenant_code: tenant_code.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        device_id: None,
        device_type: None,
    }
}

// --- seeding ---

pub async fn seed_tenant(store: &MemoryStore, code: &str, now: DateTime<Utc>) -> Tenant {
    let tenant = Tenant::new(code.to_string(), format!("{code} Construction"), now);
    store
        .insert_tenant(&tenant)
        .await
        .expect("Failed to insert tenant");
    tenant
}

pub async fn seed_user(
    store: &MemoryStore,
    tenant: &Tenant,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> User {
    let hash = hash_password(&Password::new(password.to_string())).expect("Failed to hash password");
    let user = User::new(
        tenant.tenant_id,
        username.to_string(),
        username.to_string(),
        hash.into_string(),
        now,
    );
    store
        .insert_user(&user)
        .await
        .expect("Failed to insert user");
    user
}

pub async fn seed_role(
    store: &MemoryStore,
    tenant: &Tenant,
    code: &str,
    now: DateTime<Utc>,
) -> Role {
    let role = Role::new(
        tenant.tenant_id,
        code.to_string(),
        code.to_string(),
        DataScope::Department,
        now,
    );
    store
        .insert_role(&role)
        .await
        .expect("Failed to insert role");
    role
}

pub async fn seed_permission(
    store: &MemoryStore,
    tenant: &Tenant,
    code: &str,
    now: DateTime<Utc>,
) -> Permission {
    let permission = Permission::new(
        tenant.tenant_id,
        None,
        code.to_string(),
        code.to_string(),
        PermissionType::Action,
        0,
        now,
    );
    store
        .insert_permission(&permission)
        .await
        .expect("Failed to insert permission");
    permission
}

pub async fn seed_menu(
    store: &MemoryStore,
    tenant: &Tenant,
    parent: Option<&Menu>,
    label: &str,
    route: &str,
    sort_order: i32,
    now: DateTime<Utc>,
) -> Menu {
    let menu = Menu::new(
        tenant.tenant_id,
        parent,
        label.to_string(),
        route.to_string(),
        sort_order,
        now,
    );
    store
        .insert_menu(&menu)
        .await
        .expect("Failed to insert menu");
    menu
}

// --- granting ---
//
// The store's replace_* calls are total, so these helpers read the current
// rows back and append before replacing.

pub async fn grant_role_to_user(store: &MemoryStore, user: &User, role: &Role, now: DateTime<Utc>) {
    let mut assignments = store
        .find_user_roles(user.user_id)
        .await
        .expect("Failed to read user roles");
    assignments.push(UserRole::new(user.user_id, role.role_id, None, now));
    store
        .replace_user_roles(user.user_id, assignments)
        .await
        .expect("Failed to replace user roles");
}

pub async fn grant_permission_to_role(
    store: &MemoryStore,
    role: &Role,
    permission: &Permission,
    now: DateTime<Utc>,
) {
    let grant = RolePermission::new(role.role_id, permission.permission_id, None, now);
    push_role_permission(store, role.role_id, grant).await;
}

/// Append a pre-built grant row, windows and status included.
pub async fn push_role_permission(store: &MemoryStore, role_id: Uuid, grant: RolePermission) {
    let mut grants = store
        .find_role_permission_grants(&[role_id])
        .await
        .expect("Failed to read role permission grants");
    grants.push(grant);
    store
        .replace_role_permissions(role_id, grants)
        .await
        .expect("Failed to replace role permissions");
}

pub async fn grant_permission_to_user(
    store: &MemoryStore,
    user: &User,
    permission: &Permission,
    now: DateTime<Utc>,
) {
    let grant = UserPermission::new(user.user_id, permission.permission_id, None, now);
    push_user_permission(store, user.user_id, grant).await;
}

pub async fn push_user_permission(store: &MemoryStore, user_id: Uuid, grant: UserPermission) {
    let mut grants = store
        .find_user_permission_grants(user_id)
        .await
        .expect("Failed to read user permission grants");
    grants.push(grant);
    store
        .replace_user_permissions(user_id, grants)
        .await
        .expect("Failed to replace user permissions");
}

pub async fn grant_menu_to_role(
    store: &MemoryStore,
    role: &Role,
    menu: &Menu,
    now: DateTime<Utc>,
) {
    let mut grants = store
        .find_role_menu_grants(&[role.role_id])
        .await
        .expect("Failed to read role menu grants");
    grants.push(RoleMenu::new(role.role_id, menu.menu_id, None, now));
    store
        .replace_role_menus(role.role_id, grants)
        .await
        .expect("Failed to replace role menus");
}

pub async fn grant_menu_to_user(
    store: &MemoryStore,
    user: &User,
    menu: &Menu,
    now: DateTime<Utc>,
) {
    let mut grants = store
        .find_user_menu_grants(user.user_id)
        .await
        .expect("Failed to read user menu grants");
    grants.push(UserMenu::new(user.user_id, menu.menu_id, None, now));
    store
        .replace_user_menus(user.user_id, grants)
        .await
        .expect("Failed to replace user menus");
}

/// Tenant, user, and a role wired together: the arrangement most tests need.
pub async fn seed_login_ready_user(env: &TestEnv) -> (Tenant, User, Role) {
    let now = env.now();
    let tenant = seed_tenant(&env.store, "ACME", now).await;
    let user = seed_user(&env.store, &tenant, "alice", TEST_PASSWORD, now).await;
    let role = seed_role(&env.store, &tenant, "FOREMAN", now).await;
    grant_role_to_user(&env.store, &user, &role, now).await;
    (tenant, user, role)
}
