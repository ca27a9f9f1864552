//! Domain models for the identity subsystem.
//!
//! Every row type is tenant-scoped except the grant link rows, whose subject
//! (user or role) is itself bound to a tenant.

pub mod grant;
pub mod menu;
pub mod permission;
pub mod refresh_token;
pub mod role;
pub mod tenant;
pub mod user;

pub use grant::{GrantStatus, RoleMenu, RolePermission, UserMenu, UserPermission, UserRole};
pub use menu::{CreateMenuRequest, Menu, MenuTreeNode, UpdateMenuRequest};
pub use permission::{CreatePermissionRequest, Permission, PermissionType, UpdatePermissionRequest};
pub use refresh_token::RefreshToken;
pub use role::{DataScope, Role};
pub use tenant::Tenant;
pub use user::User;
