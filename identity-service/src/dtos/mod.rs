//! Request and response shapes crossing the service boundary.

pub mod auth;

pub use auth::{
    ChangePasswordRequest, CurrentUserResponse, LoginRequest, LoginResponse, RefreshRequest,
    RoleSummary, TokenPair, UserMenusResponse, UserProfile,
};
