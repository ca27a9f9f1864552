//! Multi-tenant identity and access control for the siteworks backend.
//!
//! Owns tenant-scoped authentication, effective permission and menu
//! resolution under validity windows, and rotating access/refresh token
//! pairs with revocation chaining. Storage sits behind
//! [`store::IdentityStore`]; [`services::AuthorizationFacade`] is the front
//! door an API edge composes.

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
