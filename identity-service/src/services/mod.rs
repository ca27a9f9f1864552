//! Service layer - sessions, resolution, and grant administration.
//!
//! [`AuthorizationFacade`] is the composition callers are expected to hold;
//! the parts underneath stay exported for callers that need one concern in
//! isolation.

mod authorization;
mod catalog;
mod ledger;
mod menu;
mod policy;
mod resolver;
mod token;

pub mod error;

pub use authorization::AuthorizationFacade;
pub use catalog::CatalogService;
pub use error::ServiceError;
pub use ledger::RefreshTokenLedger;
pub use menu::{build_menu_tree, default_navigation, MenuResolver};
pub use policy::{AdminPolicy, PolicyRule};
pub use resolver::PermissionResolver;
pub use token::{new_refresh_token_value, AccessTokenClaims, RoleClaim, TokenIssuer};
