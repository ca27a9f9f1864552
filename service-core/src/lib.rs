//! service-core: Shared infrastructure for siteworks services.
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;

pub use chrono;
pub use serde;
pub use tracing;
