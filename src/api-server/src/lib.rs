//! HTTP surface for the managed group service

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::{build_router, MANAGED_GROUPS_PATH};
pub use state::AppState;
