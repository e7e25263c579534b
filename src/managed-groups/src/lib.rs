//! # CretoAI Managed Groups
//!
//! Request-processing core for managed groups: named sets of externally
//! authenticated principals whose membership is a subtype-specific rule,
//! such as a filter expression over OIDC claims.
//!
//! ## Features
//!
//! - **Subtype dispatch** by structural id prefix, with no storage lookups
//! - **Parent-chain authorization**: scope and pin come from the owning auth method
//! - **Per-item list authorization** with actor-scoped output projection
//! - **Masked partial updates** with optimistic concurrency on `version`
//! - **CEL filters** for OIDC membership rules and client list filters
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cretoai_managed_groups::{
//!     api::ListManagedGroupsRequest, Action, Grant, GrantPolicyEngine,
//!     InMemoryOidcRepository, ManagedGroupService, OidcAuthMethod, RepositorySet,
//!     RequestContext,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = InMemoryOidcRepository::new();
//!     repo.insert_auth_method(OidcAuthMethod::new("amoidc_1234567890", "o_1234567890"));
//!     let policy = GrantPolicyEngine::with_grants([Grant::new("*", "*", [Action::List])]);
//!
//!     let service = ManagedGroupService::new(
//!         RepositorySet::new(Arc::new(repo)),
//!         Arc::new(policy),
//!     );
//!
//!     let response = service
//!         .list_managed_groups(
//!             &RequestContext::new("u_1234567890"),
//!             ListManagedGroupsRequest {
//!                 auth_method_id: "amoidc_1234567890".to_string(),
//!                 filter: String::new(),
//!             },
//!         )
//!         .await?;
//!     assert!(response.items.is_empty());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod attributes;
pub mod authz;
pub mod config;
pub mod context;
pub mod error;
pub mod filter; // CEL filter expressions
pub mod mask;
pub mod model;
pub mod policy;
pub mod projection;
pub mod repository;
pub mod service;
pub mod subtype;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use authz::{AuthorizationResolver, Authorized, NotFoundReason, Resolution};
pub use config::{BootstrapConfig, ConfigError, ServiceConfig};
pub use context::{RequestContext, ANONYMOUS_USER_ID};
pub use error::{ErrorKind, ManagedGroupError, Result};
pub use model::{AuthMethod, ManagedGroup, OidcAuthMethod, OidcManagedGroup};
pub use policy::{AuthorizationContext, Grant, GrantPolicyEngine, PolicyEngine, VerifyResults};
pub use projection::ManagedGroupView;
pub use repository::{InMemoryOidcRepository, OidcRepository, RepositorySet, StoreError};
pub use service::ManagedGroupService;
pub use subtype::{classify, Subtype};
pub use types::{Action, ActionSet, OutputFields, ScopeInfo};
