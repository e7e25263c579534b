//! Repository seam for persisted auth methods and managed groups
//!
//! One repository trait per subtype. Implementations own concurrency control:
//! updates are compare-and-swap on `version` and report rows affected rather
//! than failing on a mismatch.

pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

pub use memory::InMemoryOidcRepository;

use crate::context::RequestContext;
use crate::model::{AuthMethod, ManagedGroup, OidcAuthMethod, OidcManagedGroup};
use crate::subtype::Subtype;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("request canceled")]
    Canceled,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence for OIDC auth methods and their managed groups
#[async_trait]
pub trait OidcRepository: Send + Sync {
    /// Look up an auth method; `None` when absent
    async fn lookup_auth_method(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> StoreResult<Option<OidcAuthMethod>>;

    /// Look up a managed group; `None` when absent
    async fn lookup_managed_group(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> StoreResult<Option<OidcManagedGroup>>;

    /// Persist a new managed group, assigning its id and initial version
    async fn create_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        group: OidcManagedGroup,
    ) -> StoreResult<OidcManagedGroup>;

    /// Apply the masked fields of `group` if the stored version equals `version`
    ///
    /// Returns the updated row and the number of rows affected; zero rows
    /// means the group is absent or the version did not match.
    async fn update_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        group: &OidcManagedGroup,
        version: u32,
        field_mask: &BTreeSet<&'static str>,
    ) -> StoreResult<(Option<OidcManagedGroup>, usize)>;

    /// Delete a managed group, returning rows affected
    async fn delete_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        id: &str,
    ) -> StoreResult<usize>;

    /// Managed groups belonging to an auth method
    async fn list_managed_groups(
        &self,
        ctx: &RequestContext,
        auth_method_id: &str,
    ) -> StoreResult<Vec<OidcManagedGroup>>;
}

/// Repository bound to each subtype
#[derive(Clone)]
pub struct RepositorySet {
    oidc: Arc<dyn OidcRepository>,
}

impl RepositorySet {
    pub fn new(oidc: Arc<dyn OidcRepository>) -> Self {
        Self { oidc }
    }

    pub fn oidc(&self) -> &Arc<dyn OidcRepository> {
        &self.oidc
    }

    /// Look up an auth method through its subtype's repository
    pub async fn lookup_auth_method(
        &self,
        ctx: &RequestContext,
        subtype: Subtype,
        id: &str,
    ) -> StoreResult<Option<AuthMethod>> {
        match subtype {
            Subtype::Oidc => Ok(self
                .oidc
                .lookup_auth_method(ctx, id)
                .await?
                .map(AuthMethod::Oidc)),
        }
    }

    /// Look up a managed group through its subtype's repository
    pub async fn lookup_managed_group(
        &self,
        ctx: &RequestContext,
        subtype: Subtype,
        id: &str,
    ) -> StoreResult<Option<ManagedGroup>> {
        match subtype {
            Subtype::Oidc => Ok(self
                .oidc
                .lookup_managed_group(ctx, id)
                .await?
                .map(ManagedGroup::Oidc)),
        }
    }

    /// Managed groups of an auth method, through its subtype's repository
    pub async fn list_managed_groups(
        &self,
        ctx: &RequestContext,
        subtype: Subtype,
        auth_method_id: &str,
    ) -> StoreResult<Vec<ManagedGroup>> {
        match subtype {
            Subtype::Oidc => Ok(self
                .oidc
                .list_managed_groups(ctx, auth_method_id)
                .await?
                .into_iter()
                .map(ManagedGroup::Oidc)
                .collect()),
        }
    }

    /// Delete a managed group through its subtype's repository
    pub async fn delete_managed_group(
        &self,
        ctx: &RequestContext,
        subtype: Subtype,
        scope_id: &str,
        id: &str,
    ) -> StoreResult<usize> {
        match subtype {
            Subtype::Oidc => self.oidc.delete_managed_group(ctx, scope_id, id).await,
        }
    }
}
