//! Policy engine seam
//!
//! The service never decides permissions itself. It resolves the scope and
//! pin a request falls under, then asks a [`PolicyEngine`] whether the actor
//! may act, which actions it holds on a given resource, and which output
//! fields it may see.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::{Grant, GrantPolicyEngine};

use crate::context::RequestContext;
use crate::error::Result;
use crate::types::{Action, ActionSet, OutputFields, ResourceType, ScopeInfo};

/// Everything the policy engine needs to decide on a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    /// Scope of the parent auth method
    pub scope_id: String,

    pub resource_type: ResourceType,

    /// Parent auth method id the grant must be pinned to
    pub pin: String,

    pub action: Action,

    /// Target managed group, absent for collection actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl AuthorizationContext {
    pub fn new(scope_id: impl Into<String>, pin: impl Into<String>, action: Action) -> Self {
        Self {
            scope_id: scope_id.into(),
            resource_type: ResourceType::ManagedGroup,
            pin: pin.into(),
            action,
            resource_id: None,
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResults {
    /// Actor the decision was made for
    pub user_id: String,

    /// Resolved scope, rendered in the `scope` output field
    pub scope: ScopeInfo,
}

/// Policy engine collaborator
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Decide whether the actor may perform `auth.action`
    ///
    /// # Errors
    /// `PermissionDenied` when no policy permits the request, `Internal` on
    /// engine faults.
    async fn verify(&self, ctx: &RequestContext, auth: &AuthorizationContext)
        -> Result<VerifyResults>;

    /// Subset of `candidates` the actor may perform on `auth.resource_id`
    async fn fetch_action_set_for_id(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
        candidates: &[Action],
    ) -> Result<ActionSet>;

    /// Output fields granted for `auth`; `None` when no grant names any
    async fn fetch_output_fields(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
    ) -> Result<Option<OutputFields>>;
}
