//! Grant-list policy engine
//!
//! A grant permits a principal pattern to perform a set of actions on
//! managed groups matching a resource pattern, inside a scope and optionally
//! pinned to one auth method. Patterns accept `*` wildcards.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AuthorizationContext, PolicyEngine, VerifyResults};
use crate::context::RequestContext;
use crate::error::{ManagedGroupError, Result};
use crate::types::{Action, ActionSet, OutputFields, ScopeInfo};

/// Message returned for every denied request
pub const FORBIDDEN_MESSAGE: &str = "Forbidden.";

fn wildcard() -> String {
    "*".to_string()
}

/// Single permission grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Principal pattern (e.g., "u_1234567890", "u_*", "*")
    pub principal: String,

    /// Scope pattern
    pub scope_id: String,

    /// Auth method the grant is pinned to, any when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,

    /// Managed group id pattern; collection actions need `*`
    #[serde(default = "wildcard")]
    pub resource_id: String,

    /// Permitted action names, `*` for all
    pub actions: Vec<String>,

    /// Output fields granted, `*` for all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<Vec<String>>,
}

impl Grant {
    pub fn new(
        principal: impl Into<String>,
        scope_id: impl Into<String>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            principal: principal.into(),
            scope_id: scope_id.into(),
            pin: None,
            resource_id: wildcard(),
            actions: actions.into_iter().map(|a| a.as_str().to_string()).collect(),
            output_fields: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_resource_id(mut self, pattern: impl Into<String>) -> Self {
        self.resource_id = pattern.into();
        self
    }

    pub fn with_output_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Whether this grant permits `action` for the actor in `auth`
    pub fn permits(&self, user_id: &str, auth: &AuthorizationContext, action: Action) -> bool {
        let resource = auth.resource_id.as_deref().unwrap_or("*");

        matches_pattern(&self.principal, user_id)
            && matches_pattern(&self.scope_id, &auth.scope_id)
            && self.pin.as_deref().map_or(true, |pin| pin == auth.pin)
            && matches_pattern(&self.resource_id, resource)
            && self
                .actions
                .iter()
                .any(|a| a == "*" || a == action.as_str())
    }
}

/// Match a pattern against a value (supports wildcards)
fn matches_pattern(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        let regex_pattern = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        if let Ok(regex) = regex::Regex::new(&format!("^{}$", regex_pattern)) {
            return regex.is_match(value);
        }
    }

    pattern == value
}

/// In-memory policy engine evaluating a list of grants
pub struct GrantPolicyEngine {
    grants: Arc<RwLock<Vec<Grant>>>,
    scopes: DashMap<String, ScopeInfo>,
}

impl GrantPolicyEngine {
    /// Create an engine with no grants; every request is denied
    pub fn new() -> Self {
        Self {
            grants: Arc::new(RwLock::new(Vec::new())),
            scopes: DashMap::new(),
        }
    }

    /// Create an engine seeded with grants
    pub fn with_grants(grants: impl IntoIterator<Item = Grant>) -> Self {
        Self {
            grants: Arc::new(RwLock::new(grants.into_iter().collect())),
            scopes: DashMap::new(),
        }
    }

    pub async fn add_grant(&self, grant: Grant) {
        self.grants.write().await.push(grant);
    }

    /// Register display details for a scope
    pub fn add_scope(&self, scope: ScopeInfo) {
        self.scopes.insert(scope.id.clone(), scope);
    }

    fn scope_info(&self, scope_id: &str) -> ScopeInfo {
        self.scopes
            .get(scope_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| ScopeInfo::from_id(scope_id))
    }
}

impl Default for GrantPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyEngine for GrantPolicyEngine {
    async fn verify(
        &self,
        ctx: &RequestContext,
        auth: &AuthorizationContext,
    ) -> Result<VerifyResults> {
        ctx.ensure_active()?;

        let grants = self.grants.read().await;
        if !grants.iter().any(|g| g.permits(&ctx.user_id, auth, auth.action)) {
            debug!(
                user_id = %ctx.user_id,
                scope_id = %auth.scope_id,
                action = %auth.action,
                "No grant permits request"
            );
            return Err(ManagedGroupError::PermissionDenied(FORBIDDEN_MESSAGE.to_string()));
        }

        Ok(VerifyResults {
            user_id: ctx.user_id.clone(),
            scope: self.scope_info(&auth.scope_id),
        })
    }

    async fn fetch_action_set_for_id(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
        candidates: &[Action],
    ) -> Result<ActionSet> {
        ctx.ensure_active()?;

        let grants = self.grants.read().await;
        Ok(candidates
            .iter()
            .copied()
            .filter(|action| grants.iter().any(|g| g.permits(&results.user_id, auth, *action)))
            .collect())
    }

    async fn fetch_output_fields(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
    ) -> Result<Option<OutputFields>> {
        ctx.ensure_active()?;

        let grants = self.grants.read().await;
        let granted = grants
            .iter()
            .filter(|g| g.permits(&results.user_id, auth, auth.action))
            .filter_map(|g| g.output_fields.as_ref())
            .map(OutputFields::from_fields)
            .reduce(|acc, f| acc.union(&f));

        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(action: Action) -> AuthorizationContext {
        AuthorizationContext::new("o_1234567890", "amoidc_1234567890", action)
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("u_*", "u_1234567890"));
        assert!(matches_pattern("mgoidc_a.c*", "mgoidc_a.c1"));
        assert!(!matches_pattern("mgoidc_a.c*", "mgoidc_abc1"));
        assert!(!matches_pattern("u_1", "u_12"));
    }

    #[test]
    fn test_collection_action_needs_wildcard_resource() {
        let scoped = Grant::new("*", "o_*", [Action::List]).with_resource_id("mgoidc_1");
        assert!(!scoped.permits("u_1", &auth(Action::List), Action::List));

        let open = Grant::new("*", "o_*", [Action::List]);
        assert!(open.permits("u_1", &auth(Action::List), Action::List));
    }

    #[test]
    fn test_pin_restricts_auth_method() {
        let grant = Grant::new("u_1", "o_1234567890", [Action::Read]).with_pin("amoidc_other");
        let ctx = auth(Action::Read).with_resource_id("mgoidc_1");
        assert!(!grant.permits("u_1", &ctx, Action::Read));
    }

    #[tokio::test]
    async fn test_verify_denied_without_grant() {
        let engine = GrantPolicyEngine::new();
        let ctx = RequestContext::new("u_1234567890");
        let err = engine.verify(&ctx, &auth(Action::List)).await.unwrap_err();
        assert!(matches!(err, ManagedGroupError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_verify_resolves_registered_scope() {
        let engine = GrantPolicyEngine::with_grants([Grant::new("*", "*", [Action::List])]);
        engine.add_scope(ScopeInfo {
            name: "Engineering".to_string(),
            ..ScopeInfo::from_id("o_1234567890")
        });

        let results = engine
            .verify(&RequestContext::new("u_1234567890"), &auth(Action::List))
            .await
            .unwrap();
        assert_eq!(results.scope.name, "Engineering");
        assert_eq!(results.scope.scope_type, "org");
    }

    #[tokio::test]
    async fn test_fetch_action_set_for_id() {
        let engine = GrantPolicyEngine::with_grants([
            Grant::new("u_1", "*", [Action::Read]).with_resource_id("mgoidc_a*"),
            Grant::new("u_1", "*", [Action::Update]).with_resource_id("mgoidc_abc"),
        ]);
        let ctx = RequestContext::new("u_1");
        let results = VerifyResults {
            user_id: "u_1".to_string(),
            scope: ScopeInfo::from_id("o_1234567890"),
        };
        let candidates = [Action::NoOp, Action::Read, Action::Update, Action::Delete];

        let abc = auth(Action::List).with_resource_id("mgoidc_abc");
        let set = engine
            .fetch_action_set_for_id(&ctx, &results, &abc, &candidates)
            .await
            .unwrap();
        assert_eq!(set.strings(), vec!["read", "update"]);

        let other = auth(Action::List).with_resource_id("mgoidc_xyz");
        let set = engine
            .fetch_action_set_for_id(&ctx, &results, &other, &candidates)
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_output_fields_union() {
        let engine = GrantPolicyEngine::with_grants([
            Grant::new("*", "*", [Action::Read]).with_output_fields(["id", "name"]),
            Grant::new("*", "*", [Action::Read]).with_output_fields(["version"]),
            Grant::new("*", "*", [Action::Read]),
        ]);
        let ctx = RequestContext::new("u_1");
        let results = VerifyResults {
            user_id: "u_1".to_string(),
            scope: ScopeInfo::from_id("global"),
        };

        let fields = engine
            .fetch_output_fields(&ctx, &results, &auth(Action::Read).with_resource_id("mgoidc_1"))
            .await
            .unwrap()
            .unwrap();
        assert!(fields.has("id"));
        assert!(fields.has("version"));
        assert!(!fields.has("attributes"));

        let none = engine
            .fetch_output_fields(&ctx, &results, &auth(Action::Delete).with_resource_id("mgoidc_1"))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
