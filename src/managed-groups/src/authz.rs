//! Authorization resolution
//!
//! Before the policy engine can decide anything it needs the scope and pin
//! the request falls under, and those come from the parent auth method. The
//! resolver walks id -> managed group -> auth method, stopping with
//! `NotFound` as soon as a link is missing, and only then consults policy.

use std::sync::Arc;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::Result;
use crate::model::{AuthMethod, ManagedGroup};
use crate::policy::{AuthorizationContext, PolicyEngine, VerifyResults};
use crate::repository::RepositorySet;
use crate::subtype::classify;
use crate::types::Action;

/// Why a resolution ended without reaching the policy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The id carries no known subtype tag
    UnknownSubtype,
    /// The target managed group does not exist
    ManagedGroup,
    /// The parent auth method is absent or of an unrecognized subtype
    AuthMethod,
}

/// Resolved chain plus the policy engine's verdict
#[derive(Debug, Clone)]
pub struct Authorized {
    pub auth_method: AuthMethod,

    /// Target group, for id-level actions
    pub managed_group: Option<ManagedGroup>,

    pub context: AuthorizationContext,
    pub results: VerifyResults,
}

/// Terminal state of a resolution that the policy engine did not reject
#[derive(Debug, Clone)]
pub enum Resolution {
    Authorized(Box<Authorized>),
    NotFound(NotFoundReason),
}

/// Resolves the parent chain of a request and submits it to policy
#[derive(Clone)]
pub struct AuthorizationResolver {
    repos: RepositorySet,
    policy: Arc<dyn PolicyEngine>,
}

impl AuthorizationResolver {
    pub fn new(repos: RepositorySet, policy: Arc<dyn PolicyEngine>) -> Self {
        Self { repos, policy }
    }

    pub fn policy(&self) -> &Arc<dyn PolicyEngine> {
        &self.policy
    }

    /// Resolve `id` for `action`
    ///
    /// For collection actions `id` is the parent auth method; otherwise it
    /// is the managed group itself.
    ///
    /// # Errors
    /// Policy denials and collaborator faults are returned unchanged.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        id: &str,
        action: Action,
    ) -> Result<Resolution> {
        ctx.ensure_active()?;

        let mut managed_group = None;
        let parent_id = if action.is_collection_action() {
            id.to_string()
        } else {
            let Some(subtype) = classify(id) else {
                return Ok(Resolution::NotFound(NotFoundReason::UnknownSubtype));
            };
            let Some(group) = self.repos.lookup_managed_group(ctx, subtype, id).await? else {
                debug!(managed_group_id = %id, "Managed group not found");
                return Ok(Resolution::NotFound(NotFoundReason::ManagedGroup));
            };
            let parent_id = group.auth_method_id().to_string();
            managed_group = Some(group);
            parent_id
        };

        let Some(parent_subtype) = classify(&parent_id) else {
            return Ok(Resolution::NotFound(NotFoundReason::AuthMethod));
        };
        let Some(auth_method) = self
            .repos
            .lookup_auth_method(ctx, parent_subtype, &parent_id)
            .await?
        else {
            debug!(auth_method_id = %parent_id, "Auth method not found");
            return Ok(Resolution::NotFound(NotFoundReason::AuthMethod));
        };

        let mut context =
            AuthorizationContext::new(auth_method.scope_id(), auth_method.public_id(), action);
        if let Some(group) = &managed_group {
            context = context.with_resource_id(group.public_id());
        }

        let results = self.policy.verify(ctx, &context).await?;

        Ok(Resolution::Authorized(Box::new(Authorized {
            auth_method,
            managed_group,
            context,
            results,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManagedGroupError;
    use crate::model::{OidcAuthMethod, OidcManagedGroup};
    use crate::policy::{Grant, GrantPolicyEngine};
    use crate::repository::InMemoryOidcRepository;

    fn resolver(grants: Vec<Grant>) -> AuthorizationResolver {
        let repo = InMemoryOidcRepository::new();
        repo.insert_auth_method(OidcAuthMethod::new("amoidc_1234567890", "o_1234567890"));
        repo.insert_managed_group(OidcManagedGroup {
            public_id: "mgoidc_1234567890".to_string(),
            auth_method_id: "amoidc_1234567890".to_string(),
            filter: "true".to_string(),
            version: 1,
            ..OidcManagedGroup::default()
        });
        repo.insert_managed_group(OidcManagedGroup {
            public_id: "mgoidc_dangling00".to_string(),
            auth_method_id: "amoidc_missing000".to_string(),
            filter: "true".to_string(),
            version: 1,
            ..OidcManagedGroup::default()
        });

        AuthorizationResolver::new(
            RepositorySet::new(Arc::new(repo)),
            Arc::new(GrantPolicyEngine::with_grants(grants)),
        )
    }

    #[tokio::test]
    async fn test_resolve_read() {
        let resolver = resolver(vec![Grant::new("*", "o_1234567890", [Action::Read])
            .with_resource_id("mgoidc_*")]);
        let ctx = RequestContext::new("u_1234567890");

        let Resolution::Authorized(authorized) = resolver
            .resolve(&ctx, "mgoidc_1234567890", Action::Read)
            .await
            .unwrap()
        else {
            panic!("Expected authorized");
        };
        assert_eq!(authorized.context.scope_id, "o_1234567890");
        assert_eq!(authorized.context.pin, "amoidc_1234567890");
        assert_eq!(authorized.context.resource_id.as_deref(), Some("mgoidc_1234567890"));
        assert!(authorized.managed_group.is_some());
    }

    #[tokio::test]
    async fn test_unknown_subtype_is_not_found() {
        let resolver = resolver(vec![Grant::new("*", "*", [Action::Read])]);
        let ctx = RequestContext::new("u_1");
        let resolution = resolver.resolve(&ctx, "mgpw_1234567890", Action::Read).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::NotFound(NotFoundReason::UnknownSubtype)
        ));
    }

    #[tokio::test]
    async fn test_missing_group_is_not_found_before_policy() {
        // No grants: reaching policy would be PermissionDenied
        let resolver = resolver(vec![]);
        let ctx = RequestContext::new("u_1");
        let resolution = resolver
            .resolve(&ctx, "mgoidc_0000000000", Action::Delete)
            .await
            .unwrap();
        assert!(matches!(
            resolution,
            Resolution::NotFound(NotFoundReason::ManagedGroup)
        ));
    }

    #[tokio::test]
    async fn test_dangling_parent_is_not_found() {
        let resolver = resolver(vec![]);
        let ctx = RequestContext::new("u_1");
        let resolution = resolver
            .resolve(&ctx, "mgoidc_dangling00", Action::Read)
            .await
            .unwrap();
        assert!(matches!(
            resolution,
            Resolution::NotFound(NotFoundReason::AuthMethod)
        ));
    }

    #[tokio::test]
    async fn test_policy_denial_propagates() {
        let resolver = resolver(vec![]);
        let ctx = RequestContext::new("u_1");
        let err = resolver
            .resolve(&ctx, "amoidc_1234567890", Action::List)
            .await
            .unwrap_err();
        assert!(matches!(err, ManagedGroupError::PermissionDenied(_)));
    }
}
