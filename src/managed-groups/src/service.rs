//! Managed group service
//!
//! Every operation runs the same pipeline: offline validation, parent chain
//! resolution and policy verification, the repository call, then projection
//! through the actor's output fields.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::api::{
    CreateManagedGroupRequest, CreateManagedGroupResponse, DeleteManagedGroupRequest,
    DeleteManagedGroupResponse, GetManagedGroupRequest, GetManagedGroupResponse,
    ListManagedGroupsRequest, ListManagedGroupsResponse, ManagedGroupItem,
    UpdateManagedGroupRequest, UpdateManagedGroupResponse,
};
use crate::attributes::{self, ManagedGroupAttributes};
use crate::authz::{AuthorizationResolver, Authorized, NotFoundReason, Resolution};
use crate::config::ServiceConfig;
use crate::context::RequestContext;
use crate::error::{ManagedGroupError, Result, INVALID_REQUEST_MESSAGE};
use crate::filter::Filter;
use crate::model::{ManagedGroup, ManagedGroupOptions, OidcManagedGroup};
use crate::policy::{AuthorizationContext, PolicyEngine, VerifyResults};
use crate::projection::{project, ManagedGroupView, ProjectionOptions};
use crate::repository::{RepositorySet, StoreError};
use crate::subtype::{classify, Subtype};
use crate::types::{fields, id_actions, Action, ActionSet, OutputFields};
use crate::validation::{self, MSG_MALFORMED_ATTRIBUTES};

/// Request-processing core for managed groups
#[derive(Clone)]
pub struct ManagedGroupService {
    repos: RepositorySet,
    resolver: AuthorizationResolver,
    config: ServiceConfig,
}

impl ManagedGroupService {
    pub fn new(repos: RepositorySet, policy: Arc<dyn PolicyEngine>) -> Self {
        Self {
            resolver: AuthorizationResolver::new(repos.clone(), policy),
            repos,
            config: ServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn policy(&self) -> &Arc<dyn PolicyEngine> {
        self.resolver.policy()
    }

    /// List the managed groups of an auth method visible to the actor
    #[instrument(skip_all, fields(user_id = %ctx.user_id, auth_method_id = %req.auth_method_id))]
    pub async fn list_managed_groups(
        &self,
        ctx: &RequestContext,
        req: ListManagedGroupsRequest,
    ) -> Result<ListManagedGroupsResponse> {
        validation::validate_list_request(&req)?;

        let authorized = require_authorized(
            self.resolver
                .resolve(ctx, &req.auth_method_id, Action::List)
                .await?,
        )?;
        let subtype = authorized.auth_method.subtype();
        let groups = self
            .repos
            .list_managed_groups(ctx, subtype, &req.auth_method_id)
            .await?;
        if groups.is_empty() {
            return Ok(ListManagedGroupsResponse::default());
        }

        let candidates = groups.len();
        let mut views = Vec::with_capacity(candidates);
        for group in &groups {
            ctx.ensure_active()?;
            let item_context = AuthorizationContext::new(
                authorized.results.scope.id.clone(),
                req.auth_method_id.clone(),
                Action::List,
            )
            .with_resource_id(group.public_id());

            let actions = self
                .policy()
                .fetch_action_set_for_id(
                    ctx,
                    &authorized.results,
                    &item_context,
                    id_actions(group.subtype()),
                )
                .await?;
            if actions.is_empty() {
                continue;
            }

            let output_fields = self
                .output_fields(ctx, &authorized.results, &item_context)
                .await?;
            views.push(project(
                group,
                ProjectionOptions::new()
                    .with_output_fields(&output_fields)
                    .with_scope(&authorized.results.scope)
                    .with_authorized_actions(&actions),
            )?);
        }

        // The filter sees only the projected, authorized view of each item
        let filter = Filter::new(&req.filter).map_err(|e| {
            ManagedGroupError::invalid_field(INVALID_REQUEST_MESSAGE, fields::FILTER, e.to_string())
        })?;
        let mut items = Vec::with_capacity(views.len());
        for view in views {
            let value = serde_json::to_value(&view)
                .map_err(|e| ManagedGroupError::internal(e.to_string()))?;
            if filter.matches(&value) {
                items.push(view);
            }
        }

        debug!(candidates, returned = items.len(), "Listed managed groups");
        Ok(ListManagedGroupsResponse { items })
    }

    /// Read a single managed group
    #[instrument(skip_all, fields(user_id = %ctx.user_id, managed_group_id = %req.id))]
    pub async fn get_managed_group(
        &self,
        ctx: &RequestContext,
        req: GetManagedGroupRequest,
    ) -> Result<GetManagedGroupResponse> {
        validation::validate_get_request(&req)?;

        let authorized =
            require_authorized(self.resolver.resolve(ctx, &req.id, Action::Read).await?)?;
        let Some(group) = authorized.managed_group.as_ref() else {
            return Err(ManagedGroupError::internal(
                "managed group missing from resolved read",
            ));
        };

        let item = self
            .render(ctx, &authorized.results, &authorized.context, group)
            .await?;
        Ok(GetManagedGroupResponse { item })
    }

    /// Create a managed group under an auth method
    #[instrument(skip_all, fields(user_id = %ctx.user_id, auth_method_id = %req.item.auth_method_id))]
    pub async fn create_managed_group(
        &self,
        ctx: &RequestContext,
        req: CreateManagedGroupRequest,
    ) -> Result<CreateManagedGroupResponse> {
        validation::validate_create_request(&req)?;

        let authorized = require_authorized(
            self.resolver
                .resolve(ctx, &req.item.auth_method_id, Action::Create)
                .await?,
        )?;

        let created = match authorized.auth_method.subtype() {
            Subtype::Oidc => {
                let draft = new_oidc_draft(authorized.auth_method.public_id(), &req.item)?;
                ctx.ensure_active()?;
                let created = self
                    .repos
                    .oidc()
                    .create_managed_group(ctx, authorized.auth_method.scope_id(), draft)
                    .await?;
                ManagedGroup::Oidc(created)
            }
        };
        info!(managed_group_id = %created.public_id(), "Created managed group");

        let context = authorized
            .context
            .clone()
            .with_resource_id(created.public_id());
        let item = self
            .render(ctx, &authorized.results, &context, &created)
            .await?;
        let uri = self.config.location(created.public_id());

        Ok(CreateManagedGroupResponse { item, uri })
    }

    /// Apply a masked partial update at a known version
    #[instrument(skip_all, fields(user_id = %ctx.user_id, managed_group_id = %req.id))]
    pub async fn update_managed_group(
        &self,
        ctx: &RequestContext,
        req: UpdateManagedGroupRequest,
    ) -> Result<UpdateManagedGroupResponse> {
        let mask = validation::validate_update_request(&req)?;

        let authorized =
            require_authorized(self.resolver.resolve(ctx, &req.id, Action::Update).await?)?;
        let scope_id = authorized.results.scope.id.as_str();
        let version = req.item.version.unwrap_or_default();

        let updated = match classify(&req.id) {
            Some(Subtype::Oidc) => {
                let draft = oidc_update_draft(&req.id, &req.item)?;
                ctx.ensure_active()?;
                let (updated, rows) = self
                    .repos
                    .oidc()
                    .update_managed_group(ctx, scope_id, &draft, version, &mask)
                    .await?;
                if rows == 0 {
                    return Err(ManagedGroupError::not_found(format!(
                        "Managed Group {:?} doesn't exist or incorrect version provided.",
                        req.id
                    )));
                }
                let Some(updated) = updated else {
                    return Err(ManagedGroupError::internal(
                        "Unable to update managed group but no error returned from repository.",
                    ));
                };
                ManagedGroup::Oidc(updated)
            }
            None => return Err(ManagedGroupError::not_found_default()),
        };
        info!(version = updated.version(), "Updated managed group");

        let item = self
            .render(ctx, &authorized.results, &authorized.context, &updated)
            .await?;
        Ok(UpdateManagedGroupResponse { item })
    }

    /// Delete a managed group; absent targets report `deleted: false`
    #[instrument(skip_all, fields(user_id = %ctx.user_id, managed_group_id = %req.id))]
    pub async fn delete_managed_group(
        &self,
        ctx: &RequestContext,
        req: DeleteManagedGroupRequest,
    ) -> Result<DeleteManagedGroupResponse> {
        validation::validate_delete_request(&req)?;

        let authorized = match self.resolver.resolve(ctx, &req.id, Action::Delete).await? {
            Resolution::Authorized(authorized) => authorized,
            Resolution::NotFound(NotFoundReason::ManagedGroup) => {
                debug!("Managed group already absent");
                return Ok(DeleteManagedGroupResponse { deleted: false });
            }
            Resolution::NotFound(_) => return Err(ManagedGroupError::not_found_default()),
        };
        let Some(subtype) = classify(&req.id) else {
            return Err(ManagedGroupError::not_found_default());
        };

        ctx.ensure_active()?;
        let rows = match self
            .repos
            .delete_managed_group(ctx, subtype, &authorized.results.scope.id, &req.id)
            .await
        {
            Ok(rows) => rows,
            Err(StoreError::NotFound { .. }) => 0,
            Err(e) => return Err(e.into()),
        };

        let deleted = rows > 0;
        info!(deleted, "Deleted managed group");
        Ok(DeleteManagedGroupResponse { deleted })
    }

    /// Output fields for `auth`: granted or defaulted, narrowed to what the
    /// request asked for
    async fn output_fields(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
    ) -> Result<OutputFields> {
        let granted = self
            .policy()
            .fetch_output_fields(ctx, results, auth)
            .await?;
        let fields = OutputFields::self_or_defaults(granted, &results.user_id);
        Ok(match &ctx.requested_fields {
            Some(requested) => fields.intersect(requested),
            None => fields,
        })
    }

    /// Project a single group for get, create and update responses
    async fn render(
        &self,
        ctx: &RequestContext,
        results: &VerifyResults,
        auth: &AuthorizationContext,
        group: &ManagedGroup,
    ) -> Result<ManagedGroupView> {
        let output_fields = self.output_fields(ctx, results, auth).await?;

        let actions = if output_fields.has(fields::AUTHORIZED_ACTIONS) {
            let item_context = auth.clone().with_resource_id(group.public_id());
            self.policy()
                .fetch_action_set_for_id(ctx, results, &item_context, id_actions(group.subtype()))
                .await?
        } else {
            ActionSet::default()
        };

        project(
            group,
            ProjectionOptions::new()
                .with_output_fields(&output_fields)
                .with_scope(&results.scope)
                .with_authorized_actions(&actions),
        )
    }
}

fn require_authorized(resolution: Resolution) -> Result<Box<Authorized>> {
    match resolution {
        Resolution::Authorized(authorized) => Ok(authorized),
        Resolution::NotFound(reason) => {
            debug!(?reason, "Resolution ended in not found");
            Err(ManagedGroupError::not_found_default())
        }
    }
}

fn oidc_attributes(item: &ManagedGroupItem) -> Result<attributes::OidcManagedGroupAttributes> {
    match attributes::decode(Subtype::Oidc, item.attributes.as_ref()) {
        Ok(ManagedGroupAttributes::Oidc(attrs)) => Ok(attrs),
        Err(_) => Err(ManagedGroupError::invalid_field(
            INVALID_REQUEST_MESSAGE,
            fields::ATTRIBUTES,
            MSG_MALFORMED_ATTRIBUTES,
        )),
    }
}

fn new_oidc_draft(auth_method_id: &str, item: &ManagedGroupItem) -> Result<OidcManagedGroup> {
    let attrs = oidc_attributes(item)?;

    let mut opts = ManagedGroupOptions::default();
    if let Some(name) = &item.name {
        opts = opts.with_name(name);
    }
    if let Some(description) = &item.description {
        opts = opts.with_description(description);
    }

    OidcManagedGroup::new(auth_method_id, attrs.filter, opts).map_err(|e| {
        ManagedGroupError::internal(format!("Unable to build managed group for creation: {}.", e))
    })
}

fn oidc_update_draft(id: &str, item: &ManagedGroupItem) -> Result<OidcManagedGroup> {
    let mut draft = OidcManagedGroup::alloc();
    draft.public_id = id.to_string();
    draft.name = item.name.clone().unwrap_or_default();
    draft.description = item.description.clone().unwrap_or_default();
    if item.attributes.is_some() {
        // Only takes effect when the mask names the filter
        draft.filter = oidc_attributes(item)?.filter;
    }
    Ok(draft)
}
