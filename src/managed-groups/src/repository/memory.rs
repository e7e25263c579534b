//! In-memory OIDC repository

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

use super::{OidcRepository, StoreError, StoreResult};
use crate::context::RequestContext;
use crate::mask::storage;
use crate::model::{OidcAuthMethod, OidcManagedGroup};
use crate::subtype::OIDC_MANAGED_GROUP_PREFIX;

const ID_SUFFIX_LEN: usize = 10;

/// Fresh ids to try before giving up on a create
const MAX_ID_ATTEMPTS: usize = 3;

const UPDATABLE_FIELDS: [&str; 3] = [storage::NAME, storage::DESCRIPTION, storage::FILTER];

fn ensure_active(ctx: &RequestContext) -> StoreResult<()> {
    if ctx.is_cancelled() {
        return Err(StoreError::Canceled);
    }
    Ok(())
}

fn new_managed_group_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", OIDC_MANAGED_GROUP_PREFIX, &suffix[..ID_SUFFIX_LEN])
}

/// DashMap-backed repository, safe for concurrent requests
#[derive(Default)]
pub struct InMemoryOidcRepository {
    auth_methods: DashMap<String, OidcAuthMethod>,
    managed_groups: DashMap<String, OidcManagedGroup>,
}

impl InMemoryOidcRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an auth method
    pub fn insert_auth_method(&self, auth_method: OidcAuthMethod) {
        self.auth_methods
            .insert(auth_method.public_id.clone(), auth_method);
    }

    /// Store a managed group as-is, bypassing id and version assignment
    pub fn insert_managed_group(&self, group: OidcManagedGroup) {
        self.managed_groups.insert(group.public_id.clone(), group);
    }

    pub fn managed_group_count(&self) -> usize {
        self.managed_groups.len()
    }

    /// Store a new group under the first generated id not already taken
    fn insert_new(
        &self,
        mut group: OidcManagedGroup,
        mut next_id: impl FnMut() -> String,
    ) -> StoreResult<OidcManagedGroup> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = next_id();
            if let Entry::Vacant(slot) = self.managed_groups.entry(id.clone()) {
                group.public_id = id;
                slot.insert(group.clone());
                return Ok(group);
            }
            debug!(managed_group_id = %id, "Generated id already in use");
        }
        Err(StoreError::Backend(format!(
            "no unused managed group id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    fn scope_of(&self, auth_method_id: &str) -> Option<String> {
        self.auth_methods
            .get(auth_method_id)
            .map(|am| am.scope_id.clone())
    }
}

#[async_trait]
impl OidcRepository for InMemoryOidcRepository {
    async fn lookup_auth_method(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> StoreResult<Option<OidcAuthMethod>> {
        ensure_active(ctx)?;
        Ok(self.auth_methods.get(id).map(|am| am.clone()))
    }

    async fn lookup_managed_group(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> StoreResult<Option<OidcManagedGroup>> {
        ensure_active(ctx)?;
        Ok(self.managed_groups.get(id).map(|g| g.clone()))
    }

    async fn create_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        mut group: OidcManagedGroup,
    ) -> StoreResult<OidcManagedGroup> {
        ensure_active(ctx)?;

        if !group.public_id.is_empty() {
            return Err(StoreError::InvalidParameter("public id not empty".to_string()));
        }
        if group.filter.is_empty() {
            return Err(StoreError::InvalidParameter("missing filter".to_string()));
        }
        match self.scope_of(&group.auth_method_id) {
            None => return Err(StoreError::not_found("AuthMethod", group.auth_method_id)),
            Some(scope) if scope != scope_id => {
                return Err(StoreError::InvalidParameter(format!(
                    "auth method {} is not in scope {}",
                    group.auth_method_id, scope_id
                )));
            }
            Some(_) => {}
        }

        let now = Utc::now();
        group.version = 1;
        group.create_time = Some(now);
        group.update_time = Some(now);

        let group = self.insert_new(group, new_managed_group_id)?;
        debug!(managed_group_id = %group.public_id, "Managed group stored");

        Ok(group)
    }

    async fn update_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        group: &OidcManagedGroup,
        version: u32,
        field_mask: &BTreeSet<&'static str>,
    ) -> StoreResult<(Option<OidcManagedGroup>, usize)> {
        ensure_active(ctx)?;

        if field_mask.is_empty() {
            return Err(StoreError::InvalidParameter("empty field mask".to_string()));
        }
        if let Some(other) = field_mask.iter().find(|f| !UPDATABLE_FIELDS.contains(*f)) {
            return Err(StoreError::InvalidParameter(format!(
                "invalid field mask: {}",
                other
            )));
        }
        if field_mask.contains(storage::FILTER) && group.filter.is_empty() {
            return Err(StoreError::InvalidParameter("filter cannot be empty".to_string()));
        }

        let Some(mut stored) = self.managed_groups.get_mut(&group.public_id) else {
            return Ok((None, 0));
        };
        if stored.version != version
            || self.scope_of(&stored.auth_method_id).as_deref() != Some(scope_id)
        {
            return Ok((None, 0));
        }

        for field in field_mask {
            match *field {
                storage::NAME => stored.name = group.name.clone(),
                storage::DESCRIPTION => stored.description = group.description.clone(),
                storage::FILTER => stored.filter = group.filter.clone(),
                _ => {}
            }
        }
        stored.version += 1;
        stored.update_time = Some(Utc::now());

        Ok((Some(stored.clone()), 1))
    }

    async fn delete_managed_group(
        &self,
        ctx: &RequestContext,
        scope_id: &str,
        id: &str,
    ) -> StoreResult<usize> {
        ensure_active(ctx)?;

        let removed = self.managed_groups.remove_if(id, |_, g| {
            self.scope_of(&g.auth_method_id).as_deref() == Some(scope_id)
        });
        Ok(usize::from(removed.is_some()))
    }

    async fn list_managed_groups(
        &self,
        ctx: &RequestContext,
        auth_method_id: &str,
    ) -> StoreResult<Vec<OidcManagedGroup>> {
        ensure_active(ctx)?;

        let mut groups: Vec<OidcManagedGroup> = self
            .managed_groups
            .iter()
            .filter(|g| g.auth_method_id == auth_method_id)
            .map(|g| g.clone())
            .collect();
        groups.sort_by(|a, b| a.public_id.cmp(&b.public_id));
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ManagedGroupOptions;
    use crate::subtype::valid_managed_group_id;

    const SCOPE: &str = "o_1234567890";
    const AUTH_METHOD: &str = "amoidc_1234567890";

    fn repo() -> InMemoryOidcRepository {
        let repo = InMemoryOidcRepository::new();
        repo.insert_auth_method(OidcAuthMethod::new(AUTH_METHOD, SCOPE));
        repo
    }

    fn draft(filter: &str) -> OidcManagedGroup {
        OidcManagedGroup::new(AUTH_METHOD, filter, ManagedGroupOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_version() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        let group = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap();

        assert!(valid_managed_group_id(&group.public_id));
        assert_eq!(group.public_id.len(), "mgoidc_".len() + ID_SUFFIX_LEN);
        assert_eq!(group.version, 1);
        assert!(group.create_time.is_some());
    }

    #[tokio::test]
    async fn test_create_unknown_auth_method() {
        let repo = InMemoryOidcRepository::new();
        let ctx = RequestContext::new("u_1");
        let err = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_compare_and_swap() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        let created = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap();

        let mut changes = OidcManagedGroup::alloc();
        changes.public_id = created.public_id.clone();
        changes.name = "renamed".to_string();
        let mask = BTreeSet::from([storage::NAME]);

        let (updated, rows) = repo
            .update_managed_group(&ctx, SCOPE, &changes, 1, &mask)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        let updated = updated.unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.filter, "true");
        assert_eq!(updated.version, 2);

        let (stale, rows) = repo
            .update_managed_group(&ctx, SCOPE, &changes, 1, &mask)
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_field_leaves_row_untouched() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        let created = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap();

        let mut changes = OidcManagedGroup::alloc();
        changes.public_id = created.public_id.clone();
        changes.name = "renamed".to_string();
        let mask = BTreeSet::from([storage::NAME, "Bogus"]);

        let err = repo
            .update_managed_group(&ctx, SCOPE, &changes, 1, &mask)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidParameter(_)));

        let stored = repo
            .lookup_managed_group(&ctx, &created.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "");
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_insert_new_skips_taken_ids() {
        let repo = repo();
        let mut existing = draft("true");
        existing.public_id = "mgoidc_aaaaaaaaaa".to_string();
        existing.name = "original".to_string();
        repo.insert_managed_group(existing);

        let mut ids = ["mgoidc_aaaaaaaaaa", "mgoidc_bbbbbbbbbb"].into_iter();
        let stored = repo
            .insert_new(draft("true"), || ids.next().unwrap_or_default().to_string())
            .unwrap();
        assert_eq!(stored.public_id, "mgoidc_bbbbbbbbbb");
        assert_eq!(
            repo.managed_groups.get("mgoidc_aaaaaaaaaa").unwrap().name,
            "original"
        );
    }

    #[test]
    fn test_insert_new_gives_up_on_repeated_collisions() {
        let repo = repo();
        let mut existing = draft("true");
        existing.public_id = "mgoidc_aaaaaaaaaa".to_string();
        existing.name = "original".to_string();
        repo.insert_managed_group(existing);

        let err = repo
            .insert_new(draft("true"), || "mgoidc_aaaaaaaaaa".to_string())
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(repo.managed_group_count(), 1);
        assert_eq!(
            repo.managed_groups.get("mgoidc_aaaaaaaaaa").unwrap().name,
            "original"
        );
    }

    #[tokio::test]
    async fn test_delete_reports_rows() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        let created = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap();

        assert_eq!(
            repo.delete_managed_group(&ctx, "o_other", &created.public_id).await.unwrap(),
            0
        );
        assert_eq!(
            repo.delete_managed_group(&ctx, SCOPE, &created.public_id).await.unwrap(),
            1
        );
        assert_eq!(
            repo.delete_managed_group(&ctx, SCOPE, &created.public_id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_list_sorted_by_id() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        for _ in 0..3 {
            repo.create_managed_group(&ctx, SCOPE, draft("true")).await.unwrap();
        }

        let groups = repo.list_managed_groups(&ctx, AUTH_METHOD).await.unwrap();
        assert_eq!(groups.len(), 3);
        assert!(groups.windows(2).all(|w| w[0].public_id < w[1].public_id));
        assert!(repo.list_managed_groups(&ctx, "amoidc_other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_context_is_rejected() {
        let repo = repo();
        let ctx = RequestContext::new("u_1");
        ctx.cancellation_token().cancel();

        let err = repo
            .create_managed_group(&ctx, SCOPE, draft("true"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Canceled));
        assert_eq!(repo.managed_group_count(), 0);
    }
}
