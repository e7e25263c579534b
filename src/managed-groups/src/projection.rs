//! Output projection
//!
//! Renders a managed group into its wire form, emitting each field only when
//! the caller's output-field set names it. `name` and `description` are
//! additionally omitted when empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::attributes::{self, AttributeMap, ManagedGroupAttributes};
use crate::error::{ManagedGroupError, Result};
use crate::model::ManagedGroup;
use crate::types::{fields, ActionSet, OutputFields, ScopeInfo};

/// Wire representation of a managed group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedGroupView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AttributeMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_actions: Option<Vec<String>>,
}

impl ManagedGroupView {
    /// Names of the fields present in this view
    pub fn populated_fields(&self) -> Vec<&'static str> {
        let present = [
            (fields::ID, self.id.is_some()),
            (fields::SCOPE, self.scope.is_some()),
            (fields::NAME, self.name.is_some()),
            (fields::DESCRIPTION, self.description.is_some()),
            (fields::CREATED_TIME, self.created_time.is_some()),
            (fields::UPDATED_TIME, self.updated_time.is_some()),
            (fields::VERSION, self.version.is_some()),
            (fields::TYPE, self.subtype.is_some()),
            (fields::AUTH_METHOD_ID, self.auth_method_id.is_some()),
            (fields::ATTRIBUTES, self.attributes.is_some()),
            (fields::AUTHORIZED_ACTIONS, self.authorized_actions.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

/// Inputs to a projection beyond the entity itself
#[derive(Debug, Clone, Default)]
pub struct ProjectionOptions<'a> {
    output_fields: Option<&'a OutputFields>,
    scope: Option<&'a ScopeInfo>,
    authorized_actions: Option<&'a ActionSet>,
}

impl<'a> ProjectionOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_fields(mut self, fields: &'a OutputFields) -> Self {
        self.output_fields = Some(fields);
        self
    }

    pub fn with_scope(mut self, scope: &'a ScopeInfo) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_authorized_actions(mut self, actions: &'a ActionSet) -> Self {
        self.authorized_actions = Some(actions);
        self
    }
}

/// Project a managed group into its wire form
///
/// # Errors
/// Returns `Internal` if no output-field set was supplied or the entity's
/// attributes cannot be encoded.
pub fn project(group: &ManagedGroup, opts: ProjectionOptions<'_>) -> Result<ManagedGroupView> {
    let Some(out) = opts.output_fields else {
        return Err(ManagedGroupError::internal("output fields not found when building managed group proto"));
    };

    let mut view = ManagedGroupView::default();

    if out.has(fields::ID) {
        view.id = Some(group.public_id().to_string());
    }
    if out.has(fields::SCOPE) {
        view.scope = opts.scope.cloned();
    }
    if out.has(fields::NAME) && !group.name().is_empty() {
        view.name = Some(group.name().to_string());
    }
    if out.has(fields::DESCRIPTION) && !group.description().is_empty() {
        view.description = Some(group.description().to_string());
    }
    if out.has(fields::CREATED_TIME) {
        view.created_time = group.create_time();
    }
    if out.has(fields::UPDATED_TIME) {
        view.updated_time = group.update_time();
    }
    if out.has(fields::VERSION) {
        view.version = Some(group.version());
    }
    if out.has(fields::TYPE) {
        view.subtype = Some(group.subtype().as_str().to_string());
    }
    if out.has(fields::AUTH_METHOD_ID) {
        view.auth_method_id = Some(group.auth_method_id().to_string());
    }
    if out.has(fields::AUTHORIZED_ACTIONS) {
        view.authorized_actions = opts.authorized_actions.map(ActionSet::strings);
    }
    if out.has(fields::ATTRIBUTES) {
        let attrs = ManagedGroupAttributes::from_group(group);
        match attributes::encode(&attrs) {
            Ok(map) => view.attributes = Some(map),
            Err(e) => {
                error!(
                    managed_group_id = %group.public_id(),
                    error = %e,
                    "Failed to encode managed group attributes"
                );
                return Err(ManagedGroupError::internal(e.to_string()));
            }
        }
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OidcManagedGroup;
    use crate::types::Action;
    use chrono::TimeZone;

    fn group() -> ManagedGroup {
        ManagedGroup::Oidc(OidcManagedGroup {
            public_id: "mgoidc_1234567890".to_string(),
            auth_method_id: "amoidc_1234567890".to_string(),
            name: "engineering".to_string(),
            description: String::new(),
            filter: r#""foo" in "/token/sub""#.to_string(),
            version: 2,
            create_time: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            update_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        })
    }

    #[test]
    fn test_project_all_fields() {
        let out = OutputFields::all();
        let scope = ScopeInfo::from_id("o_1234567890");
        let actions = ActionSet::new([Action::Update, Action::Read]);
        let view = project(
            &group(),
            ProjectionOptions::new()
                .with_output_fields(&out)
                .with_scope(&scope)
                .with_authorized_actions(&actions),
        )
        .unwrap();

        assert_eq!(view.id.as_deref(), Some("mgoidc_1234567890"));
        assert_eq!(view.scope.as_ref().map(|s| s.id.as_str()), Some("o_1234567890"));
        assert_eq!(view.name.as_deref(), Some("engineering"));
        assert_eq!(view.description, None);
        assert_eq!(view.version, Some(2));
        assert_eq!(view.subtype.as_deref(), Some("oidc"));
        assert_eq!(
            view.attributes.as_ref().and_then(|a| a.get("filter")).and_then(|f| f.as_str()),
            Some(r#""foo" in "/token/sub""#)
        );
        assert_eq!(
            view.authorized_actions,
            Some(vec!["read".to_string(), "update".to_string()])
        );
    }

    #[test]
    fn test_project_only_requested() {
        let out = OutputFields::from_fields(["id", "version"]);
        let view = project(&group(), ProjectionOptions::new().with_output_fields(&out)).unwrap();

        assert_eq!(view.populated_fields(), vec!["id", "version"]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_project_without_output_fields_is_internal() {
        let err = project(&group(), ProjectionOptions::new()).unwrap_err();
        assert!(matches!(err, ManagedGroupError::Internal(_)));
    }

    #[test]
    fn test_type_serialized_as_type() {
        let out = OutputFields::from_fields(["type"]);
        let view = project(&group(), ProjectionOptions::new().with_output_fields(&out)).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "oidc");
    }
}
