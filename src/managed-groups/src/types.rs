//! Core authorization and output types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::subtype::Subtype;

/// Wire field names shared by validation, projection and output-field grants
pub mod fields {
    pub const ID: &str = "id";
    pub const SCOPE: &str = "scope";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const CREATED_TIME: &str = "created_time";
    pub const UPDATED_TIME: &str = "updated_time";
    pub const VERSION: &str = "version";
    pub const TYPE: &str = "type";
    pub const AUTH_METHOD_ID: &str = "auth_method_id";
    pub const ATTRIBUTES: &str = "attributes";
    pub const AUTHORIZED_ACTIONS: &str = "authorized_actions";
    pub const UPDATE_MASK: &str = "update_mask";
    pub const FILTER: &str = "filter";

    /// OIDC filter attribute path
    pub const ATTR_FILTER: &str = "attributes.filter";

    /// Every field a managed group view can carry
    pub const ALL: [&str; 11] = [
        ID,
        SCOPE,
        NAME,
        DESCRIPTION,
        CREATED_TIME,
        UPDATED_TIME,
        VERSION,
        TYPE,
        AUTH_METHOD_ID,
        ATTRIBUTES,
        AUTHORIZED_ACTIONS,
    ];
}

/// Operation an actor performs on a managed group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Visibility check without side effects
    NoOp,
    Create,
    List,
    Read,
    Update,
    Delete,
}

impl Action {
    /// Wire name of the action
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::List => "list",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Whether the action targets the collection instead of a single resource
    pub fn is_collection_action(&self) -> bool {
        COLLECTION_ACTIONS.contains(self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-op" => Ok(Action::NoOp),
            "create" => Ok(Action::Create),
            "list" => Ok(Action::List),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Actions that can be performed on individual OIDC managed groups
static OIDC_ID_ACTIONS: [Action; 4] = [Action::NoOp, Action::Read, Action::Update, Action::Delete];

/// Actions that can be performed on the managed group collection
pub const COLLECTION_ACTIONS: [Action; 2] = [Action::Create, Action::List];

/// Id-level action set registered for a subtype
pub fn id_actions(subtype: Subtype) -> &'static [Action] {
    match subtype {
        Subtype::Oidc => &OIDC_ID_ACTIONS,
    }
}

/// Ordered set of actions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(Vec<Action>);

impl ActionSet {
    /// Create an action set, dropping duplicates while keeping first occurrence order
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut out: Vec<Action> = Vec::new();
        for action in actions {
            if !out.contains(&action) {
                out.push(action);
            }
        }
        Self(out)
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// Action names, sorted and unique
    pub fn strings(&self) -> Vec<String> {
        let names: BTreeSet<&'static str> = self.0.iter().map(Action::as_str).collect();
        names.into_iter().map(str::to_string).collect()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Resource type submitted to the policy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    ManagedGroup,
}

impl ResourceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ManagedGroup => "managed-group",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope information rendered in the `scope` output field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeInfo {
    /// Scope id (e.g., "global", "o_1234567890")
    pub id: String,

    /// Scope type (global, org, project)
    #[serde(rename = "type")]
    pub scope_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_scope_id: String,
}

impl ScopeInfo {
    /// Scope info derived from the id alone
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let scope_type = if id == "global" {
            "global"
        } else if id.starts_with("o_") {
            "org"
        } else if id.starts_with("p_") {
            "project"
        } else {
            "unknown"
        };

        Self {
            scope_type: scope_type.to_string(),
            id,
            name: String::new(),
            description: String::new(),
            parent_scope_id: String::new(),
        }
    }
}

/// Set of output fields, possibly the wildcard set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFields {
    all: bool,
    fields: BTreeSet<String>,
}

/// Fields visible to the anonymous actor when grants name none
const ANONYMOUS_DEFAULT_FIELDS: [&str; 6] = [
    fields::ID,
    fields::SCOPE,
    fields::NAME,
    fields::DESCRIPTION,
    fields::TYPE,
    fields::AUTHORIZED_ACTIONS,
];

impl OutputFields {
    /// Every field
    pub fn all() -> Self {
        Self {
            all: true,
            fields: BTreeSet::new(),
        }
    }

    /// Explicit field list; `*` selects every field
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        for field in fields {
            let field = field.as_ref().trim();
            if field == "*" {
                out.all = true;
            } else if !field.is_empty() {
                out.fields.insert(field.to_string());
            }
        }
        out
    }

    /// Whether the field is part of the set
    pub fn has(&self, field: &str) -> bool {
        self.all || self.fields.contains(field)
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.fields.is_empty()
    }

    /// Fields present in both sets
    pub fn intersect(&self, other: &OutputFields) -> OutputFields {
        match (self.all, other.all) {
            (true, true) => OutputFields::all(),
            (true, false) => other.clone(),
            (false, true) => self.clone(),
            (false, false) => OutputFields {
                all: false,
                fields: self.fields.intersection(&other.fields).cloned().collect(),
            },
        }
    }

    /// Union of two sets
    pub fn union(&self, other: &OutputFields) -> OutputFields {
        OutputFields {
            all: self.all || other.all,
            fields: self.fields.union(&other.fields).cloned().collect(),
        }
    }

    /// Granted fields, or the defaults for the actor when grants name none
    pub fn self_or_defaults(granted: Option<OutputFields>, user_id: &str) -> OutputFields {
        match granted {
            Some(fields) => fields,
            None if user_id == crate::context::ANONYMOUS_USER_ID => {
                OutputFields::from_fields(ANONYMOUS_DEFAULT_FIELDS)
            }
            None => OutputFields::all(),
        }
    }
}
