//! Request and response types for the managed group operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::projection::ManagedGroupView;

/// Managed group as submitted by a client
///
/// `name` and `description` distinguish absent from empty; on update an
/// absent value in the mask clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedGroupItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_method_id: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Current version, required on update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AttributeMap>,
}

impl ManagedGroupItem {
    /// Id, treating an empty string as absent
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Type tag, treating an empty string as absent
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListManagedGroupsRequest {
    pub auth_method_id: String,

    /// Boolean expression over each projected item, bound as `item`
    pub filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListManagedGroupsResponse {
    pub items: Vec<ManagedGroupView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetManagedGroupRequest {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManagedGroupResponse {
    pub item: ManagedGroupView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateManagedGroupRequest {
    pub item: ManagedGroupItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateManagedGroupResponse {
    pub item: ManagedGroupView,

    /// Location of the new resource
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateManagedGroupRequest {
    pub id: String,

    #[serde(default)]
    pub item: ManagedGroupItem,

    /// Wire paths of the fields to apply
    #[serde(default)]
    pub update_mask: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateManagedGroupResponse {
    pub item: ManagedGroupView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteManagedGroupRequest {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteManagedGroupResponse {
    /// False when nothing was removed
    pub deleted: bool,
}
