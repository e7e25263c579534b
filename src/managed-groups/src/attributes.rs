//! Subtype attribute codec
//!
//! Converts between the generic JSON object carried on the wire and the
//! typed attributes of each subtype. Decoding checks structure only; the
//! filter expression itself is validated by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::ManagedGroup;
use crate::subtype::Subtype;

/// Generic structured form of subtype attributes
pub type AttributeMap = Map<String, Value>;

/// Attribute codec errors
#[derive(Debug, Error)]
pub enum AttributeError {
    /// Attributes did not match the subtype's shape
    #[error("attribute fields do not match the expected format: {0}")]
    Malformed(String),

    /// Attributes could not be rendered
    #[error("failed building {subtype} attribute struct: {reason}")]
    Encode {
        subtype: Subtype,
        reason: String,
    },
}

/// OIDC managed group attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OidcManagedGroupAttributes {
    /// Filter expression over the token and userinfo claims
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter: String,
}

/// Attributes of any subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedGroupAttributes {
    Oidc(OidcManagedGroupAttributes),
}

impl ManagedGroupAttributes {
    pub fn subtype(&self) -> Subtype {
        match self {
            ManagedGroupAttributes::Oidc(_) => Subtype::Oidc,
        }
    }

    /// Attributes held by a stored managed group
    pub fn from_group(group: &ManagedGroup) -> Self {
        match group {
            ManagedGroup::Oidc(g) => ManagedGroupAttributes::Oidc(OidcManagedGroupAttributes {
                filter: g.filter.clone(),
            }),
        }
    }
}

/// Decode generic attributes for `subtype`
///
/// Absent attributes decode to the subtype's defaults.
pub fn decode(
    subtype: Subtype,
    attrs: Option<&AttributeMap>,
) -> Result<ManagedGroupAttributes, AttributeError> {
    let value = Value::Object(attrs.cloned().unwrap_or_default());
    match subtype {
        Subtype::Oidc => serde_json::from_value::<OidcManagedGroupAttributes>(value)
            .map(ManagedGroupAttributes::Oidc)
            .map_err(|e| AttributeError::Malformed(e.to_string())),
    }
}

/// Encode typed attributes into their generic form
pub fn encode(attrs: &ManagedGroupAttributes) -> Result<AttributeMap, AttributeError> {
    let value = match attrs {
        ManagedGroupAttributes::Oidc(a) => serde_json::to_value(a),
    }
    .map_err(|e| AttributeError::Encode {
        subtype: attrs.subtype(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(AttributeError::Encode {
            subtype: attrs.subtype(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}
