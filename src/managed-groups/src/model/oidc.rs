//! OIDC auth methods and managed groups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ModelError;

/// OIDC auth method, read-only from this service's perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcAuthMethod {
    /// Public id (`amoidc_...`)
    pub public_id: String,

    /// Owning scope
    pub scope_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

impl OidcAuthMethod {
    pub fn new(public_id: impl Into<String>, scope_id: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            scope_id: scope_id.into(),
            name: String::new(),
            description: String::new(),
        }
    }
}

/// Optional fields accepted when building a managed group
#[derive(Debug, Clone, Default)]
pub struct ManagedGroupOptions {
    name: Option<String>,
    description: Option<String>,
}

impl ManagedGroupOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Managed group whose membership is an expression over OIDC claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcManagedGroup {
    pub public_id: String,
    pub auth_method_id: String,
    pub name: String,
    pub description: String,

    /// Boolean expression over the claims of the authenticated principal
    pub filter: String,

    /// Optimistic concurrency version, starting at 1
    pub version: u32,

    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl OidcManagedGroup {
    /// Build a new, not yet persisted managed group
    ///
    /// # Errors
    /// Returns an error if the auth method id or the filter is empty
    pub fn new(
        auth_method_id: impl Into<String>,
        filter: impl Into<String>,
        opts: ManagedGroupOptions,
    ) -> Result<Self, ModelError> {
        let auth_method_id = auth_method_id.into();
        let filter = filter.into();
        if auth_method_id.is_empty() {
            return Err(ModelError::MissingField("auth method id"));
        }
        if filter.is_empty() {
            return Err(ModelError::MissingField("filter"));
        }

        Ok(Self {
            auth_method_id,
            filter,
            name: opts.name.unwrap_or_default(),
            description: opts.description.unwrap_or_default(),
            ..Self::default()
        })
    }

    /// Empty group used as an update draft
    pub fn alloc() -> Self {
        Self::default()
    }
}
