//! Service and bootstrap configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{OidcAuthMethod, OidcManagedGroup};
use crate::policy::{Grant, GrantPolicyEngine};
use crate::repository::{InMemoryOidcRepository, RepositorySet};
use crate::service::ManagedGroupService;
use crate::types::ScopeInfo;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Collection path used to build the location of created resources
    pub resource_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            resource_path: "managed-groups".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Location of a managed group
    pub fn location(&self, id: &str) -> String {
        format!("{}/{}", self.resource_path.trim_end_matches('/'), id)
    }
}

/// Seed data for the in-memory collaborators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub service: ServiceConfig,
    pub auth_methods: Vec<OidcAuthMethod>,
    pub managed_groups: Vec<OidcManagedGroup>,
    pub scopes: Vec<ScopeInfo>,
    pub grants: Vec<Grant>,
}

impl BootstrapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Build a service backed by the in-memory repository and grant engine
    pub fn into_service(self) -> ManagedGroupService {
        let repo = InMemoryOidcRepository::new();
        for auth_method in self.auth_methods {
            repo.insert_auth_method(auth_method);
        }
        for group in self.managed_groups {
            repo.insert_managed_group(group);
        }

        let policy = GrantPolicyEngine::with_grants(self.grants);
        for scope in self.scopes {
            policy.add_scope(scope);
        }

        ManagedGroupService::new(RepositorySet::new(Arc::new(repo)), Arc::new(policy))
            .with_config(self.service)
    }
}
