//! Managed group and auth method entities
//!
//! Both are closed sets of subtype variants. Adding a subtype means adding a
//! variant here, and the compiler then points at every match that needs a
//! new arm.

pub mod oidc;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use oidc::{ManagedGroupOptions, OidcAuthMethod, OidcManagedGroup};

use crate::subtype::Subtype;

/// Entity construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("missing {0}")]
    MissingField(&'static str),
}

/// Managed group of any subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedGroup {
    Oidc(OidcManagedGroup),
}

impl ManagedGroup {
    pub fn subtype(&self) -> Subtype {
        match self {
            ManagedGroup::Oidc(_) => Subtype::Oidc,
        }
    }

    pub fn public_id(&self) -> &str {
        match self {
            ManagedGroup::Oidc(g) => &g.public_id,
        }
    }

    pub fn auth_method_id(&self) -> &str {
        match self {
            ManagedGroup::Oidc(g) => &g.auth_method_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ManagedGroup::Oidc(g) => &g.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ManagedGroup::Oidc(g) => &g.description,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            ManagedGroup::Oidc(g) => g.version,
        }
    }

    pub fn create_time(&self) -> Option<DateTime<Utc>> {
        match self {
            ManagedGroup::Oidc(g) => g.create_time,
        }
    }

    pub fn update_time(&self) -> Option<DateTime<Utc>> {
        match self {
            ManagedGroup::Oidc(g) => g.update_time,
        }
    }
}

impl From<OidcManagedGroup> for ManagedGroup {
    fn from(group: OidcManagedGroup) -> Self {
        ManagedGroup::Oidc(group)
    }
}

/// Auth method of any subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Oidc(OidcAuthMethod),
}

impl AuthMethod {
    pub fn subtype(&self) -> Subtype {
        match self {
            AuthMethod::Oidc(_) => Subtype::Oidc,
        }
    }

    pub fn public_id(&self) -> &str {
        match self {
            AuthMethod::Oidc(am) => &am.public_id,
        }
    }

    pub fn scope_id(&self) -> &str {
        match self {
            AuthMethod::Oidc(am) => &am.scope_id,
        }
    }
}

impl From<OidcAuthMethod> for AuthMethod {
    fn from(am: OidcAuthMethod) -> Self {
        AuthMethod::Oidc(am)
    }
}
