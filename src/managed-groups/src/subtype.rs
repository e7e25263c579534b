//! Identifier classification
//!
//! Every public id carries its subtype as a structural prefix
//! (`<prefix>_<suffix>`). Classification only inspects that prefix, so it
//! never allocates and never consults storage.

use std::fmt;

/// Id prefix for OIDC auth methods
pub const OIDC_AUTH_METHOD_PREFIX: &str = "amoidc";

/// Id prefix for OIDC managed groups
pub const OIDC_MANAGED_GROUP_PREFIX: &str = "mgoidc";

/// Concrete kind of auth method and managed group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subtype {
    /// OpenID Connect
    Oidc,
}

impl Subtype {
    /// Every registered subtype
    pub const ALL: [Subtype; 1] = [Subtype::Oidc];

    /// Classify an id by its structural tag
    pub fn from_id(id: &str) -> Option<Self> {
        classify(id)
    }

    /// Parse the wire `type` name
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Wire `type` name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Subtype::Oidc => "oidc",
        }
    }

    /// Id prefix of auth methods of this subtype
    pub const fn auth_method_prefix(&self) -> &'static str {
        match self {
            Subtype::Oidc => OIDC_AUTH_METHOD_PREFIX,
        }
    }

    /// Id prefix of managed groups of this subtype
    pub const fn managed_group_prefix(&self) -> &'static str {
        match self {
            Subtype::Oidc => OIDC_MANAGED_GROUP_PREFIX,
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determine the subtype an id denotes, if any
///
/// Both auth method and managed group ids classify to their subtype.
pub fn classify(id: &str) -> Option<Subtype> {
    Subtype::ALL.into_iter().find(|subtype| {
        has_tag(id, subtype.auth_method_prefix()) || has_tag(id, subtype.managed_group_prefix())
    })
}

/// Whether `id` is well formed for one of `prefixes`
///
/// Well formed means `<prefix>_` followed by at least one ASCII
/// alphanumeric character and nothing else.
pub fn valid_id(id: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| {
        has_tag(id, prefix) && {
            let suffix = &id[prefix.len() + 1..];
            !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
        }
    })
}

/// Whether the id is well formed for any auth method subtype
pub fn valid_auth_method_id(id: &str) -> bool {
    Subtype::ALL
        .iter()
        .any(|s| valid_id(id, &[s.auth_method_prefix()]))
}

/// Whether the id is well formed for any managed group subtype
pub fn valid_managed_group_id(id: &str) -> bool {
    Subtype::ALL
        .iter()
        .any(|s| valid_id(id, &[s.managed_group_prefix()]))
}

fn has_tag(id: &str, prefix: &str) -> bool {
    id.len() > prefix.len() && id.starts_with(prefix) && id.as_bytes()[prefix.len()] == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_prefixes() {
        assert_eq!(classify("amoidc_1234567890"), Some(Subtype::Oidc));
        assert_eq!(classify("mgoidc_1234567890"), Some(Subtype::Oidc));
        assert_eq!(classify("amoidc_"), Some(Subtype::Oidc));
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("amoidc"), None);
        assert_eq!(classify("amoidcx_123"), None);
        assert_eq!(classify("ampw_1234567890"), None);
        assert_eq!(classify("u_1234567890"), None);
    }

    #[test]
    fn test_valid_id() {
        assert!(valid_id("amoidc_1", &[OIDC_AUTH_METHOD_PREFIX]));
        assert!(valid_id("mgoidc_AbC123", &[OIDC_MANAGED_GROUP_PREFIX]));
        assert!(!valid_id("mgoidc_", &[OIDC_MANAGED_GROUP_PREFIX]));
        assert!(!valid_id("mgoidc_12-3", &[OIDC_MANAGED_GROUP_PREFIX]));
        assert!(!valid_id("amoidc_1", &[OIDC_MANAGED_GROUP_PREFIX]));
    }

    #[test]
    fn test_valid_auth_method_id_covers_every_subtype() {
        for subtype in Subtype::ALL {
            let id = format!("{}_1234567890", subtype.auth_method_prefix());
            assert!(valid_auth_method_id(&id));
            assert!(!valid_managed_group_id(&id));
        }
        assert!(!valid_auth_method_id("ampw_1234567890"));
        assert!(!valid_auth_method_id("amoidc_12-3"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Subtype::from_type_name("oidc"), Some(Subtype::Oidc));
        assert_eq!(Subtype::from_type_name("password"), None);
        assert_eq!(Subtype::Oidc.to_string(), "oidc");
    }
}
