//! Update-mask translation
//!
//! Clients name fields by their wire paths (`name`, `attributes.filter`);
//! repositories name them by storage column. Each subtype owns one immutable
//! translation table, built on first use and shared by every request.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::subtype::Subtype;
use crate::types::fields;

/// Storage field names understood by the repositories
pub mod storage {
    pub const NAME: &str = "Name";
    pub const DESCRIPTION: &str = "Description";
    pub const FILTER: &str = "Filter";
}

/// Wire path to storage field table for one subtype
#[derive(Debug, Clone)]
pub struct MaskManager {
    paths: HashMap<String, &'static str>,
}

impl MaskManager {
    /// Build a manager from `(wire path, storage field)` pairs
    pub fn new(pairs: &[(&str, &'static str)]) -> Self {
        let paths = pairs
            .iter()
            .map(|(path, field)| (path.to_ascii_lowercase(), *field))
            .collect();
        Self { paths }
    }

    /// Translate wire paths into storage field names
    ///
    /// Paths match case-insensitively and may be comma-joined. Unknown paths
    /// are dropped, so an empty result means nothing usable was named.
    pub fn translate<S: AsRef<str>>(&self, paths: &[S]) -> BTreeSet<&'static str> {
        paths
            .iter()
            .flat_map(|p| p.as_ref().split(','))
            .map(|p| p.trim().to_ascii_lowercase())
            .filter_map(|p| self.paths.get(&p).copied())
            .collect()
    }
}

static OIDC_MASK_MANAGER: LazyLock<MaskManager> = LazyLock::new(|| {
    MaskManager::new(&[
        (fields::NAME, storage::NAME),
        (fields::DESCRIPTION, storage::DESCRIPTION),
        (fields::ATTR_FILTER, storage::FILTER),
    ])
});

/// Mask manager registered for a subtype
pub fn for_subtype(subtype: Subtype) -> &'static MaskManager {
    match subtype {
        Subtype::Oidc => &OIDC_MASK_MANAGER,
    }
}

/// Translate with every registered subtype's table, keeping the first
/// non-empty result
pub fn translate_any<S: AsRef<str>>(paths: &[S]) -> BTreeSet<&'static str> {
    Subtype::ALL
        .into_iter()
        .map(|s| for_subtype(s).translate(paths))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Whether a wire path in `paths` names `field`, case-insensitively
pub fn mask_contains<S: AsRef<str>>(paths: &[S], field: &str) -> bool {
    paths
        .iter()
        .flat_map(|p| p.as_ref().split(','))
        .any(|p| p.trim().eq_ignore_ascii_case(field))
}
