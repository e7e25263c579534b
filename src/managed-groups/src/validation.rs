//! Request-shape validation
//!
//! Every check here works on request data alone. Nothing touches a
//! repository or the policy engine, so a rejected request has no side
//! effects and costs no round trips.

use std::collections::{BTreeMap, BTreeSet};

use crate::api::{
    CreateManagedGroupRequest, DeleteManagedGroupRequest, GetManagedGroupRequest,
    ListManagedGroupsRequest, UpdateManagedGroupRequest,
};
use crate::attributes::{self, ManagedGroupAttributes, OidcManagedGroupAttributes};
use crate::error::{ManagedGroupError, Result, INVALID_REQUEST_MESSAGE};
use crate::filter::FilterEngine;
use crate::mask::{self, mask_contains};
use crate::subtype::{classify, valid_auth_method_id, valid_id, Subtype};
use crate::types::fields;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_ID: &str = "Invalid formatted identifier.";
pub const MSG_INVALID_PATH_ID: &str = "Improperly formatted path identifier.";
pub const MSG_READ_ONLY: &str = "This is a read only field.";
pub const MSG_READ_ONLY_ON_UPDATE: &str =
    "This is a read only field and cannot be specified in an update request.";
pub const MSG_MASK_REQUIRED: &str =
    "UpdateMask not provided but is required to update this resource.";
pub const MSG_NO_VALID_MASK_FIELDS: &str = "No valid fields provided in the update mask.";
pub const MSG_VERSION_REQUIRED: &str = "Existing resource version is required for an update.";
pub const MSG_UNKNOWN_AUTH_METHOD_TYPE: &str = "Unknown auth method type from ID.";
pub const MSG_TYPE_MISMATCH: &str = "Doesn't match the parent resource's type.";
pub const MSG_TYPE_IMMUTABLE: &str = "Cannot modify the resource type.";
pub const MSG_MALFORMED_ATTRIBUTES: &str = "Attribute fields do not match the expected format.";
pub const MSG_EMPTY_FIELD: &str = "Field cannot be empty.";

type BadFields = BTreeMap<String, String>;

fn finish(bad: BadFields) -> Result<()> {
    if bad.is_empty() {
        return Ok(());
    }
    Err(ManagedGroupError::invalid_argument(INVALID_REQUEST_MESSAGE, bad))
}

fn flag(bad: &mut BadFields, field: &str, problem: impl Into<String>) {
    bad.insert(field.to_string(), problem.into());
}

/// Empty ids and ids with a known tag but a malformed suffix are rejected.
/// Ids without a known tag pass and resolve to NotFound later.
fn id_well_formed(id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    match classify(id) {
        Some(subtype) => valid_id(id, &[subtype.managed_group_prefix()]),
        None => true,
    }
}

fn check_filter(bad: &mut BadFields, filter: &str) {
    if let Err(e) = FilterEngine::validate(filter) {
        flag(
            bad,
            fields::ATTR_FILTER,
            format!("Error evaluating submitted filter expression: {}.", e),
        );
    }
}

fn decode_oidc_attributes(
    bad: &mut BadFields,
    attrs: Option<&attributes::AttributeMap>,
) -> OidcManagedGroupAttributes {
    match attributes::decode(Subtype::Oidc, attrs) {
        Ok(ManagedGroupAttributes::Oidc(a)) => a,
        Err(_) => {
            flag(bad, fields::ATTRIBUTES, MSG_MALFORMED_ATTRIBUTES);
            OidcManagedGroupAttributes::default()
        }
    }
}

pub fn validate_get_request(req: &GetManagedGroupRequest) -> Result<()> {
    let mut bad = BadFields::new();
    if !id_well_formed(&req.id) {
        flag(&mut bad, fields::ID, MSG_INVALID_ID);
    }
    finish(bad)
}

pub fn validate_delete_request(req: &DeleteManagedGroupRequest) -> Result<()> {
    let mut bad = BadFields::new();
    if !id_well_formed(&req.id) {
        flag(&mut bad, fields::ID, MSG_INVALID_ID);
    }
    finish(bad)
}

pub fn validate_list_request(req: &ListManagedGroupsRequest) -> Result<()> {
    let mut bad = BadFields::new();
    if !valid_auth_method_id(&req.auth_method_id) {
        flag(&mut bad, fields::AUTH_METHOD_ID, MSG_INVALID_ID);
    }
    if !req.filter.trim().is_empty() {
        if let Err(e) = FilterEngine::validate(&req.filter) {
            flag(
                &mut bad,
                fields::FILTER,
                format!("This field could not be parsed. {}", e),
            );
        }
    }
    finish(bad)
}

pub fn validate_create_request(req: &CreateManagedGroupRequest) -> Result<()> {
    let item = &req.item;
    let mut bad = BadFields::new();

    if item.id().is_some() {
        flag(&mut bad, fields::ID, MSG_READ_ONLY);
    }
    if item.created_time.is_some() {
        flag(&mut bad, fields::CREATED_TIME, MSG_READ_ONLY);
    }
    if item.updated_time.is_some() {
        flag(&mut bad, fields::UPDATED_TIME, MSG_READ_ONLY);
    }
    if item.auth_method_id.is_empty() {
        flag(&mut bad, fields::AUTH_METHOD_ID, MSG_REQUIRED);
    }

    match classify(&item.auth_method_id) {
        Some(Subtype::Oidc) => {
            if item.subtype().is_some_and(|t| t != Subtype::Oidc.as_str()) {
                flag(&mut bad, fields::TYPE, MSG_TYPE_MISMATCH);
            }
            let attrs = decode_oidc_attributes(&mut bad, item.attributes.as_ref());
            if attrs.filter.is_empty() {
                flag(&mut bad, fields::ATTR_FILTER, MSG_REQUIRED);
            } else {
                check_filter(&mut bad, &attrs.filter);
            }
        }
        None => flag(&mut bad, fields::AUTH_METHOD_ID, MSG_UNKNOWN_AUTH_METHOD_TYPE),
    }

    finish(bad)
}

/// Validate an update and return its translated storage mask
pub fn validate_update_request(req: &UpdateManagedGroupRequest) -> Result<BTreeSet<&'static str>> {
    let item = &req.item;
    let mut bad = BadFields::new();

    if !id_well_formed(&req.id) {
        flag(&mut bad, fields::ID, MSG_INVALID_PATH_ID);
    }
    if item.id().is_some() {
        flag(&mut bad, fields::ID, MSG_READ_ONLY_ON_UPDATE);
    }
    if item.created_time.is_some() {
        flag(&mut bad, fields::CREATED_TIME, MSG_READ_ONLY);
    }
    if item.updated_time.is_some() {
        flag(&mut bad, fields::UPDATED_TIME, MSG_READ_ONLY);
    }
    if item.version.unwrap_or(0) == 0 {
        flag(&mut bad, fields::VERSION, MSG_VERSION_REQUIRED);
    }

    let subtype = classify(&req.id);
    if let Some(Subtype::Oidc) = subtype {
        if item.subtype().is_some_and(|t| t != Subtype::Oidc.as_str()) {
            flag(&mut bad, fields::TYPE, MSG_TYPE_IMMUTABLE);
        }
        let attrs = decode_oidc_attributes(&mut bad, item.attributes.as_ref());
        if mask_contains(&req.update_mask, fields::ATTR_FILTER) {
            if attrs.filter.is_empty() {
                flag(&mut bad, fields::ATTR_FILTER, MSG_EMPTY_FIELD);
            } else {
                check_filter(&mut bad, &attrs.filter);
            }
        }
    }

    let translated = if req.update_mask.is_empty() {
        flag(&mut bad, fields::UPDATE_MASK, MSG_MASK_REQUIRED);
        BTreeSet::new()
    } else {
        let translated = match subtype {
            Some(s) => mask::for_subtype(s).translate(&req.update_mask),
            None => mask::translate_any(&req.update_mask),
        };
        if translated.is_empty() {
            flag(&mut bad, fields::UPDATE_MASK, MSG_NO_VALID_MASK_FIELDS);
        }
        translated
    };

    finish(bad)?;
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ManagedGroupItem;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Option<attributes::AttributeMap> {
        value.as_object().cloned()
    }

    fn field_error<T: std::fmt::Debug>(result: Result<T>, field: &str) -> String {
        let err = result.unwrap_err();
        err.fields()
            .and_then(|f| f.get(field))
            .cloned()
            .unwrap_or_else(|| panic!("no error for field {}: {:?}", field, err))
    }

    #[test]
    fn test_get_request_ids() {
        let ok = |id: &str| validate_get_request(&GetManagedGroupRequest { id: id.into() }).is_ok();
        assert!(ok("mgoidc_1234567890"));
        assert!(ok("mgpw_1234567890"));
        assert!(!ok(""));
        assert!(!ok("mgoidc_12-34"));
    }

    #[test]
    fn test_list_request() {
        assert!(validate_list_request(&ListManagedGroupsRequest {
            auth_method_id: "amoidc_1234567890".into(),
            filter: String::new(),
        })
        .is_ok());

        let result = validate_list_request(&ListManagedGroupsRequest {
            auth_method_id: "ampw_1234567890".into(),
            filter: "item.name ==".into(),
        });
        let err = result.unwrap_err();
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("auth_method_id").map(String::as_str), Some(MSG_INVALID_ID));
        assert!(fields
            .get("filter")
            .is_some_and(|m| m.starts_with("This field could not be parsed.")));
    }

    #[test]
    fn test_create_request_valid() {
        let req = CreateManagedGroupRequest {
            item: ManagedGroupItem {
                auth_method_id: "amoidc_1234567890".into(),
                subtype: Some("oidc".into()),
                attributes: attrs(json!({"filter": "\"foo\" in \"/token/sub\""})),
                ..Default::default()
            },
        };
        assert!(validate_create_request(&req).is_ok());
    }

    #[test]
    fn test_create_request_rules() {
        let req = CreateManagedGroupRequest {
            item: ManagedGroupItem {
                id: Some("mgoidc_1234567890".into()),
                auth_method_id: "amoidc_1234567890".into(),
                subtype: Some("password".into()),
                ..Default::default()
            },
        };
        let err = validate_create_request(&req).unwrap_err();
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("id").map(String::as_str), Some(MSG_READ_ONLY));
        assert_eq!(fields.get("type").map(String::as_str), Some(MSG_TYPE_MISMATCH));
        assert_eq!(fields.get("attributes.filter").map(String::as_str), Some(MSG_REQUIRED));

        let req = CreateManagedGroupRequest {
            item: ManagedGroupItem {
                auth_method_id: "ampw_1234567890".into(),
                ..Default::default()
            },
        };
        assert_eq!(
            field_error(validate_create_request(&req), "auth_method_id"),
            MSG_UNKNOWN_AUTH_METHOD_TYPE
        );
    }

    #[test]
    fn test_create_request_bad_filter_and_attributes() {
        let req = CreateManagedGroupRequest {
            item: ManagedGroupItem {
                auth_method_id: "amoidc_1234567890".into(),
                attributes: attrs(json!({"filter": "item.name == == 1"})),
                ..Default::default()
            },
        };
        assert!(field_error(validate_create_request(&req), "attributes.filter")
            .starts_with("Error evaluating submitted filter expression:"));

        let req = CreateManagedGroupRequest {
            item: ManagedGroupItem {
                auth_method_id: "amoidc_1234567890".into(),
                attributes: attrs(json!({"filter": "true", "issuer": "x"})),
                ..Default::default()
            },
        };
        assert_eq!(
            field_error(validate_create_request(&req), "attributes"),
            MSG_MALFORMED_ATTRIBUTES
        );
    }

    #[test]
    fn test_update_request_translates_mask() {
        let req = UpdateManagedGroupRequest {
            id: "mgoidc_1234567890".into(),
            item: ManagedGroupItem {
                version: Some(1),
                name: Some("renamed".into()),
                ..Default::default()
            },
            update_mask: vec!["name".into()],
        };
        let mask = validate_update_request(&req).unwrap();
        assert_eq!(mask, BTreeSet::from([mask::storage::NAME]));
    }

    #[test]
    fn test_update_request_rules() {
        let req = UpdateManagedGroupRequest {
            id: "mgoidc_1234567890".into(),
            item: ManagedGroupItem {
                subtype: Some("ldap".into()),
                attributes: attrs(json!({"filter": ""})),
                ..Default::default()
            },
            update_mask: vec!["attributes.filter".into()],
        };
        let err = validate_update_request(&req).unwrap_err();
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("version").map(String::as_str), Some(MSG_VERSION_REQUIRED));
        assert_eq!(fields.get("type").map(String::as_str), Some(MSG_TYPE_IMMUTABLE));
        assert_eq!(fields.get("attributes.filter").map(String::as_str), Some(MSG_EMPTY_FIELD));
    }

    #[test]
    fn test_update_request_mask_problems() {
        let mut req = UpdateManagedGroupRequest {
            id: "mgoidc_1234567890".into(),
            item: ManagedGroupItem {
                version: Some(1),
                ..Default::default()
            },
            update_mask: vec![],
        };
        assert_eq!(
            field_error(validate_update_request(&req), "update_mask"),
            MSG_MASK_REQUIRED
        );

        req.update_mask = vec!["bogus.path".into()];
        assert_eq!(
            field_error(validate_update_request(&req), "update_mask"),
            MSG_NO_VALID_MASK_FIELDS
        );

        req.id = "mgunknown_1234567890".into();
        assert_eq!(
            field_error(validate_update_request(&req), "update_mask"),
            MSG_NO_VALID_MASK_FIELDS
        );
    }

    #[test]
    fn test_update_request_path_id() {
        let req = UpdateManagedGroupRequest {
            id: "mgoidc_".into(),
            item: ManagedGroupItem {
                version: Some(1),
                ..Default::default()
            },
            update_mask: vec!["name".into()],
        };
        assert_eq!(field_error(validate_update_request(&req), "id"), MSG_INVALID_PATH_ID);
    }
}
