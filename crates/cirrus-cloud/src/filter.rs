//! Client-side attribute filtering for search results.
//!
//! The search primitive matches a filter mapping against the serialized
//! attributes of each resource: scalar leaves compare by canonical string
//! form (so `enabled: false` matches a remote boolean), submaps recurse
//! into nested attributes, and a missing attribute never matches.

use cirrus_core::{FilterValue, Filters, SpecValue};
use serde::Serialize;
use serde_json::Value;

/// True when every filter entry matches the resource's attributes.
pub fn matches<T: Serialize>(resource: &T, filters: &Filters) -> bool {
    match serde_json::to_value(resource) {
        Ok(value) => matches_value(&value, filters),
        Err(_) => false,
    }
}

/// True when the resource's `id` or `name` equals the given key.
#[must_use]
pub fn name_or_id_matches(id: &str, name: &str, key: &str) -> bool {
    id == key || name == key
}

fn matches_value(value: &Value, filters: &Filters) -> bool {
    let Value::Object(attrs) = value else {
        return filters.is_empty();
    };
    filters.iter().all(|(key, want)| match (attrs.get(key), want) {
        (Some(have), FilterValue::Map(sub)) => matches_value(have, sub),
        (Some(have), FilterValue::Scalar(scalar)) => scalar_eq(have, scalar),
        (None, _) => false,
    })
}

fn scalar_eq(have: &Value, want: &SpecValue) -> bool {
    let have = match have {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return false,
    };
    have == want.canonical()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn demo_user() -> User {
        User {
            id: "u1".to_string(),
            name: "demouser".to_string(),
            domain_id: Some("default".to_string()),
            is_enabled: false,
            ..User::default()
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        assert!(matches(&demo_user(), &Filters::new()));
    }

    #[test]
    fn scalar_leaf_matches_by_canonical_form() {
        let filters: Filters = serde_json::from_str(r#"{"is_enabled": false}"#).unwrap();
        assert!(matches(&demo_user(), &filters));

        let filters: Filters = serde_json::from_str(r#"{"is_enabled": true}"#).unwrap();
        assert!(!matches(&demo_user(), &filters));
    }

    #[test]
    fn string_filter_matches_remote_boolean() {
        let filters: Filters = serde_json::from_str(r#"{"is_enabled": "false"}"#).unwrap();
        assert!(matches(&demo_user(), &filters));
    }

    #[test]
    fn missing_attribute_never_matches() {
        let filters: Filters = serde_json::from_str(r#"{"no_such_attr": 1}"#).unwrap();
        assert!(!matches(&demo_user(), &filters));
    }

    #[test]
    fn nested_submap_recurses() {
        let resource = serde_json::json!({
            "name": "demouser",
            "links": {"self": "http://example/u1"}
        });
        let filters: Filters =
            serde_json::from_str(r#"{"links": {"self": "http://example/u1"}}"#).unwrap();
        assert!(matches(&resource, &filters));

        let filters: Filters =
            serde_json::from_str(r#"{"links": {"self": "http://example/u2"}}"#).unwrap();
        assert!(!matches(&resource, &filters));
    }

    #[test]
    fn name_or_id() {
        assert!(name_or_id_matches("u1", "demouser", "u1"));
        assert!(name_or_id_matches("u1", "demouser", "demouser"));
        assert!(!name_or_id_matches("u1", "demouser", "other"));
    }
}
