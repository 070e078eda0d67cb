//! Resource types returned by the cloud APIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A compute flavor as observed on the remote cloud.
///
/// Deserializes from the Nova wire representation (including the
/// `OS-FLV-EXT-DATA:` / `os-flavor-access:` prefixed attribute names)
/// and serializes under clean attribute names for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    /// Server-assigned or caller-pinned flavor ID.
    pub id: String,
    /// Flavor name, the immutable lookup key.
    pub name: String,
    /// Memory in MB.
    pub ram: u32,
    /// Virtual CPU count.
    pub vcpus: u32,
    /// Root disk in GB.
    pub disk: u32,
    /// Ephemeral disk in GB.
    #[serde(default, alias = "OS-FLV-EXT-DATA:ephemeral")]
    pub ephemeral: u32,
    /// Swap in MB. The remote API reports "no swap" as an empty string;
    /// that is normalized to 0 here, before any comparison happens.
    #[serde(default, deserialize_with = "swap_or_zero")]
    pub swap: u32,
    /// RX/TX bandwidth scaling factor.
    #[serde(default = "default_rxtx")]
    pub rxtx_factor: f64,
    /// Whether the flavor is visible to all projects.
    #[serde(default = "default_true", alias = "os-flavor-access:is_public")]
    pub is_public: bool,
    /// Whether the flavor is disabled for new instances.
    #[serde(default, alias = "OS-FLV-DISABLED:disabled")]
    pub is_disabled: bool,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Scheduler metadata attached to the flavor. Populated by a
    /// secondary lookup; empty until fetched.
    #[serde(default)]
    pub extra_specs: BTreeMap<String, String>,
}

impl Default for Flavor {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            ram: 0,
            vcpus: 0,
            disk: 0,
            ephemeral: 0,
            swap: 0,
            rxtx_factor: 1.0,
            is_public: true,
            is_disabled: false,
            description: None,
            extra_specs: BTreeMap::new(),
        }
    }
}

/// The field set sent to create a flavor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorCreate {
    /// Flavor name.
    pub name: String,
    /// Memory in MB.
    pub ram: u32,
    /// Virtual CPU count.
    pub vcpus: u32,
    /// Root disk in GB.
    pub disk: u32,
    /// Explicit ID to create under, or `None` to let the cloud assign one.
    pub id: Option<String>,
    /// Ephemeral disk in GB.
    pub ephemeral: u32,
    /// Swap in MB.
    pub swap: u32,
    /// RX/TX bandwidth scaling factor.
    pub rxtx_factor: f64,
    /// Whether the flavor is visible to all projects.
    pub is_public: bool,
}

/// An identity user as observed on the remote cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// User name.
    pub name: String,
    /// Domain containing the user.
    #[serde(default)]
    pub domain_id: Option<String>,
    /// Default project of the user.
    #[serde(default)]
    pub default_project_id: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the user may authenticate.
    #[serde(default = "default_true", alias = "enabled")]
    pub is_enabled: bool,
    /// When the password expires; `None` means it never does.
    #[serde(default)]
    pub password_expires_at: Option<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            domain_id: None,
            default_project_id: None,
            description: None,
            email: None,
            is_enabled: true,
            password_expires_at: None,
        }
    }
}

/// An identity domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Unique domain ID.
    pub id: String,
    /// Domain name.
    pub name: String,
    /// Whether the domain is enabled.
    #[serde(default = "default_true", alias = "enabled")]
    pub is_enabled: bool,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_rxtx() -> f64 {
    1.0
}

fn swap_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) if s.is_empty() => Ok(0),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flavor_deserializes_wire_names() {
        let flavor: Flavor = serde_json::from_value(json!({
            "id": "515256b8-7027-4d73-aa54-4e30a4a4a339",
            "name": "tiny",
            "ram": 1024,
            "vcpus": 1,
            "disk": 10,
            "OS-FLV-EXT-DATA:ephemeral": 10,
            "swap": "",
            "rxtx_factor": 1.0,
            "os-flavor-access:is_public": false,
            "OS-FLV-DISABLED:disabled": false
        }))
        .unwrap();

        assert_eq!(flavor.name, "tiny");
        assert_eq!(flavor.ephemeral, 10);
        assert!(!flavor.is_public);
        assert!(flavor.extra_specs.is_empty());
    }

    #[test]
    fn empty_swap_normalizes_to_zero() {
        let flavor: Flavor = serde_json::from_value(json!({
            "id": "f1", "name": "tiny", "ram": 1024, "vcpus": 1, "disk": 0,
            "swap": ""
        }))
        .unwrap();
        assert_eq!(flavor.swap, 0);
    }

    #[test]
    fn numeric_and_stringy_swap_pass_through() {
        let flavor: Flavor = serde_json::from_value(json!({
            "id": "f1", "name": "tiny", "ram": 1024, "vcpus": 1, "disk": 0,
            "swap": 512
        }))
        .unwrap();
        assert_eq!(flavor.swap, 512);

        let flavor: Flavor = serde_json::from_value(json!({
            "id": "f1", "name": "tiny", "ram": 1024, "vcpus": 1, "disk": 0,
            "swap": "512"
        }))
        .unwrap();
        assert_eq!(flavor.swap, 512);
    }

    #[test]
    fn flavor_defaults_when_extensions_absent() {
        let flavor: Flavor = serde_json::from_value(json!({
            "id": "f1", "name": "tiny", "ram": 1024, "vcpus": 1, "disk": 0
        }))
        .unwrap();
        assert_eq!(flavor.ephemeral, 0);
        assert_eq!(flavor.swap, 0);
        assert!(flavor.is_public);
        assert!((flavor.rxtx_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn user_deserializes_enabled_alias() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "demouser",
            "domain_id": "default",
            "enabled": false,
            "password_expires_at": "2016-11-06T15:32:17.000000"
        }))
        .unwrap();
        assert!(!user.is_enabled);
        assert_eq!(
            user.password_expires_at.as_deref(),
            Some("2016-11-06T15:32:17.000000")
        );
    }
}
