//! Provider configuration.
//!
//! Connection settings come from the standard `OS_*` environment variables,
//! the same surface `clouds.yaml`-based tooling exports.

use crate::error::{CloudError, Result};

/// Connection settings for an OpenStack cloud.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Keystone v3 endpoint, e.g. `https://keystone.example:5000/v3`.
    pub auth_url: String,
    /// User to authenticate as.
    pub username: String,
    /// Password for the user.
    pub password: String,
    /// Domain containing the user.
    pub user_domain_name: String,
    /// Project to scope the token to.
    pub project_name: String,
    /// Domain containing the project.
    pub project_domain_name: String,
    /// Region to select service endpoints from; first match when unset.
    pub region_name: Option<String>,
}

impl CloudConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `OS_AUTH_URL`, `OS_USERNAME`, `OS_PASSWORD`, `OS_PROJECT_NAME`
    /// (all required), `OS_USER_DOMAIN_NAME` and `OS_PROJECT_DOMAIN_NAME`
    /// (default `Default`), and `OS_REGION_NAME` (optional).
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Config` when a required variable is missing.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            auth_url: required_env("OS_AUTH_URL")?,
            username: required_env("OS_USERNAME")?,
            password: required_env("OS_PASSWORD")?,
            user_domain_name: optional_env("OS_USER_DOMAIN_NAME")
                .unwrap_or_else(|| "Default".to_string()),
            project_name: required_env("OS_PROJECT_NAME")?,
            project_domain_name: optional_env("OS_PROJECT_DOMAIN_NAME")
                .unwrap_or_else(|| "Default".to_string()),
            region_name: optional_env("OS_REGION_NAME"),
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    optional_env(name)
        .ok_or_else(|| CloudError::Config(format!("environment variable {name} is not set")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
