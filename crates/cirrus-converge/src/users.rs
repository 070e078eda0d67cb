//! User lookup and filtering.
//!
//! The query path has no mutation: it resolves an optional domain scope
//! and delegates the search, including all attribute matching, to the
//! provider's search primitive.

use serde::{Deserialize, Serialize};
use tracing::debug;

use cirrus_cloud::{Cloud, User};
use cirrus_core::Filters;

use crate::error::{ConvergeError, Result};

/// Parameters for a user query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserQuery {
    /// Name or ID of the user to match.
    #[serde(default)]
    pub name: Option<String>,
    /// Name or ID of the domain scoping the search.
    #[serde(default)]
    pub domain: Option<String>,
    /// Attribute filters applied by the provider's search primitive;
    /// submaps match nested attributes.
    #[serde(default)]
    pub filters: Filters,
}

impl UserQuery {
    /// Run the query.
    ///
    /// A domain that fails to resolve is a configuration error, surfaced
    /// before any search call is made. "No users matched" is an empty
    /// list, not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConvergeError::Config` when the domain does not resolve
    /// and `ConvergeError::Cloud` when a remote call fails.
    pub async fn search(&self, cloud: &dyn Cloud) -> Result<Vec<User>> {
        let domain_id = match &self.domain {
            Some(domain) => {
                let resolved = cloud.find_domain(domain).await?.ok_or_else(|| {
                    ConvergeError::Config(format!(
                        "domain name or ID '{domain}' does not exist"
                    ))
                })?;
                debug!(domain = %domain, domain_id = %resolved.id, "resolved domain");
                Some(resolved.id)
            }
            None => None,
        };

        let users = cloud
            .search_users(self.name.as_deref(), &self.filters, domain_id.as_deref())
            .await?;
        debug!(count = users.len(), "user search complete");
        Ok(users)
    }
}
